//! Fixed-width monospaced table rendering for client listings.
//!
//! Layout: right-aligned index, centered name header over left-justified
//! names, centered date header over the rendered timestamp (expiry for
//! temporary clients, creation for permanent), columns joined by `" ┃ "`,
//! and a `━`/`━╋━` divider row whose segment widths equal each column's
//! content width.

use crate::vpn::registry::{ClientKind, ClientRecord};

/// Rendered-timestamp format shared by both listing kinds.
pub const DATE_FORMAT: &str = "%d-%m-%y %H:%M";

const SPACER: &str = " ┃ ";

/// Render a non-empty record slice into a table. The caller handles the
/// empty case with a plain message instead of a zero-row table.
pub fn render(records: &[ClientRecord], kind: ClientKind) -> String {
    let index_width = records.len().to_string().len();
    // All temporary names share the `{prefix}_{epoch}` shape, so the first
    // name's length is the column width; permanent names vary.
    let name_width = match kind {
        ClientKind::Permanent => records
            .iter()
            .map(|r| r.name.chars().count())
            .max()
            .unwrap_or(0),
        ClientKind::Temporary => records
            .first()
            .map(|r| r.name.chars().count())
            .unwrap_or(0),
    };
    let date_header = match kind {
        ClientKind::Temporary => "Expires",
        ClientKind::Permanent => "Created",
    };
    let date_width = records
        .first()
        .map(|r| row_date(r, kind).chars().count())
        .unwrap_or(DATE_FORMAT.len());

    let header = [
        pad_left("#", index_width),
        center("Name", name_width),
        center(date_header, date_width),
    ]
    .join(SPACER);
    let divider = [
        "━".repeat(index_width),
        "━".repeat(name_width),
        "━".repeat(date_width),
    ]
    .join("━╋━");

    let mut lines = vec![header, divider];
    for (idx, record) in records.iter().enumerate() {
        lines.push(
            [
                pad_left(&(idx + 1).to_string(), index_width),
                pad_right(&record.name, name_width),
                row_date(record, kind),
            ]
            .join(SPACER),
        );
    }
    lines.join("\n")
}

fn row_date(record: &ClientRecord, kind: ClientKind) -> String {
    let timestamp = match kind {
        ClientKind::Temporary => record.expires_at.unwrap_or(record.created_at),
        ClientKind::Permanent => record.created_at,
    };
    timestamp.format(DATE_FORMAT).to_string()
}

/// Right-align within `width`; strings already at least `width` long are
/// returned unchanged (no truncation).
fn pad_left(s: &str, width: usize) -> String {
    let len = s.chars().count();
    if len >= width {
        s.to_string()
    } else {
        format!("{}{s}", " ".repeat(width - len))
    }
}

fn pad_right(s: &str, width: usize) -> String {
    let len = s.chars().count();
    if len >= width {
        s.to_string()
    } else {
        format!("{s}{}", " ".repeat(width - len))
    }
}

fn center(s: &str, width: usize) -> String {
    let len = s.chars().count();
    if len >= width {
        return s.to_string();
    }
    let pad = width - len;
    let left = pad / 2;
    format!("{}{s}{}", " ".repeat(left), " ".repeat(pad - left))
}
