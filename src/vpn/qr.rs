//! QR rendering of client configs for mobile WireGuard import.

use crate::process;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Capability for rendering a config file as a scannable image.
#[async_trait]
pub trait QrRenderer: Send + Sync {
    /// Render `input` and return the path of the produced image.
    async fn render(&self, input: &Path) -> Result<PathBuf>;
}

/// Renderer backed by the `qrencode` command-line tool.
pub struct QrEncodeCli {
    out_dir: PathBuf,
}

impl QrEncodeCli {
    pub fn new() -> Self {
        Self {
            out_dir: std::env::temp_dir(),
        }
    }
}

impl Default for QrEncodeCli {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QrRenderer for QrEncodeCli {
    async fn render(&self, input: &Path) -> Result<PathBuf> {
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .with_context(|| format!("Config path has no file name: {}", input.display()))?;
        let out = self.out_dir.join(format!("{stem}.png"));
        let command = format!(
            r#"qrencode -s 10 -o "{}" < "{}""#,
            out.display(),
            input.display()
        );
        process::run_shell(&command).await?;
        Ok(out)
    }
}
