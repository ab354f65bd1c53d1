//! Command grammar and dispatch.
//!
//! The router is stateless across messages; everything durable lives in
//! [`AccessControl`] and behind [`ClientRegistry`]. Per message: permission
//! gate first, then an ordered matcher table (first syntactic match wins),
//! then an admin re-gate for privileged commands, then the handler. Text
//! that matches nothing is silently ignored.

pub mod table;

use crate::auth::{AccessControl, UserId};
use crate::channels::{Incoming, Transport};
use crate::vpn::qr::QrRenderer;
use crate::vpn::registry::{ClientKind, ClientRegistry, RegistryError};
use anyhow::Result;
use regex::Regex;
use std::sync::Arc;
use std::sync::LazyLock;

static RE_PERMANENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/permanent (\w+)$").expect("valid regex"));
static RE_DELETE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/delete (\w+)$").expect("valid regex"));
static RE_PERMIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/permit (\S+)$").expect("valid regex"));

const DENIED_BOT: &str = "You do not have access to this bot. Contact the administrator.";
const DENIED_COMMAND: &str = "You do not have access to this command.";
const INVALID_USER_ID: &str = "Invalid user id.";
const NO_CLIENTS: &str = "No clients found";
const GENERIC_FAILURE: &str = "Something went wrong, the request was not completed.";

// ── Command grammar ──────────────────────────────────────────────

/// The closed command set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Add,
    Permanent(String),
    List,
    ListPermanent,
    Delete(String),
    /// Raw argument; numeric validation happens at dispatch so a malformed
    /// id gets a notice instead of silence.
    Permit(String),
}

/// Permission level a command requires on top of the bot-wide gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Permitted,
    Admin,
}

impl Command {
    /// Match `text` against the grammar, in priority order. `None` means the
    /// message is ignored.
    pub fn parse(text: &str) -> Option<Command> {
        match text {
            "/start" | "/help" => return Some(Command::Help),
            "/add" => return Some(Command::Add),
            "/list" => return Some(Command::List),
            "/list_permanent" => return Some(Command::ListPermanent),
            _ => {}
        }
        if let Some(captures) = RE_PERMANENT.captures(text) {
            return Some(Command::Permanent(captures[1].to_string()));
        }
        if let Some(captures) = RE_DELETE.captures(text) {
            return Some(Command::Delete(captures[1].to_string()));
        }
        if let Some(captures) = RE_PERMIT.captures(text) {
            return Some(Command::Permit(captures[1].to_string()));
        }
        None
    }

    pub fn permission(&self) -> Permission {
        match self {
            Command::Help
            | Command::Add
            | Command::Permanent(_)
            | Command::List
            | Command::ListPermanent => Permission::Permitted,
            Command::Delete(_) | Command::Permit(_) => Permission::Admin,
        }
    }
}

// ── Router ───────────────────────────────────────────────────────

/// Routes incoming messages to command handlers.
pub struct CommandRouter {
    access: AccessControl,
    registry: ClientRegistry,
    qr: Arc<dyn QrRenderer>,
    transport: Arc<dyn Transport>,
    expiration_days: u32,
}

impl CommandRouter {
    pub fn new(
        access: AccessControl,
        registry: ClientRegistry,
        qr: Arc<dyn QrRenderer>,
        transport: Arc<dyn Transport>,
        expiration_days: u32,
    ) -> Self {
        Self {
            access,
            registry,
            qr,
            transport,
            expiration_days,
        }
    }

    /// Process one incoming message to completion.
    ///
    /// Recoverable conditions (permission denials, name conflicts, malformed
    /// ids, tool failures) are answered in-chat and never propagate; only
    /// transport send failures bubble up to the run loop.
    pub async fn handle(&self, msg: &Incoming) -> Result<()> {
        if !self.access.is_permitted(msg.sender) {
            tracing::info!(uid = msg.sender, "Unpermitted sender rejected");
            return self.transport.send_text(msg.chat, DENIED_BOT, false).await;
        }

        let Some(command) = Command::parse(&msg.text) else {
            return Ok(());
        };

        if command.permission() == Permission::Admin && !self.access.is_admin(msg.sender) {
            tracing::info!(uid = msg.sender, ?command, "Admin command refused");
            return self
                .transport
                .send_text(msg.chat, DENIED_COMMAND, false)
                .await;
        }

        let outcome = match &command {
            Command::Help => self.help(msg).await,
            Command::Add => self.add(msg).await,
            Command::Permanent(name) => self.permanent(msg, name).await,
            Command::List => self.list(msg, ClientKind::Temporary).await,
            Command::ListPermanent => self.list(msg, ClientKind::Permanent).await,
            Command::Delete(name) => self.delete(msg, name).await,
            Command::Permit(raw) => self.permit(msg, raw).await,
        };

        if let Err(e) = outcome {
            tracing::error!(uid = msg.sender, ?command, "Command failed: {e:#}");
            return self
                .transport
                .send_text(msg.chat, GENERIC_FAILURE, false)
                .await;
        }
        Ok(())
    }

    // ── Handlers ─────────────────────────────────────────────────

    async fn help(&self, msg: &Incoming) -> Result<()> {
        let mut text = format!(
            "Available commands:\n\
             \n\
             /start, /help - Show this message\n\
             /add - Create a new temporary client (valid for {} day(s))\n\
             /permanent `client_name` - Create a new permanent client\n\
             /list - List all temporary clients\n\
             /list\\_permanent - List all permanent clients",
            self.expiration_days
        );
        if self.access.is_admin(msg.sender) {
            text.push_str(
                "\n/delete `client_name` - Delete a client\n\
                 /permit `telegram_id` - Permit a new bot user",
            );
        }
        self.transport.send_text(msg.chat, &text, true).await
    }

    async fn add(&self, msg: &Incoming) -> Result<()> {
        let name = self.registry.create_temporary().await?;
        let config = self.registry.config_path(&name);
        self.transport
            .send_file(msg.chat, &config, "text/plain")
            .await
    }

    async fn permanent(&self, msg: &Incoming, name: &str) -> Result<()> {
        match self.registry.create_permanent(name).await {
            Ok(_) => {}
            Err(RegistryError::AlreadyExists(_)) => {
                let text = format!("Client `{name}` already exists");
                return self.transport.send_text(msg.chat, &text, true).await;
            }
            Err(e) => return Err(e.into()),
        }
        let config = self.registry.config_path(name);
        self.transport
            .send_file(msg.chat, &config, "text/plain")
            .await?;
        let image = self.qr.render(&config).await?;
        self.transport
            .send_file(msg.chat, &image, "image/png")
            .await
    }

    async fn list(&self, msg: &Incoming, kind: ClientKind) -> Result<()> {
        let records = self.registry.list(kind).await?;
        if records.is_empty() {
            return self.transport.send_text(msg.chat, NO_CLIENTS, false).await;
        }
        let label = match kind {
            ClientKind::Temporary => "Temporary",
            ClientKind::Permanent => "Permanent",
        };
        let text = format!(
            "{label} clients ({}):\n\n```\n{}\n```",
            records.len(),
            table::render(&records, kind)
        );
        self.transport.send_text(msg.chat, &text, true).await
    }

    async fn delete(&self, msg: &Incoming, name: &str) -> Result<()> {
        let text = match self.registry.delete(name).await {
            Ok(()) => format!("Client `{name}` deleted"),
            Err(RegistryError::NotFound(_)) => format!("Client `{name}` not found"),
            Err(e) => return Err(e.into()),
        };
        self.transport.send_text(msg.chat, &text, true).await
    }

    async fn permit(&self, msg: &Incoming, raw: &str) -> Result<()> {
        let Some(uid) = parse_user_id(raw) else {
            return self
                .transport
                .send_text(msg.chat, INVALID_USER_ID, false)
                .await;
        };
        self.access.permit(uid)?;
        let text = format!("User `{uid}` permitted");
        self.transport.send_text(msg.chat, &text, true).await
    }
}

/// A valid permit argument is a canonical non-negative decimal: digits only,
/// no leading zeros (except "0" itself), and within `i64` range.
fn parse_user_id(raw: &str) -> Option<UserId> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let uid: UserId = raw.parse().ok()?;
    if uid.to_string() != raw {
        return None;
    }
    Some(uid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthStore;
    use crate::channels::ChatId;
    use crate::config::VpnConfig;
    use crate::jobs::RevokeScheduler;
    use crate::vpn::VpnTool;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::path::{Path, PathBuf};

    // ── Doubles ──────────────────────────────────────────────────

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Sent {
        Text {
            chat: ChatId,
            text: String,
            markdown: bool,
        },
        File {
            chat: ChatId,
            path: PathBuf,
            mime: String,
        },
    }

    #[derive(Default)]
    struct FakeTransport {
        sent: Mutex<Vec<Sent>>,
    }

    impl FakeTransport {
        fn texts(&self) -> Vec<String> {
            self.sent
                .lock()
                .iter()
                .filter_map(|s| match s {
                    Sent::Text { text, .. } => Some(text.clone()),
                    Sent::File { .. } => None,
                })
                .collect()
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn listen(&self, _tx: tokio::sync::mpsc::Sender<Incoming>) -> Result<()> {
            unreachable!("router tests never listen")
        }

        async fn send_text(&self, chat: ChatId, text: &str, markdown: bool) -> Result<()> {
            self.sent.lock().push(Sent::Text {
                chat,
                text: text.to_string(),
                markdown,
            });
            Ok(())
        }

        async fn send_file(&self, chat: ChatId, path: &Path, mime: &str) -> Result<()> {
            self.sent.lock().push(Sent::File {
                chat,
                path: path.to_path_buf(),
                mime: mime.to_string(),
            });
            Ok(())
        }
    }

    struct FakeVpn {
        ledger: Mutex<String>,
        config_dir: PathBuf,
        added: Mutex<Vec<String>>,
        removed: Mutex<Vec<String>>,
        fail_add: bool,
    }

    impl FakeVpn {
        fn new(config_dir: &Path) -> Self {
            Self {
                ledger: Mutex::new(String::new()),
                config_dir: config_dir.to_path_buf(),
                added: Mutex::new(Vec::new()),
                removed: Mutex::new(Vec::new()),
                fail_add: false,
            }
        }
    }

    #[async_trait]
    impl VpnTool for FakeVpn {
        async fn add(&self, name: &str) -> Result<()> {
            if self.fail_add {
                anyhow::bail!("pivpn exploded");
            }
            self.added.lock().push(name.to_string());
            // The real tool writes the config artifact; mirror that so the
            // follow-up send_file has something to point at.
            std::fs::write(self.config_path(name), "[Interface]\n")?;
            Ok(())
        }

        async fn remove(&self, name: &str) -> Result<()> {
            self.removed.lock().push(name.to_string());
            Ok(())
        }

        async fn ledger(&self) -> Result<String> {
            Ok(self.ledger.lock().clone())
        }

        fn config_path(&self, name: &str) -> PathBuf {
            self.config_dir.join(format!("{name}.conf"))
        }
    }

    #[derive(Default)]
    struct FakeScheduler {
        scheduled: Mutex<Vec<(String, u32)>>,
    }

    #[async_trait]
    impl RevokeScheduler for FakeScheduler {
        async fn schedule_revoke(&self, client_name: &str, delay_days: u32) -> Result<()> {
            self.scheduled
                .lock()
                .push((client_name.to_string(), delay_days));
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeQr {
        rendered: Mutex<Vec<PathBuf>>,
    }

    #[async_trait]
    impl QrRenderer for FakeQr {
        async fn render(&self, input: &Path) -> Result<PathBuf> {
            self.rendered.lock().push(input.to_path_buf());
            Ok(input.with_extension("png"))
        }
    }

    // ── Harness ──────────────────────────────────────────────────

    const ADMIN: UserId = 99;
    const USER: UserId = 7;
    const STRANGER: UserId = 1000;
    const CHAT: ChatId = 555;

    struct Harness {
        router: CommandRouter,
        transport: Arc<FakeTransport>,
        vpn: Arc<FakeVpn>,
        scheduler: Arc<FakeScheduler>,
        qr: Arc<FakeQr>,
        _dir: tempfile::TempDir,
    }

    fn harness() -> Harness {
        harness_with(|_| {})
    }

    fn harness_with(tweak: impl FnOnce(&mut FakeVpn)) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let mut vpn = FakeVpn::new(dir.path());
        tweak(&mut vpn);
        let vpn = Arc::new(vpn);
        let scheduler = Arc::new(FakeScheduler::default());
        let qr = Arc::new(FakeQr::default());
        let transport = Arc::new(FakeTransport::default());

        let store = AuthStore::open_in_memory().unwrap();
        store.write(crate::auth::KEY_ADMIN, &ADMIN).unwrap();
        store.write(crate::auth::KEY_USERS, &vec![USER]).unwrap();
        let access = AccessControl::load(store).unwrap();

        let config = VpnConfig {
            prefix: "bot".into(),
            expiration_days: 1,
            ledger_path: dir.path().join("clients.txt"),
            config_dir: dir.path().to_path_buf(),
        };
        let registry = ClientRegistry::new(
            &config,
            chrono_tz::UTC,
            vpn.clone() as Arc<dyn VpnTool>,
            scheduler.clone() as Arc<dyn RevokeScheduler>,
        )
        .unwrap();

        let router = CommandRouter::new(
            access,
            registry,
            qr.clone() as Arc<dyn QrRenderer>,
            transport.clone() as Arc<dyn Transport>,
            1,
        );
        Harness {
            router,
            transport,
            vpn,
            scheduler,
            qr,
            _dir: dir,
        }
    }

    fn message(sender: UserId, text: &str) -> Incoming {
        Incoming {
            sender,
            chat: CHAT,
            text: text.to_string(),
        }
    }

    // ── Grammar ──────────────────────────────────────────────────

    #[test]
    fn parse_fixed_commands() {
        assert_eq!(Command::parse("/start"), Some(Command::Help));
        assert_eq!(Command::parse("/help"), Some(Command::Help));
        assert_eq!(Command::parse("/add"), Some(Command::Add));
        assert_eq!(Command::parse("/list"), Some(Command::List));
        assert_eq!(Command::parse("/list_permanent"), Some(Command::ListPermanent));
    }

    #[test]
    fn parse_argument_commands() {
        assert_eq!(
            Command::parse("/permanent alice"),
            Some(Command::Permanent("alice".into()))
        );
        assert_eq!(
            Command::parse("/delete bot_1700000300"),
            Some(Command::Delete("bot_1700000300".into()))
        );
        assert_eq!(
            Command::parse("/permit 42"),
            Some(Command::Permit("42".into()))
        );
        assert_eq!(
            Command::parse("/permit abc"),
            Some(Command::Permit("abc".into()))
        );
    }

    #[test]
    fn parse_rejects_malformed_text() {
        assert_eq!(Command::parse(""), None);
        assert_eq!(Command::parse("hello"), None);
        assert_eq!(Command::parse("/unknown"), None);
        assert_eq!(Command::parse("/permanent"), None);
        assert_eq!(Command::parse("/permanent two words"), None);
        assert_eq!(Command::parse("/permanent bad-name"), None);
        assert_eq!(Command::parse("/delete"), None);
        assert_eq!(Command::parse("/add extra"), None);
        // Case-sensitive, full-text match.
        assert_eq!(Command::parse("/Add"), None);
        assert_eq!(Command::parse(" /add"), None);
    }

    #[test]
    fn permission_levels() {
        assert_eq!(Command::Help.permission(), Permission::Permitted);
        assert_eq!(Command::Add.permission(), Permission::Permitted);
        assert_eq!(Command::List.permission(), Permission::Permitted);
        assert_eq!(
            Command::Delete("x".into()).permission(),
            Permission::Admin
        );
        assert_eq!(
            Command::Permit("1".into()).permission(),
            Permission::Admin
        );
    }

    #[test]
    fn user_id_validation() {
        assert_eq!(parse_user_id("42"), Some(42));
        assert_eq!(parse_user_id("0"), Some(0));
        assert_eq!(parse_user_id("abc"), None);
        assert_eq!(parse_user_id("-5"), None);
        assert_eq!(parse_user_id("007"), None);
        assert_eq!(parse_user_id("4.2"), None);
        assert_eq!(parse_user_id("99999999999999999999999"), None);
    }

    // ── Gating ───────────────────────────────────────────────────

    #[tokio::test]
    async fn unpermitted_sender_gets_denial_before_matching() {
        let h = harness();
        h.router.handle(&message(STRANGER, "/add")).await.unwrap();
        assert_eq!(h.transport.texts(), vec![DENIED_BOT.to_string()]);
        assert!(h.vpn.added.lock().is_empty());
    }

    #[tokio::test]
    async fn unpermitted_sender_denied_even_for_unmatched_text() {
        let h = harness();
        h.router.handle(&message(STRANGER, "hi there")).await.unwrap();
        assert_eq!(h.transport.texts(), vec![DENIED_BOT.to_string()]);
    }

    #[tokio::test]
    async fn unmatched_text_from_permitted_user_is_ignored() {
        let h = harness();
        h.router.handle(&message(USER, "hi there")).await.unwrap();
        h.router.handle(&message(USER, "/unknown")).await.unwrap();
        assert!(h.transport.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn non_admin_delete_is_refused_without_side_effects() {
        let h = harness();
        h.router
            .handle(&message(USER, "/delete alice"))
            .await
            .unwrap();
        assert_eq!(h.transport.texts(), vec![DENIED_COMMAND.to_string()]);
        assert!(h.vpn.removed.lock().is_empty());
    }

    #[tokio::test]
    async fn non_admin_permit_is_refused() {
        let h = harness();
        h.router.handle(&message(USER, "/permit 5")).await.unwrap();
        assert_eq!(h.transport.texts(), vec![DENIED_COMMAND.to_string()]);
        assert!(!h.router.access.is_permitted(5));
    }

    // ── Help ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn help_for_plain_user_omits_admin_lines() {
        let h = harness();
        h.router.handle(&message(USER, "/help")).await.unwrap();
        let texts = h.transport.texts();
        assert_eq!(texts.len(), 1);
        assert!(texts[0].contains("/add"));
        assert!(texts[0].contains("valid for 1 day(s)"));
        assert!(!texts[0].contains("/delete"));
        assert!(!texts[0].contains("/permit"));
    }

    #[tokio::test]
    async fn help_for_admin_appends_admin_lines() {
        let h = harness();
        h.router.handle(&message(ADMIN, "/start")).await.unwrap();
        let texts = h.transport.texts();
        assert!(texts[0].contains("/delete"));
        assert!(texts[0].contains("/permit"));
    }

    // ── Client lifecycle ─────────────────────────────────────────

    #[tokio::test]
    async fn add_creates_schedules_and_sends_config() {
        let h = harness();
        h.router.handle(&message(USER, "/add")).await.unwrap();

        let added = h.vpn.added.lock().clone();
        assert_eq!(added.len(), 1);
        assert!(added[0].starts_with("bot_"));
        assert_eq!(
            h.scheduler.scheduled.lock().as_slice(),
            &[(added[0].clone(), 1)]
        );

        let sent = h.transport.sent.lock().clone();
        assert_eq!(
            sent,
            vec![Sent::File {
                chat: CHAT,
                path: h.vpn.config_path(&added[0]),
                mime: "text/plain".into(),
            }]
        );
    }

    #[tokio::test]
    async fn permanent_sends_config_then_qr() {
        let h = harness();
        h.router
            .handle(&message(USER, "/permanent alice"))
            .await
            .unwrap();

        assert_eq!(h.vpn.added.lock().as_slice(), &["alice".to_string()]);
        assert_eq!(
            h.qr.rendered.lock().as_slice(),
            &[h.vpn.config_path("alice")]
        );
        let sent = h.transport.sent.lock().clone();
        assert_eq!(
            sent,
            vec![
                Sent::File {
                    chat: CHAT,
                    path: h.vpn.config_path("alice"),
                    mime: "text/plain".into(),
                },
                Sent::File {
                    chat: CHAT,
                    path: h.vpn.config_path("alice").with_extension("png"),
                    mime: "image/png".into(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn permanent_name_collision_is_answered_not_fatal() {
        let h = harness();
        std::fs::write(h.vpn.config_path("alice"), "[Interface]\n").unwrap();
        h.router
            .handle(&message(USER, "/permanent alice"))
            .await
            .unwrap();
        assert_eq!(
            h.transport.texts(),
            vec!["Client `alice` already exists".to_string()]
        );
        assert!(h.vpn.added.lock().is_empty());
        assert!(h.qr.rendered.lock().is_empty());
    }

    #[tokio::test]
    async fn delete_existing_client_confirms() {
        let h = harness();
        std::fs::write(h.vpn.config_path("alice"), "[Interface]\n").unwrap();
        h.router
            .handle(&message(ADMIN, "/delete alice"))
            .await
            .unwrap();
        assert_eq!(h.vpn.removed.lock().as_slice(), &["alice".to_string()]);
        assert_eq!(
            h.transport.texts(),
            vec!["Client `alice` deleted".to_string()]
        );
    }

    #[tokio::test]
    async fn delete_missing_client_reports_not_found() {
        let h = harness();
        h.router
            .handle(&message(ADMIN, "/delete ghost"))
            .await
            .unwrap();
        assert!(h.vpn.removed.lock().is_empty());
        assert_eq!(
            h.transport.texts(),
            vec!["Client `ghost` not found".to_string()]
        );
    }

    // ── Listings ─────────────────────────────────────────────────

    #[tokio::test]
    async fn empty_listing_is_a_plain_message() {
        let h = harness();
        h.router.handle(&message(USER, "/list")).await.unwrap();
        assert_eq!(h.transport.texts(), vec![NO_CLIENTS.to_string()]);
    }

    #[tokio::test]
    async fn list_renders_temporary_table_with_count() {
        let h = harness();
        *h.vpn.ledger.lock() =
            "alice 1 1700000000\nbot_1700000300 1 1700000300\n".to_string();
        h.router.handle(&message(USER, "/list")).await.unwrap();
        let texts = h.transport.texts();
        assert!(texts[0].starts_with("Temporary clients (1):"));
        assert!(texts[0].contains("```"));
        assert!(texts[0].contains("bot_1700000300"));
        assert!(!texts[0].contains("alice"));
    }

    #[tokio::test]
    async fn list_permanent_renders_permanent_table() {
        let h = harness();
        *h.vpn.ledger.lock() =
            "alice 1 1700000000\nbot_1700000300 1 1700000300\n".to_string();
        h.router
            .handle(&message(USER, "/list_permanent"))
            .await
            .unwrap();
        let texts = h.transport.texts();
        assert!(texts[0].starts_with("Permanent clients (1):"));
        assert!(texts[0].contains("alice"));
        assert!(!texts[0].contains("bot_1700000300"));
    }

    // ── Permit ───────────────────────────────────────────────────

    #[tokio::test]
    async fn permit_adds_user_and_confirms() {
        let h = harness();
        h.router.handle(&message(ADMIN, "/permit 1234")).await.unwrap();
        assert!(h.router.access.is_permitted(1234));
        assert_eq!(
            h.transport.texts(),
            vec!["User `1234` permitted".to_string()]
        );
    }

    #[tokio::test]
    async fn permit_non_numeric_is_invalid_argument() {
        let h = harness();
        h.router.handle(&message(ADMIN, "/permit abc")).await.unwrap();
        assert_eq!(h.transport.texts(), vec![INVALID_USER_ID.to_string()]);
        assert!(!h.router.access.is_permitted(0));
    }

    #[tokio::test]
    async fn permit_non_canonical_id_is_rejected_without_mutation() {
        let h = harness();
        h.router.handle(&message(ADMIN, "/permit 042")).await.unwrap();
        assert_eq!(h.transport.texts(), vec![INVALID_USER_ID.to_string()]);
        assert!(!h.router.access.is_permitted(42));
    }

    // ── Failure surfacing ────────────────────────────────────────

    #[tokio::test]
    async fn tool_failure_surfaces_generic_notice() {
        let h = harness_with(|vpn| vpn.fail_add = true);
        h.router.handle(&message(USER, "/add")).await.unwrap();
        assert_eq!(h.transport.texts(), vec![GENERIC_FAILURE.to_string()]);
        assert!(h.scheduler.scheduled.lock().is_empty());
    }
}
