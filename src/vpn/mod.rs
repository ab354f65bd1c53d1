//! VPN tool capability and the pivpn CLI implementation.
//!
//! The bot never talks to WireGuard directly. Everything goes through the
//! [`VpnTool`] trait: key creation/removal via the external tool, plus the
//! two read-side artifacts it maintains — the authoritative client ledger
//! (`name flag created_epoch` per line) and a per-client `.conf` file at a
//! deterministic path. Tests substitute an in-memory fake.

pub mod qr;
pub mod registry;

use crate::config::VpnConfig;
use crate::process;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;

/// External VPN tool operations the bot depends on.
#[async_trait]
pub trait VpnTool: Send + Sync {
    /// Create a client key and config.
    async fn add(&self, name: &str) -> Result<()>;

    /// Revoke a client.
    async fn remove(&self, name: &str) -> Result<()>;

    /// Raw contents of the client ledger. An absent ledger reads as empty.
    async fn ledger(&self) -> Result<String>;

    /// Deterministic path of the per-client config artifact.
    fn config_path(&self, name: &str) -> PathBuf;
}

/// `pivpn` command-line implementation.
pub struct PivpnCli {
    ledger_path: PathBuf,
    config_dir: PathBuf,
}

impl PivpnCli {
    pub fn new(config: &VpnConfig) -> Self {
        Self {
            ledger_path: config.ledger_path.clone(),
            config_dir: config.config_dir.clone(),
        }
    }
}

#[async_trait]
impl VpnTool for PivpnCli {
    async fn add(&self, name: &str) -> Result<()> {
        process::run("pivpn", &["add", "-n", name]).await?;
        tracing::info!(client = name, "pivpn client added");
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<()> {
        process::run("pivpn", &["-r", name, "-y"]).await?;
        tracing::info!(client = name, "pivpn client removed");
        Ok(())
    }

    async fn ledger(&self) -> Result<String> {
        match tokio::fs::read_to_string(&self.ledger_path).await {
            Ok(contents) => Ok(contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e).with_context(|| {
                format!("Failed to read ledger at {}", self.ledger_path.display())
            }),
        }
    }

    fn config_path(&self, name: &str) -> PathBuf {
        self.config_dir.join(format!("{name}.conf"))
    }
}
