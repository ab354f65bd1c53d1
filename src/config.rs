//! Configuration loading for vpnwarden.
//!
//! A single TOML file at `~/.vpnwarden/config.toml` (overridable with
//! `--config`), deserialized once at startup into an immutable [`Config`]
//! that is passed by reference into each component. There is no ambient
//! global lookup and no reload at runtime.

use anyhow::{bail, Context, Result};
use chrono_tz::Tz;
use directories::UserDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default ledger file written by pivpn for WireGuard clients.
const DEFAULT_LEDGER_PATH: &str = "/etc/wireguard/configs/clients.txt";

/// Default directory holding the per-client `.conf` artifacts.
const DEFAULT_CONFIG_DIR: &str = "/home/vpn/configs";

/// Default location of the authorization store.
const DEFAULT_STORAGE_PATH: &str = "~/.vpnwarden/auth.db";

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub vpn: VpnConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    /// IANA timezone used when rendering client timestamps.
    #[serde(default = "default_timezone")]
    pub timezone: Tz,
}

/// Telegram transport credentials.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Bot token from @BotFather.
    pub token: String,
}

/// VPN tool and client naming settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VpnConfig {
    /// Namespace for bot-issued temporary client names (`{prefix}_{epoch}`).
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// How long a temporary client lives before the deferred revoke fires.
    #[serde(default = "default_expiration_days")]
    pub expiration_days: u32,
    /// Authoritative `name flag created_epoch` ledger maintained by pivpn.
    #[serde(default = "default_ledger_path")]
    pub ledger_path: PathBuf,
    /// Directory with the per-client `.conf` files.
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,
}

/// Authorization store settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// SQLite database path; `~` is expanded.
    #[serde(default = "default_storage_path")]
    pub path: String,
}

fn default_timezone() -> Tz {
    chrono_tz::UTC
}

fn default_prefix() -> String {
    "client".to_string()
}

fn default_expiration_days() -> u32 {
    1
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from(DEFAULT_LEDGER_PATH)
}

fn default_config_dir() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_DIR)
}

fn default_storage_path() -> String {
    DEFAULT_STORAGE_PATH.to_string()
}

impl Default for VpnConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            expiration_days: default_expiration_days(),
            ledger_path: default_ledger_path(),
            config_dir: default_config_dir(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

impl Config {
    /// Load and validate the configuration.
    ///
    /// `path` overrides the default `~/.vpnwarden/config.toml` location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config at {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// `~/.vpnwarden/config.toml`.
    pub fn default_path() -> Result<PathBuf> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .context("Could not find home directory")?;
        Ok(home.join(".vpnwarden").join("config.toml"))
    }

    /// Authorization store path with `~` expanded.
    pub fn storage_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.storage.path).into_owned())
    }

    fn validate(&self) -> Result<()> {
        if self.telegram.token.trim().is_empty() {
            bail!("telegram.token cannot be empty");
        }
        if self.vpn.prefix.is_empty() {
            bail!("vpn.prefix cannot be empty");
        }
        if !self
            .vpn
            .prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            bail!(
                "vpn.prefix '{}' may only contain letters, digits and underscores",
                self.vpn.prefix
            );
        }
        if self.vpn.expiration_days == 0 {
            bail!("vpn.expiration_days must be at least 1");
        }
        Ok(())
    }
}
