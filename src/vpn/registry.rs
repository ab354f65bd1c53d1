//! Client projection over the VPN tool's ledger, plus create/delete
//! entrypoints.
//!
//! The registry owns no persistent state. Listings are recomputed from the
//! ledger on every call: each `name flag created_epoch` line becomes a
//! [`ClientRecord`], classified as temporary iff the name matches
//! `{prefix}_{digits}`. Temporary records get `expires_at = created_at +
//! expiration_days * 86400`.
//!
//! Temporary names embed the creation epoch with second resolution, so two
//! `/add` calls within the same second synthesize the same name and collide.
//! Accepted limitation: disambiguating would change externally-visible client
//! names.

use super::VpnTool;
use crate::config::VpnConfig;
use crate::jobs::RevokeScheduler;
use anyhow::Result;
use chrono::{DateTime, Duration, TimeZone, Utc};
use chrono_tz::Tz;
use regex::Regex;
use std::sync::Arc;
use thiserror::Error;

const DAY_SECONDS: i64 = 24 * 60 * 60;

/// Client lifecycle class, derived from the naming pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientKind {
    /// Bot-issued, time-bounded, named `{prefix}_{epoch}`.
    Temporary,
    /// Manually named, lives until explicitly deleted.
    Permanent,
}

/// A client as derived from one ledger line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRecord {
    pub name: String,
    pub kind: ClientKind,
    pub created_at: DateTime<Tz>,
    /// Present iff `kind` is [`ClientKind::Temporary`].
    pub expires_at: Option<DateTime<Tz>>,
}

/// Recoverable client-name conflicts, distinguished so handlers can answer
/// the user instead of failing the request.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("client `{0}` already exists")]
    AlreadyExists(String),
    #[error("client `{0}` not found")]
    NotFound(String),
    /// External tool or ledger failure; fatal for this request.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Pure read-side projection of the VPN tool's client state, with the
/// create/delete operations that mutate it through the tool.
pub struct ClientRegistry {
    vpn: Arc<dyn VpnTool>,
    scheduler: Arc<dyn RevokeScheduler>,
    prefix: String,
    expiration_days: u32,
    timezone: Tz,
    temporary_name: Regex,
}

impl ClientRegistry {
    pub fn new(
        config: &VpnConfig,
        timezone: Tz,
        vpn: Arc<dyn VpnTool>,
        scheduler: Arc<dyn RevokeScheduler>,
    ) -> Result<Self> {
        let temporary_name = Regex::new(&format!(r"^{}_\d+$", regex::escape(&config.prefix)))?;
        Ok(Self {
            vpn,
            scheduler,
            prefix: config.prefix.clone(),
            expiration_days: config.expiration_days,
            timezone,
            temporary_name,
        })
    }

    /// Clients of the given kind, in ledger file order. Empty (not an error)
    /// when the ledger is absent or holds no matching entries.
    pub async fn list(&self, kind: ClientKind) -> Result<Vec<ClientRecord>> {
        let ledger = self.vpn.ledger().await?;
        let mut records = Vec::new();
        for line in ledger.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match self.parse_line(line) {
                Some(record) if record.kind == kind => records.push(record),
                Some(_) => {}
                None => tracing::warn!(line, "Skipping malformed ledger line"),
            }
        }
        Ok(records)
    }

    /// Whether the per-client config artifact exists on disk.
    pub fn exists(&self, name: &str) -> bool {
        self.vpn.config_path(name).exists()
    }

    /// Path of the per-client config artifact.
    pub fn config_path(&self, name: &str) -> std::path::PathBuf {
        self.vpn.config_path(name)
    }

    /// Create a temporary client named `{prefix}_{now_epoch}` and schedule
    /// its deferred revocation.
    pub async fn create_temporary(&self) -> Result<String, RegistryError> {
        let name = format!("{}_{}", self.prefix, Utc::now().timestamp());
        self.vpn.add(&name).await?;
        self.scheduler
            .schedule_revoke(&name, self.expiration_days)
            .await?;
        Ok(name)
    }

    /// Create a permanent client with a user-chosen name.
    pub async fn create_permanent(&self, name: &str) -> Result<String, RegistryError> {
        if self.exists(name) {
            return Err(RegistryError::AlreadyExists(name.to_string()));
        }
        self.vpn.add(name).await?;
        Ok(name.to_string())
    }

    /// Delete a client by exact name.
    pub async fn delete(&self, name: &str) -> Result<(), RegistryError> {
        if !self.exists(name) {
            return Err(RegistryError::NotFound(name.to_string()));
        }
        self.vpn.remove(name).await?;
        Ok(())
    }

    fn parse_line(&self, line: &str) -> Option<ClientRecord> {
        let mut fields = line.split_whitespace();
        let name = fields.next()?;
        let _flag = fields.next()?;
        let created_epoch: i64 = fields.next()?.parse().ok()?;

        let created_at = self
            .timezone
            .timestamp_opt(created_epoch, 0)
            .single()?;

        if self.temporary_name.is_match(name) {
            let expires_at =
                created_at + Duration::seconds(i64::from(self.expiration_days) * DAY_SECONDS);
            Some(ClientRecord {
                name: name.to_string(),
                kind: ClientKind::Temporary,
                created_at,
                expires_at: Some(expires_at),
            })
        } else {
            Some(ClientRecord {
                name: name.to_string(),
                kind: ClientKind::Permanent,
                created_at,
                expires_at: None,
            })
        }
    }
}
