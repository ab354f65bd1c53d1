//! Deferred revocation of temporary clients.
//!
//! The bot never deletes a temporary client itself; it hands the job to the
//! host's `at` queue at creation time and re-derives expiry at listing time.

use crate::process;
use anyhow::Result;
use async_trait::async_trait;

/// Capability for scheduling a deferred client revocation.
#[async_trait]
pub trait RevokeScheduler: Send + Sync {
    /// Schedule removal of `client_name` after `delay_days` days.
    async fn schedule_revoke(&self, client_name: &str, delay_days: u32) -> Result<()>;
}

/// Scheduler backed by the host's `at` daemon.
pub struct AtScheduler;

#[async_trait]
impl RevokeScheduler for AtScheduler {
    async fn schedule_revoke(&self, client_name: &str, delay_days: u32) -> Result<()> {
        let command = format!(r#"echo "pivpn -r {client_name} -y" | at now + {delay_days} days"#);
        process::run_shell(&command).await?;
        tracing::info!(client = client_name, delay_days, "Revocation scheduled");
        Ok(())
    }
}
