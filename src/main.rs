//! vpnwarden — Telegram-driven administration front-end for a PiVPN/WireGuard
//! gateway.
//!
//! Authorized users issue text commands to create, list, and revoke VPN
//! client configurations, and to manage who may use the bot. Messages are
//! processed strictly one at a time: a command (including any external tool
//! invocation) runs to completion before the next message is taken.

mod auth;
mod channels;
mod config;
mod jobs;
mod process;
mod router;
mod vpn;

use anyhow::{Context, Result};
use auth::{AccessControl, AuthStore, UserId, KEY_ADMIN};
use channels::telegram::TelegramTransport;
use channels::Transport;
use clap::{Parser, Subcommand};
use config::Config;
use jobs::AtScheduler;
use router::CommandRouter;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use vpn::qr::QrEncodeCli;
use vpn::registry::ClientRegistry;
use vpn::PivpnCli;

#[derive(Parser)]
#[command(name = "vpnwarden", version, about)]
struct Cli {
    /// Config file path (default: ~/.vpnwarden/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Run the bot (default).
    Run,
    /// Set the administrator's Telegram id. Done once, before first run.
    SetAdmin { id: UserId },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command.unwrap_or(CliCommand::Run) {
        CliCommand::SetAdmin { id } => set_admin(&config, id),
        CliCommand::Run => run(config).await,
    }
}

fn set_admin(config: &Config, id: UserId) -> Result<()> {
    let store = AuthStore::open(&config.storage_path())?;
    store.write(KEY_ADMIN, &id)?;
    println!("Administrator set to {id}");
    Ok(())
}

async fn run(config: Config) -> Result<()> {
    let store = AuthStore::open(&config.storage_path())?;
    let access = AccessControl::load(store)?;

    let vpn = Arc::new(PivpnCli::new(&config.vpn));
    let scheduler = Arc::new(AtScheduler);
    let registry = ClientRegistry::new(&config.vpn, config.timezone, vpn, scheduler)
        .context("Failed to build client registry")?;
    let qr = Arc::new(QrEncodeCli::new());

    let transport: Arc<dyn Transport> = Arc::new(TelegramTransport::new(&config.telegram.token));
    let router = CommandRouter::new(
        access,
        registry,
        qr,
        Arc::clone(&transport),
        config.vpn.expiration_days,
    );

    tracing::info!(
        prefix = %config.vpn.prefix,
        expiration_days = config.vpn.expiration_days,
        "vpnwarden starting"
    );

    let (tx, mut rx) = mpsc::channel(32);
    let listener = {
        let transport = Arc::clone(&transport);
        tokio::spawn(async move { transport.listen(tx).await })
    };

    loop {
        tokio::select! {
            maybe_msg = rx.recv() => {
                let Some(msg) = maybe_msg else {
                    listener.abort();
                    anyhow::bail!("Transport listener stopped");
                };
                // One message at a time; handle() answers recoverable
                // conditions in-chat and only fails on transport errors.
                if let Err(e) = router.handle(&msg).await {
                    tracing::error!(uid = msg.sender, "Failed to respond: {e:#}");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                listener.abort();
                return Ok(());
            }
        }
    }
}
