//! mxbld - MX blocklist daemon
//!
//! Watches account-services notifications for new registrations and email
//! changes, resolves the email domain's mail exchangers, and drops or freezes
//! accounts whose mail ends up at a blocklisted host.

mod commands;
mod config;
mod db;
mod error;
mod handlers;
mod irc;
mod moderation;
mod state;
mod telemetry;
#[cfg(test)]
mod testing;

use crate::config::{Config, LogFormat, validate};
use crate::db::Database;
use crate::handlers::{Dispatcher, build_dispatcher};
use crate::moderation::{DnsLookup, HickoryLookup};
use crate::state::Agent;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "mxbld.toml".to_string());

    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            init_tracing(LogFormat::Text);
            error!(path = %config_path, error = %e, "Failed to load config");
            return Err(e.into());
        }
    };
    init_tracing(config.settings.log_format);

    if let Err(errors) = validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        anyhow::bail!("{} configuration error(s) in {config_path}", errors.len());
    }

    info!(
        server = %config.irc.server,
        port = config.irc.port,
        nick = %config.irc.nickname,
        "Starting mxbld"
    );

    let config = Arc::new(config);
    let db = Database::new(&config.database.path).await?;
    let dns: Arc<dyn DnsLookup> = Arc::new(HickoryLookup::new(config.settings.timeout()));

    let dispatcher = build_dispatcher(&config);
    for (command, name) in dispatcher.names() {
        debug!(command = %command, handler = name, "Registered handler");
    }

    let reconnect_delay = Duration::from_secs(config.settings.reconnect_delay);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = run_session(&config, &db, &dns, &dispatcher) => match result {
                Ok(()) => warn!("Connection closed by server"),
                Err(e) => error!(error = %e, "Connection failed"),
            },
            _ = &mut shutdown => break,
        }

        info!(seconds = reconnect_delay.as_secs(), "Reconnecting after delay");
        tokio::select! {
            _ = tokio::time::sleep(reconnect_delay) => {}
            _ = &mut shutdown => break,
        }
    }

    info!("Shutting down");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

/// One connection, from connect to disconnect.
///
/// Events are dispatched one at a time; the next line is not looked at until
/// every handler for the current one has finished.
async fn run_session(
    config: &Arc<Config>,
    db: &Database,
    dns: &Arc<dyn DnsLookup>,
    dispatcher: &Dispatcher,
) -> anyhow::Result<()> {
    let mut session = irc::connect(&config.irc, config.settings.timeout()).await?;
    let agent = Agent::new(
        Arc::clone(config),
        db.clone(),
        session.sender.clone(),
        Arc::clone(dns),
    );

    handlers::register(&agent).await?;

    while let Some(msg) = session.events.recv().await {
        dispatcher.dispatch(&agent, &msg).await;
    }
    Ok(())
}
