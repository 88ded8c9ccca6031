//! Consent Ledger API Server
//!
//! HTTP entry point for the multi-tenant consent ledger: tenant-scoped
//! consent writes, public offline-verifiable lineage/proof/anchor
//! exports, and an admin surface for tenant and key lifecycle.

mod config;
mod webhook_worker;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use consent_api::state::{AppState, SystemSigner};
use consent_auth::AuthService;
use consent_crypto::KeyPair;
use consent_db::Database;

use crate::config::ServerConfig;

/// Consent Ledger API Server
#[derive(Parser, Debug)]
#[command(name = "consent-api-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML, JSON, or YAML)
    #[arg(short, long, env = "CONSENT_LEDGER_CONFIG")]
    config: Option<String>,

    /// Host to bind to
    #[arg(long, env = "CONSENT_LEDGER_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "CONSENT_LEDGER_PORT")]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "CONSENT_LEDGER_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Log format (json, pretty)
    #[arg(long, env = "CONSENT_LEDGER_LOG_FORMAT", default_value = "pretty")]
    log_format: String,

    /// PostgreSQL connection URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Admin API key (`X-Admin-Api-Key`)
    #[arg(long, env = "ADMIN_API_KEY")]
    admin_api_key: Option<String>,

    /// Secret the tenant API-key HMAC is keyed with
    #[arg(long, env = "API_KEY_HASH_SECRET")]
    api_key_hash_secret: Option<String>,

    /// Enable development mode (relaxed secret validation)
    #[arg(long, env = "CONSENT_LEDGER_DEV_MODE")]
    dev_mode: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut server_config = ServerConfig::load(args.config.as_deref())?;

    if let Some(host) = args.host {
        server_config.server.host = host;
    }
    if let Some(port) = args.port {
        server_config.server.port = port;
    }
    if let Some(db_url) = args.database_url {
        server_config.database.postgres_url = db_url;
    }
    if let Some(admin_key) = args.admin_api_key {
        server_config.auth.admin_api_key = admin_key;
    }
    if let Some(secret) = args.api_key_hash_secret {
        server_config.auth.api_key_hash_secret = secret;
    }
    server_config.logging.level = args.log_level;
    server_config.logging.format = args.log_format;

    init_logging(&server_config.logging)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting consent ledger API server");

    validate_config(&server_config, args.dev_mode)?;

    let db = init_database(&server_config.database).await?;

    let auth = AuthService::new(&db, server_config.auth.to_auth_config());

    let mut state = AppState::new(db, auth);

    if let Some(signer) = build_system_signer(&server_config.signer)? {
        tracing::info!(fingerprint = %signer.fingerprint, "system signer configured");
        state = state.with_system_signer(signer);
    } else {
        tracing::warn!("no system signer configured - exports and proofs will be unsigned");
    }

    if let Some(path) = &server_config.anchor.file_path {
        state = state.with_anchor_file_path(path.clone());
    }

    let state = Arc::new(state);

    let app = consent_api::create_router(state.clone());

    if server_config.metrics.enabled {
        start_metrics_server(server_config.metrics.port).await?;
    }

    let (worker_stop_tx, worker_stop_rx) = watch::channel(false);
    let worker_handle = tokio::spawn(webhook_worker::run(state.db.clone(), worker_stop_rx));

    let addr = server_config.server.socket_addr();
    tracing::info!(host = %server_config.server.host, port = server_config.server.port, "server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(server_config.server.shutdown_timeout()))
        .await?;

    let _ = worker_stop_tx.send(true);
    let _ = worker_handle.await;

    tracing::info!("server shutdown complete");

    Ok(())
}

fn init_logging(config: &config::LoggingConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    match config.format.as_str() {
        "json" => {
            subscriber.with(fmt::layer().json().with_target(true)).init();
        }
        _ => {
            subscriber.with(fmt::layer().pretty().with_target(true)).init();
        }
    }

    Ok(())
}

/// Checks spec.md 6's prod-required secrets: the admin credential and
/// the tenant API-key hash secret must both be set outside dev mode.
fn validate_config(config: &ServerConfig, dev_mode: bool) -> anyhow::Result<()> {
    if dev_mode {
        return Ok(());
    }

    if config.auth.admin_api_key.trim().is_empty() {
        anyhow::bail!("ADMIN_API_KEY must be set in production");
    }
    if config.auth.api_key_hash_secret.trim().is_empty() {
        anyhow::bail!("API_KEY_HASH_SECRET must be set in production");
    }
    if config.api.cors_origins.iter().any(|origin| origin == "*") {
        tracing::warn!("CORS is wide open (\"*\") in a non-dev environment");
    }

    Ok(())
}

async fn init_database(config: &consent_db::DatabaseConfig) -> anyhow::Result<Database> {
    tracing::info!("connecting to database...");

    let db = Database::connect(config).await?;

    let health = db.health_check().await?;
    if !health.healthy {
        anyhow::bail!("database health check failed");
    }

    tracing::info!(postgres = health.postgres, "database health check passed");

    Ok(db)
}

/// Builds the server's signing identity from configured hex key
/// material. Both fields present -> `Some`; both absent -> `None`;
/// exactly one present is a startup error, since a public key with no
/// matching private key can never sign and the reverse can never be
/// advertised.
fn build_system_signer(config: &config::SignerSettings) -> anyhow::Result<Option<SystemSigner>> {
    match (&config.public_key_hex, &config.private_key_hex) {
        (None, None) => Ok(None),
        (Some(_), None) | (None, Some(_)) => {
            anyhow::bail!("system signer requires both public_key_hex and private_key_hex, or neither")
        }
        (Some(_), Some(private_hex)) => {
            let keypair = KeyPair::from_hex(private_hex)?;
            Ok(Some(SystemSigner::from_keypair(&keypair)))
        }
    }
}

async fn start_metrics_server(port: Option<u16>) -> anyhow::Result<()> {
    if let Some(port) = port {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));

        tracing::info!(port = port, "starting metrics server");

        let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
        let handle = builder.with_http_listener(addr).install_recorder()?;

        tokio::spawn(async move {
            let _handle = handle;
            std::future::pending::<()>().await;
        });
    }

    Ok(())
}

async fn shutdown_signal(timeout: Duration) {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("received SIGTERM, initiating graceful shutdown...");
        }
    }

    tracing::info!(timeout_secs = timeout.as_secs(), "waiting for in-flight requests to complete...");

    tokio::time::sleep(timeout).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_port_override() {
        let args = Args::parse_from(["consent-api-server", "--port", "9090"]);
        assert_eq!(args.port, Some(9090));
    }

    #[test]
    fn dev_mode_skips_secret_validation() {
        let config = ServerConfig::development();
        assert!(validate_config(&config, true).is_ok());
    }

    #[test]
    fn prod_mode_requires_admin_key() {
        let config = ServerConfig::development();
        assert!(validate_config(&config, false).is_err());
    }
}
