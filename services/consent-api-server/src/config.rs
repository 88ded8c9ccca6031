//! Server configuration, grounded on
//! `openibank-api-server::config::ServerConfig`: environment + optional
//! config file, layered with `config::Config`, `.env` loaded via
//! `dotenvy` first.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use consent_db::DatabaseConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSettings,

    pub database: DatabaseConfig,

    #[serde(default)]
    pub auth: AuthSettings,

    #[serde(default)]
    pub signer: SignerSettings,

    #[serde(default)]
    pub anchor: AnchorSettings,

    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> SocketAddr {
        format!("{}:{}", self.host, self.port)
            .parse()
            .expect("invalid socket address")
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// Auth settings, spec.md 6's required-in-prod secrets: the API-key
/// hash secret and the admin credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    #[serde(default)]
    pub api_key_hash_secret: String,

    #[serde(default)]
    pub admin_api_key: String,

    #[serde(default = "default_true")]
    pub rate_limit_enabled: bool,

    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: u64,

    #[serde(default = "default_environment")]
    pub environment: String,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            api_key_hash_secret: String::new(),
            admin_api_key: String::new(),
            rate_limit_enabled: true,
            rate_limit_per_minute: default_rate_limit(),
            environment: default_environment(),
        }
    }
}

impl AuthSettings {
    pub fn to_auth_config(&self) -> consent_auth::AuthConfig {
        consent_auth::AuthConfig {
            api_key_hash_secret: self.api_key_hash_secret.clone(),
            admin_api_key: self.admin_api_key.clone(),
            rate_limit: consent_auth::config::RateLimitConfig {
                enabled: self.rate_limit_enabled,
                requests_per_minute: self.rate_limit_per_minute,
                environment: self.environment.clone(),
            },
        }
    }
}

/// Optional system signer key material (spec.md 4.B). When both keys
/// are absent the server builds unsigned exports and proofs; setting
/// only one is a configuration error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignerSettings {
    pub public_key_hex: Option<String>,
    pub private_key_hex: Option<String>,
}

/// External anchor commit file (spec.md 6), append-only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnchorSettings {
    pub file_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self { cors_origins: default_cors_origins() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), format: default_log_format() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    pub port: Option<u16>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true, port: Some(9090) }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_rate_limit() -> u64 {
    120
}

fn default_environment() -> String {
    "dev".to_string()
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_true() -> bool {
    true
}

impl ServerConfig {
    pub fn load(config_path: Option<&str>) -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();

        let mut builder = config::Config::builder();

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false));

        builder = builder.add_source(
            config::Environment::with_prefix("CONSENT_LEDGER")
                .separator("__")
                .try_parsing(true),
        );

        let built = builder.build()?;

        let server_config: ServerConfig = built.try_deserialize().unwrap_or_else(|_| {
            tracing::warn!("using default configuration - database_url must still be set");
            ServerConfig::development()
        });

        Ok(server_config)
    }

    pub fn development() -> Self {
        Self {
            server: ServerSettings::default(),
            database: DatabaseConfig::default(),
            auth: AuthSettings::default(),
            signer: SignerSettings::default(),
            anchor: AnchorSettings::default(),
            api: ApiSettings::default(),
            logging: LoggingConfig { level: "debug".to_string(), format: "pretty".to_string() },
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::development()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn development_config_has_sane_defaults() {
        let config = ServerConfig::development();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.logging.level, "debug");
    }
}
