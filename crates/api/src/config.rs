//! Application configuration loaded from environment variables.
//!
//! External URLs and credentials live here, not in the saga code; the saga
//! consumes them through its collaborators.

/// Server and collaborator configuration with development defaults.
///
/// Reads from environment variables:
/// - `HOST` / `PORT` — bind address (default `0.0.0.0:3000`)
/// - `RUST_LOG` — tracing filter directive (default `"info"`)
/// - `DATABASE_URL` — ledger and mapping database
/// - `REPORTING_DATABASE_URL` — ERP reporting replica (defaults to `DATABASE_URL`)
/// - `MARKETPLACE_BASE_URL`, `TOKEN_BASE_URL` — marketplace endpoints
/// - `ERP_BASE_URL`, `ERP_USER_PREFIX`, `ERP_SHARED_SECRET`, `ERP_PACKAGE`
/// - `NOTIFIER_WEBHOOK_URL`, `NOTIFIER_CHANNEL_ID`
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: String,
    pub reporting_database_url: String,
    pub marketplace_base_url: String,
    pub token_base_url: String,
    pub erp_base_url: String,
    pub erp_user_prefix: String,
    pub erp_shared_secret: String,
    pub erp_package: String,
    pub notifier_webhook_url: String,
    pub notifier_channel_id: String,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    /// Loads configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        let database_url = env_or("DATABASE_URL", "postgres://localhost/integrator");
        Self {
            host: env_or("HOST", "0.0.0.0"),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            log_level: env_or("RUST_LOG", "info"),
            reporting_database_url: env_or("REPORTING_DATABASE_URL", &database_url),
            database_url,
            marketplace_base_url: env_or("MARKETPLACE_BASE_URL", "https://api.mercadolibre.com"),
            token_base_url: env_or("TOKEN_BASE_URL", "https://imgs-amz.s3.us-east-1.amazonaws.com/tk"),
            erp_base_url: env_or("ERP_BASE_URL", "http://localhost:8080/erp-gateway"),
            erp_user_prefix: env_or("ERP_USER_PREFIX", "HYSTALO"),
            erp_shared_secret: env_or("ERP_SHARED_SECRET", ""),
            erp_package: env_or("ERP_PACKAGE", "HYSTALO"),
            notifier_webhook_url: env_or("NOTIFIER_WEBHOOK_URL", ""),
            notifier_channel_id: env_or("NOTIFIER_CHANNEL_ID", ""),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
