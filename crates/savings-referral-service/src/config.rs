//! Service configuration.

use serde::Deserialize;
use std::path::Path;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to `RocksDB` data directory (default: "/data/savings-referral").
    pub data_dir: String,

    /// Public app URL used to build referral links (default: `http://localhost:3000`).
    pub app_base_url: String,

    /// Transactions-history API URL (optional). Without it the new-user
    /// eligibility check is skipped.
    pub transactions_api_url: Option<String>,

    /// Transactions-history API key (optional).
    pub transactions_api_key: Option<String>,

    /// Upper bound on the eligibility check, in milliseconds.
    pub eligibility_timeout_ms: u64,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,
}

/// Transactions-history secrets file structure.
#[derive(Debug, Deserialize)]
struct TransactionsSecrets {
    api_url: String,
    #[serde(default)]
    api_key: Option<String>,
}

impl ServiceConfig {
    /// Load configuration from environment variables and secrets files.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let (transactions_api_url, transactions_api_key) = load_transactions_secrets();

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            data_dir: std::env::var("DATA_DIR").unwrap_or(defaults.data_dir),
            app_base_url: std::env::var("APP_BASE_URL").unwrap_or(defaults.app_base_url),
            transactions_api_url,
            transactions_api_key,
            eligibility_timeout_ms: parse_env("ELIGIBILITY_TIMEOUT_MS")
                .unwrap_or(defaults.eligibility_timeout_ms),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|o| o.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            max_body_bytes: parse_env("MAX_BODY_BYTES").unwrap_or(defaults.max_body_bytes),
            request_timeout_seconds: parse_env("REQUEST_TIMEOUT_SECONDS")
                .unwrap_or(defaults.request_timeout_seconds),
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

/// Load transactions-history secrets from file or environment.
fn load_transactions_secrets() -> (Option<String>, Option<String>) {
    let secret_paths = [
        ".secrets/transactions.json",
        "../.secrets/transactions.json",
    ];

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<TransactionsSecrets>(path) {
            tracing::info!(path = %path, "Loaded transactions API secrets from file");
            return (Some(secrets.api_url), secrets.api_key);
        }
    }

    tracing::debug!("Transactions secrets file not found, using environment variables");
    (
        std::env::var("TRANSACTIONS_API_URL").ok(),
        std::env::var("TRANSACTIONS_API_KEY").ok(),
    )
}

/// Load secrets from a JSON file.
fn load_secrets_file<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, std::io::Error> {
    let path = Path::new(path);
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Secrets file not found",
        ));
    }
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            data_dir: "/data/savings-referral".into(),
            app_base_url: "http://localhost:3000".into(),
            transactions_api_url: None,
            transactions_api_key: None,
            eligibility_timeout_ms: 3000,
            cors_origins: vec!["*".into()],
            max_body_bytes: 64 * 1024,
            request_timeout_seconds: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.eligibility_timeout_ms, 3000);
        assert!(config.transactions_api_url.is_none());
        assert_eq!(config.cors_origins, vec!["*".to_string()]);
    }

    #[test]
    fn secrets_file_missing() {
        let result = load_secrets_file::<TransactionsSecrets>("does/not/exist.json");
        assert_eq!(result.unwrap_err().kind(), std::io::ErrorKind::NotFound);
    }

    #[test]
    fn secrets_file_parses() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("transactions.json");
        std::fs::write(&path, r#"{"api_url": "http://history:8080"}"#).unwrap();

        let secrets: TransactionsSecrets = load_secrets_file(path.to_str().unwrap()).unwrap();
        assert_eq!(secrets.api_url, "http://history:8080");
        assert!(secrets.api_key.is_none());
    }
}
