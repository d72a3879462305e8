use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::security_headers;

const DEFAULT_DATABASE_URL: &str = "sqlite://tickets.db?mode=rwc";
const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:3001";
const DEFAULT_QR_CODE_DIR: &str = "qr_codes";
const DEFAULT_SENDER_EMAIL: &str = "tickets@example.com";
const DEFAULT_SENDER_NAME: &str = "Event Tickets";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_DISPATCH_QUEUE_CAPACITY: usize = 256;
pub const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} has an invalid value '{value}'")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    /// Brevo API key. Without one, emails are only logged.
    pub brevo_api_key: Option<String>,
    pub sender_email: String,
    pub sender_name: String,
}

/// Process-wide settings, read once at startup and shared by reference.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub bind_addr: SocketAddr,
    /// Scheme and host embedded in generated codes, without a trailing slash.
    pub public_base_url: String,
    /// Shared webhook secret. Every webhook is rejected while this is unset.
    pub paystack_secret_key: Option<String>,
    pub qr_code_dir: PathBuf,
    pub dispatch_queue_capacity: usize,
    pub mail: MailConfig,
    pub production: bool,
    pub cors_allowed_origins: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Ok(Self {
            database_url: non_empty("DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            max_connections: parse_or("DB_MAX_CONNECTIONS", &lookup, DEFAULT_MAX_CONNECTIONS)?,
            bind_addr: parse_or("BIND_ADDR", &lookup, default_bind_addr())?,
            public_base_url: non_empty("PUBLIC_BASE_URL")
                .unwrap_or_else(|| DEFAULT_PUBLIC_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            paystack_secret_key: non_empty("PAYSTACK_SECRET_KEY"),
            qr_code_dir: non_empty("QR_CODE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_QR_CODE_DIR)),
            dispatch_queue_capacity: parse_or(
                "DISPATCH_QUEUE_CAPACITY",
                &lookup,
                DEFAULT_DISPATCH_QUEUE_CAPACITY,
            )?,
            mail: MailConfig {
                brevo_api_key: non_empty("BREVO_API_KEY"),
                sender_email: non_empty("MAIL_SENDER_EMAIL")
                    .unwrap_or_else(|| DEFAULT_SENDER_EMAIL.to_string()),
                sender_name: non_empty("MAIL_SENDER_NAME")
                    .unwrap_or_else(|| DEFAULT_SENDER_NAME.to_string()),
            },
            production: lookup("RUST_ENV")
                .map(|v| v.to_lowercase() == "production")
                .unwrap_or(false),
            cors_allowed_origins: non_empty("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGINS.to_string()),
        })
    }

    /// Fully-qualified URL a scanner calls to admit `ticket_id`.
    pub fn validation_url(&self, ticket_id: i64) -> String {
        format!("{}/scan/{}", self.public_base_url, ticket_id)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            bind_addr: default_bind_addr(),
            public_base_url: DEFAULT_PUBLIC_BASE_URL.to_string(),
            paystack_secret_key: None,
            qr_code_dir: PathBuf::from(DEFAULT_QR_CODE_DIR),
            dispatch_queue_capacity: DEFAULT_DISPATCH_QUEUE_CAPACITY,
            mail: MailConfig {
                brevo_api_key: None,
                sender_email: DEFAULT_SENDER_EMAIL.to_string(),
                sender_name: DEFAULT_SENDER_NAME.to_string(),
            },
            production: false,
            cors_allowed_origins: DEFAULT_ALLOWED_ORIGINS.to_string(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3001))
}

fn parse_or<T, F>(name: &'static str, lookup: &F, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name).filter(|v| !v.trim().is_empty()) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.bind_addr.port(), 3001);
        assert!(config.paystack_secret_key.is_none());
        assert!(config.mail.brevo_api_key.is_none());
        assert!(!config.production);
        assert_eq!(config.bind_addr.to_string(), "0.0.0.0:3001");
    }

    #[test]
    fn test_reads_values_and_trims_base_url() {
        let config = config_from(&[
            ("PAYSTACK_SECRET_KEY", "sk_test"),
            ("PUBLIC_BASE_URL", "https://tickets.example.org/"),
            ("DB_MAX_CONNECTIONS", "12"),
            ("RUST_ENV", "Production"),
        ])
        .unwrap();

        assert_eq!(config.paystack_secret_key.as_deref(), Some("sk_test"));
        assert_eq!(config.public_base_url, "https://tickets.example.org");
        assert_eq!(config.max_connections, 12);
        assert!(config.production);
        assert_eq!(
            config.validation_url(7),
            "https://tickets.example.org/scan/7"
        );
    }

    #[test]
    fn test_blank_secret_counts_as_missing() {
        let config = config_from(&[("PAYSTACK_SECRET_KEY", "  ")]).unwrap();
        assert!(config.paystack_secret_key.is_none());
    }

    #[test]
    fn test_invalid_number_is_an_error() {
        let err = config_from(&[("DISPATCH_QUEUE_CAPACITY", "lots")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                name: "DISPATCH_QUEUE_CAPACITY",
                value: "lots".to_string()
            }
        );
    }
}
