// src/config.rs

use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

use dotenvy::dotenv;

const DEFAULT_JWT_EXPIRATION: u64 = 24 * 60 * 60;
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_EMAIL_ADDRESS: &str = "noreply@yamdb.local";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Access token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub bind_addr: SocketAddr,
    /// Sender address for confirmation emails.
    pub email_address: String,
    /// When set, outgoing mail is written to this directory instead of the log.
    pub mail_dir: Option<PathBuf>,
    pub admin_username: Option<String>,
    pub admin_email: Option<String>,
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str, String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{} must be set", key),
            ConfigError::Invalid(key, value) => write!(f, "{} has an invalid value: {}", key, value),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let database_url = required("DATABASE_URL")?;
        let jwt_secret = required("JWT_SECRET")?;

        let jwt_expiration = match env::var("JWT_EXPIRATION") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| ConfigError::Invalid("JWT_EXPIRATION", raw))?,
            Err(_) => DEFAULT_JWT_EXPIRATION,
        };

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_addr
            .parse()
            .map_err(|_| ConfigError::Invalid("BIND_ADDR", bind_addr))?;

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let email_address =
            env::var("EMAIL_ADDRESS").unwrap_or_else(|_| DEFAULT_EMAIL_ADDRESS.to_string());

        Ok(Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            bind_addr,
            email_address,
            mail_dir: env::var("MAIL_DIR").ok().map(PathBuf::from),
            admin_username: env::var("ADMIN_USERNAME").ok(),
            admin_email: env::var("ADMIN_EMAIL").ok(),
        })
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::Missing(key))
}
