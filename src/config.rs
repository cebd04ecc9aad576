use std::env;
use std::str::FromStr;
use strum_macros::{Display, EnumString};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

// Application configuration, read from the environment (and .env)
#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub storage: StorageBackend,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub rust_log: String,
}

// Which store the services run against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StorageBackend {
    MySql,
    Memory,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expires_in_hours: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let storage: StorageBackend = parse_or("STORAGE_BACKEND", StorageBackend::MySql)?;
        let url = env::var("DATABASE_URL").ok();
        if storage == StorageBackend::MySql && url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        Ok(Config {
            app: AppConfig {
                rust_log: env::var("RUST_LOG")
                    .unwrap_or_else(|_| "cinema_booking_system=debug,rocket=info".to_string()),
            },
            storage,
            database: DatabaseConfig {
                url,
                max_connections: parse_or("DB_MAX_CONNECTIONS", 10)?,
                acquire_timeout_secs: parse_or("DB_ACQUIRE_TIMEOUT_SECS", 3)?,
            },
            jwt: JwtConfig {
                secret: env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?,
                expires_in_hours: parse_or("JWT_EXPIRES_IN_HOURS", 24)?,
            },
        })
    }
}

fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_backend_parses_case_insensitively() {
        assert_eq!(StorageBackend::from_str("MySQL").unwrap(), StorageBackend::MySql);
        assert_eq!(StorageBackend::from_str("memory").unwrap(), StorageBackend::Memory);
        assert!(StorageBackend::from_str("sqlite").is_err());
        assert_eq!(StorageBackend::MySql.to_string(), "mysql");
    }
}
