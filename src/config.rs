use std::env;
use std::str::FromStr;

use crate::access_gate::AccessGate;
use crate::errors::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(ConfigError::InvalidEnvironment(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Unset means the in-memory store.
    pub mongo_uri: Option<String>,
    pub database_name: String,
    pub bind_addr: String,
    pub environment: Environment,
    /// Parsed at load time so a bad entry stops startup.
    pub access_gate: AccessGate,
    pub cors_allowed_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let environment = match env::var("APP_ENV") {
            Ok(value) => value.parse()?,
            Err(_) => Environment::Production,
        };

        let access_gate =
            AccessGate::from_entries(split_list(&env::var("ALLOWED_IPS").unwrap_or_default()))?;

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .map(|value| split_list(&value))
            .ok()
            .filter(|origins| !origins.is_empty())
            .unwrap_or_else(|| vec!["http://localhost:3000".to_string()]);

        Ok(Self {
            mongo_uri: env::var("MONGO_URI").ok().filter(|uri| !uri.trim().is_empty()),
            database_name: env::var("DATABASE_NAME").unwrap_or_else(|_| "todo_db".to_string()),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            environment,
            access_gate,
            cors_allowed_origins,
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }
}

/// Comma-separated list, blanks dropped.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
