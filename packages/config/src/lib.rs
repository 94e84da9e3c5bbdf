// ABOUTME: Configuration loading for Lectern packages
// ABOUTME: Reads database settings from the environment with sensible defaults

pub mod constants;

use std::env;
use std::num::ParseIntError;

use thiserror::Error;
use tracing::debug;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://lectern.db";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid max connections value: {0}")]
    InvalidMaxConnections(#[from] ParseIntError),
    #[error("Max connections must be at least 1")]
    ZeroMaxConnections,
    #[error("Database URL cannot be empty")]
    MissingDatabaseUrl,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn parse(value: Option<String>) -> Self {
        match value.as_deref().map(str::to_lowercase).as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            _ => Environment::Development,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub environment: Environment,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            environment: Environment::Development,
        }
    }
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup so callers (and tests)
    /// don't have to touch the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = match lookup(constants::DATABASE_URL) {
            Some(url) if url.trim().is_empty() => return Err(ConfigError::MissingDatabaseUrl),
            Some(url) => url.trim().to_string(),
            None => DEFAULT_DATABASE_URL.to_string(),
        };

        let max_connections = match lookup(constants::LECTERN_DB_MAX_CONNECTIONS) {
            Some(raw) => raw.trim().parse::<u32>()?,
            None => DEFAULT_MAX_CONNECTIONS,
        };
        if max_connections == 0 {
            return Err(ConfigError::ZeroMaxConnections);
        }

        let environment = Environment::parse(lookup(constants::ENV));

        debug!(
            "Loaded database config: max_connections={}, environment={:?}",
            max_connections, environment
        );

        Ok(Self {
            url,
            max_connections,
            environment,
        })
    }

    /// In-memory SQLite configuration, used by tests and local tooling
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = DatabaseConfig::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config, DatabaseConfig::default());
        assert_eq!(config.url, "sqlite://lectern.db");
        assert_eq!(config.max_connections, 5);
    }

    #[test]
    fn test_custom_values() {
        let config = DatabaseConfig::from_lookup(lookup_from(&[
            (constants::DATABASE_URL, "sqlite:///tmp/test.db"),
            (constants::LECTERN_DB_MAX_CONNECTIONS, "12"),
            (constants::ENV, "production"),
        ]))
        .unwrap();

        assert_eq!(config.url, "sqlite:///tmp/test.db");
        assert_eq!(config.max_connections, 12);
        assert_eq!(config.environment, Environment::Production);
    }

    #[test]
    fn test_empty_database_url_is_rejected() {
        let result = DatabaseConfig::from_lookup(lookup_from(&[(constants::DATABASE_URL, "  ")]));

        assert!(matches!(result, Err(ConfigError::MissingDatabaseUrl)));
    }

    #[test]
    fn test_zero_max_connections_is_rejected() {
        let result = DatabaseConfig::from_lookup(lookup_from(&[(
            constants::LECTERN_DB_MAX_CONNECTIONS,
            "0",
        )]));

        assert!(matches!(result, Err(ConfigError::ZeroMaxConnections)));
    }

    #[rstest]
    #[case("-1")]
    #[case("many")]
    #[case("1.5")]
    fn test_invalid_max_connections(#[case] raw: &str) {
        let result = DatabaseConfig::from_lookup(lookup_from(&[(
            constants::LECTERN_DB_MAX_CONNECTIONS,
            raw,
        )]));

        assert!(matches!(result, Err(ConfigError::InvalidMaxConnections(_))));
    }

    #[rstest]
    #[case(None, Environment::Development)]
    #[case(Some("development"), Environment::Development)]
    #[case(Some("PRODUCTION"), Environment::Production)]
    #[case(Some("prod"), Environment::Production)]
    #[case(Some("staging"), Environment::Development)]
    fn test_environment_parsing(#[case] raw: Option<&str>, #[case] expected: Environment) {
        assert_eq!(Environment::parse(raw.map(String::from)), expected);
    }

    #[test]
    fn test_in_memory_config() {
        let config = DatabaseConfig::in_memory();
        assert_eq!(config.url, "sqlite::memory:");
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
    }
}
