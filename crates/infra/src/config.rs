//! Process configuration, read from environment variables.

use std::net::SocketAddr;

use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is not valid: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error("{0} must be set when USE_PERSISTENT_STORES=true")]
    Missing(&'static str),
}

/// Where the catalog lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    InMemory,
    Postgres {
        database_url: String,
        max_connections: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub store: StoreConfig,
}

impl AppConfig {
    /// Read `BIND_ADDR`, `USE_PERSISTENT_STORES`, `DATABASE_URL` and
    /// `DATABASE_MAX_CONNECTIONS` from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                var: "BIND_ADDR",
                reason: e.to_string(),
            })?;

        let use_persistent = match lookup("USE_PERSISTENT_STORES") {
            Some(v) => v.trim().parse::<bool>().map_err(|e| ConfigError::Invalid {
                var: "USE_PERSISTENT_STORES",
                reason: e.to_string(),
            })?,
            None => false,
        };

        let store = if use_persistent {
            let database_url = lookup("DATABASE_URL")
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing("DATABASE_URL"))?;
            let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
                Some(v) => v.trim().parse::<u32>().map_err(|e| ConfigError::Invalid {
                    var: "DATABASE_MAX_CONNECTIONS",
                    reason: e.to_string(),
                })?,
                None => DEFAULT_MAX_CONNECTIONS,
            };
            StoreConfig::Postgres {
                database_url,
                max_connections,
            }
        } else {
            StoreConfig::InMemory
        };

        Ok(Self { bind_addr, store })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_to_in_memory_on_port_8080() {
        let cfg = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.bind_addr, DEFAULT_BIND_ADDR.parse().unwrap());
        assert_eq!(cfg.store, StoreConfig::InMemory);
    }

    #[test]
    fn persistent_store_requires_database_url() {
        let err = AppConfig::from_lookup(lookup(&[("USE_PERSISTENT_STORES", "true")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("DATABASE_URL"));
    }

    #[test]
    fn reads_postgres_settings() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("USE_PERSISTENT_STORES", "true"),
            ("DATABASE_URL", "postgres://localhost/storefront"),
            ("DATABASE_MAX_CONNECTIONS", "12"),
            ("BIND_ADDR", "127.0.0.1:3001"),
        ]))
        .unwrap();

        assert_eq!(cfg.bind_addr.port(), 3001);
        assert_eq!(
            cfg.store,
            StoreConfig::Postgres {
                database_url: "postgres://localhost/storefront".to_string(),
                max_connections: 12,
            }
        );
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(matches!(
            AppConfig::from_lookup(lookup(&[("BIND_ADDR", "nope")])),
            Err(ConfigError::Invalid { var: "BIND_ADDR", .. })
        ));
        assert!(matches!(
            AppConfig::from_lookup(lookup(&[("USE_PERSISTENT_STORES", "yes")])),
            Err(ConfigError::Invalid { var: "USE_PERSISTENT_STORES", .. })
        ));
    }
}
