//! Runtime configuration.
//!
//! Values come from the environment; the CLI overrides individual fields
//! after loading.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::api::SecurityConfig;
use crate::db;

pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite file (from MANIFESTATION_DB, else the platform data dir).
    pub database_path: PathBuf,
    /// HTTP port (from MANIFESTATION_PORT).
    pub port: u16,
    pub security: SecurityConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_env_with_db(None)
    }

    /// Like [`from_env`](Self::from_env), with `database_path` taking
    /// precedence over MANIFESTATION_DB. The platform data directory is only
    /// consulted when neither is given.
    pub fn from_env_with_db(database_path: Option<PathBuf>) -> Result<Self> {
        let database_path = match database_path {
            Some(path) => path,
            None => match std::env::var("MANIFESTATION_DB") {
                Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
                _ => db::default_path()?,
            },
        };

        let port = match std::env::var("MANIFESTATION_PORT") {
            Ok(port) => port
                .trim()
                .parse()
                .with_context(|| format!("MANIFESTATION_PORT is not a valid port: {port:?}"))?,
            Err(_) => DEFAULT_PORT,
        };

        Ok(Self {
            database_path,
            port,
            security: SecurityConfig::from_env(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_database_path_wins() {
        let path = PathBuf::from("/tmp/manifestation-config-test/journal.db");

        let config = Config::from_env_with_db(Some(path.clone())).unwrap();

        assert_eq!(config.database_path, path);
    }
}
