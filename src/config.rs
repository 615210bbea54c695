use crate::core::db::ConnectionTarget;
use crate::core::{Result, StoreError};
use crate::store::StoreOptions;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub connection: ConnectionConfig,
    pub store: Option<StoreConfig>,
}

/// Connection settings, selected by the `backend` key.
#[derive(Debug, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum ConnectionConfig {
    Sqlite {
        path: PathBuf,
    },
    Mysql {
        host: String,
        database: String,
        #[serde(default)]
        username: String,
        #[serde(default)]
        password: String,
        charset: Option<String>,
    },
}

/// Record store behavior.
#[derive(Debug, Default, Deserialize)]
pub struct StoreConfig {
    pub id_field_name: Option<String>,
    pub exit_after_error: Option<bool>,
}

impl Config {
    pub fn target(&self) -> ConnectionTarget {
        match &self.connection {
            ConnectionConfig::Sqlite { path } => ConnectionTarget::sqlite(path.clone()),
            ConnectionConfig::Mysql { host, database, .. } => {
                ConnectionTarget::mysql(host.clone(), database.clone())
            }
        }
    }

    /// Username and password; empty for SQLite.
    pub fn credentials(&self) -> (&str, &str) {
        match &self.connection {
            ConnectionConfig::Sqlite { .. } => ("", ""),
            ConnectionConfig::Mysql {
                username, password, ..
            } => (username.as_str(), password.as_str()),
        }
    }

    pub fn charset(&self) -> Option<&str> {
        match &self.connection {
            ConnectionConfig::Mysql { charset, .. } => charset.as_deref(),
            ConnectionConfig::Sqlite { .. } => None,
        }
    }

    pub fn options(&self) -> StoreOptions {
        let mut options = StoreOptions::new();
        if let Some(store) = &self.store {
            if let Some(name) = &store.id_field_name {
                options = options.id_field_name(name.as_str());
            }
            if let Some(exit) = store.exit_after_error {
                options = options.exit_after_error(exit);
            }
        }
        options
    }
}

/// Loads configuration from a TOML file at the given path.
///
/// # Example
///
/// ```no_run
/// use recordstore::config::load_config;
/// use recordstore::RecordStore;
///
/// let config = load_config("recordstore.toml").expect("Failed to load config");
/// let store = RecordStore::from_config(&config);
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses configuration from TOML text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content)?;
    if let ConnectionConfig::Mysql { host, database, .. } = &config.connection {
        if host.is_empty() || database.is_empty() {
            return Err(StoreError::Config(
                "mysql connection requires a host and a database".to_string(),
            ));
        }
    }
    Ok(config)
}
