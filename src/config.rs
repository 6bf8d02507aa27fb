use std::{
    collections::BTreeMap,
    env::var,
    path::{Path, PathBuf},
    str::FromStr,
};

use dotenvy::dotenv;
use thiserror::Error;

use crate::{
    application::handlers::dispatch_engine::DEFAULT_QUEUE_CAPACITY,
    domain::models::{AuthRule, SenderConfig},
};

const DEFAULT_OUTBOUND_MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("An error occured while getting {0} env param")]
    Missing(&'static str),
    #[error("An error occured while parsing {name} env param: {value}")]
    Invalid { name: &'static str, value: String },
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub scheme: String,
    pub host: String,
    /// History goes to Postgres when set, otherwise it is kept in memory.
    pub database_url: Option<String>,
    /// JSON array of sender configurations loaded at startup.
    pub senders_file: Option<PathBuf>,
    /// JSON array of inbound auth rules. No file, no authentication.
    pub auth_file: Option<PathBuf>,
    pub queue_capacity: usize,
    pub outbound_max_attempts: u32,
}

impl Config {
    pub fn try_parse() -> Result<Config, ConfigError> {
        let _ = dotenv();
        Self::from_lookup(|name| var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Config, ConfigError> {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        Ok(Config {
            port: parse("PORT", get("PORT").ok_or(ConfigError::Missing("PORT"))?)?,
            scheme: get("SCHEME").unwrap_or_else(|| "http".to_string()),
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            database_url: get("DATABASE_URL"),
            senders_file: get("SENDERS_FILE").map(PathBuf::from),
            auth_file: get("AUTH_FILE").map(PathBuf::from),
            queue_capacity: get("QUEUE_CAPACITY")
                .map(|value| parse("QUEUE_CAPACITY", value))
                .transpose()?
                .unwrap_or(DEFAULT_QUEUE_CAPACITY),
            outbound_max_attempts: get("OUTBOUND_MAX_ATTEMPTS")
                .map(|value| parse("OUTBOUND_MAX_ATTEMPTS", value))
                .transpose()?
                .unwrap_or(DEFAULT_OUTBOUND_MAX_ATTEMPTS),
        })
    }

    pub fn sender_configs(&self) -> Result<Vec<SenderConfig>, ConfigError> {
        let Some(path) = &self.senders_file else {
            return Ok(Vec::new());
        };
        Ok(read_string_maps(path)?
            .into_iter()
            .map(SenderConfig::new)
            .collect())
    }

    pub fn auth_rules(&self) -> Result<Vec<AuthRule>, ConfigError> {
        let Some(path) = &self.auth_file else {
            return Ok(Vec::new());
        };
        Ok(read_string_maps(path)?
            .iter()
            .map(AuthRule::from_map)
            .collect())
    }
}

fn parse<T: FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}

fn read_string_maps(path: &Path) -> Result<Vec<BTreeMap<String, String>>, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
