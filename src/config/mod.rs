use std::{path::PathBuf, time::Duration};

use log::LevelFilter;
use once_cell::sync::OnceCell;
use serde::Deserialize;

use crate::{
    core::{ErrorKind, SQLError},
    sql::policy::DEFAULT_MAX_JOINS,
};

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub validation: ValidationConfig,
    pub log: LogConfig,
}

#[derive(Deserialize, Debug)]
#[serde(default)]
pub struct ServerConfig {
    pub address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:3000".to_string(),
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(default)]
pub struct StorageConfig {
    /// Holds `lesson_<id>.db` canonical datasets and their ephemeral copies.
    pub data_dir: PathBuf,
    /// Holds `lesson_<id>.json` lesson definitions.
    pub content_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./lesson-data"),
            content_dir: PathBuf::from("./lesson-content"),
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(default)]
pub struct ValidationConfig {
    pub timeout_ms: u64,
    pub max_joins: usize,
    /// Lessons treated as mutation-teaching when their content does not
    /// carry `teachesMutation`.
    pub mutation_lessons: Vec<String>,
}

impl ValidationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5000,
            max_joins: DEFAULT_MAX_JOINS,
            mutation_lessons: ["alter-table", "create-table", "drop-table", "data-definition"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

impl LogConfig {
    pub fn level_filter(&self) -> LevelFilter {
        self.level.parse().unwrap_or(LevelFilter::Info)
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

pub fn parse_config(config_str: &str) -> Result<Config, SQLError> {
    toml::from_str(config_str)
        .map_err(|e| SQLError::new(ErrorKind::ConfigError, format!("invalid config: {e}")))
}

/// A missing file yields the defaults.
pub fn load_config(path: &str) -> Result<Config, SQLError> {
    match std::fs::read_to_string(path) {
        Ok(config_str) => parse_config(&config_str),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
        Err(e) => Err(SQLError::new(
            ErrorKind::ConfigError,
            format!("unable to read config file {path}: {e}"),
        )),
    }
}

static CONFIG: OnceCell<Config> = OnceCell::new();

pub fn initialize_config(path: &str) -> Result<&'static Config, SQLError> {
    let config = load_config(path)?;
    Ok(CONFIG.get_or_init(|| config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.server.address, "127.0.0.1:3000");
        assert_eq!(config.validation.max_joins, 3);
        assert_eq!(config.validation.timeout(), Duration::from_secs(5));
        assert!(config
            .validation
            .mutation_lessons
            .contains(&"alter-table".to_string()));
        assert_eq!(config.log.level_filter(), LevelFilter::Info);
    }

    #[test]
    fn sections_override_defaults() {
        let config = parse_config(
            r#"
            [storage]
            data_dir = "/srv/lesson-data"

            [validation]
            max_joins = 5
            mutation_lessons = ["ddl-intro"]

            [log]
            level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.storage.data_dir, PathBuf::from("/srv/lesson-data"));
        assert_eq!(config.storage.content_dir, PathBuf::from("./lesson-content"));
        assert_eq!(config.validation.max_joins, 5);
        assert_eq!(config.validation.mutation_lessons, vec!["ddl-intro"]);
        assert_eq!(config.log.level_filter(), LevelFilter::Debug);
    }

    #[test]
    fn malformed_config_is_reported() {
        let err = parse_config("[validation]\nmax_joins = \"many\"").unwrap_err();
        assert_eq!(err.kind, ErrorKind::ConfigError);
    }

    #[test]
    fn missing_file_means_defaults() {
        let config = load_config("/nonexistent/sqlgrade.toml").unwrap();
        assert_eq!(config.storage.data_dir, PathBuf::from("./lesson-data"));
    }
}
