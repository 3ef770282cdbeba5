use crate::error::{ClusterError, Result};
use crate::graph::ClusterFinder;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_DIR: &str = "~/.config/kwcluster/";
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const DATABASE_FILE_NAME: &str = "rankings.db";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: format!("{}{}", DEFAULT_CONFIG_DIR, DATABASE_FILE_NAME),
        }
    }
}

/// Run settings. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    /// RBO persistence probability.
    pub rbo_p: f64,
    pub power: u32,
    pub inflation: u32,
    pub max_iterations: usize,
    /// Concurrent fetches during ingestion.
    pub max_in_flight: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            rbo_p: 0.9,
            power: 2,
            inflation: 5,
            max_iterations: 100,
            max_in_flight: 10,
        }
    }
}

/// Expand a leading `~` in a user-supplied path.
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config = Self::from_json(&content)?;
        Ok(config)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        expand_path(&self.database.path)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.rbo_p > 0.0 && self.rbo_p <= 1.0) {
            return Err(ClusterError::Config(format!(
                "rbo_p must be in (0, 1], got {}",
                self.rbo_p
            )));
        }
        if self.power < 1 {
            return Err(ClusterError::Config("power must be at least 1".to_string()));
        }
        if self.inflation < 1 {
            return Err(ClusterError::Config("inflation must be at least 1".to_string()));
        }
        if self.max_iterations < 1 {
            return Err(ClusterError::Config(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if self.max_in_flight < 1 {
            return Err(ClusterError::Config(
                "max_in_flight must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn finder(&self) -> ClusterFinder {
        ClusterFinder::new()
            .with_rbo_p(self.rbo_p)
            .with_power(self.power)
            .with_inflation(self.inflation)
            .with_max_iterations(self.max_iterations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_uses_defaults() {
        let config = Config::from_json("{}").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_override() {
        let config = Config::from_json(r#"{"rbo_p": 0.8, "database": {"path": "/tmp/r.db"}}"#)
            .unwrap();
        assert_eq!(config.rbo_p, 0.8);
        assert_eq!(config.power, 2);
        assert_eq!(config.database_path(), PathBuf::from("/tmp/r.db"));
    }

    #[test]
    fn test_validation() {
        assert!(Config::from_json(r#"{"rbo_p": 0.0}"#).is_err());
        assert!(Config::from_json(r#"{"rbo_p": 1.2}"#).is_err());
        assert!(Config::from_json(r#"{"rbo_p": 1.0}"#).is_ok());
        assert!(Config::from_json(r#"{"power": 0}"#).is_err());
        assert!(Config::from_json(r#"{"inflation": 0}"#).is_err());
        assert!(Config::from_json(r#"{"max_iterations": 0}"#).is_err());
        assert!(matches!(
            Config::from_json(r#"{"max_in_flight": 0}"#),
            Err(ClusterError::Config(_))
        ));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            Config::from_json("{rbo_p"),
            Err(ClusterError::Json(_))
        ));
    }

    #[test]
    fn test_tilde_expansion() {
        let expanded = expand_path("~/kw");
        assert!(expanded.ends_with("kw"));
        assert_eq!(expand_path("/abs/path"), PathBuf::from("/abs/path"));
    }
}
