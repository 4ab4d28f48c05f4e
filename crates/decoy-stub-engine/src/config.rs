//! Engine configuration.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Logical service name -> OpenAPI document path.
    #[serde(default)]
    pub spec_files: HashMap<String, PathBuf>,

    /// Layered stub files, highest precedence first. Accepts a single path
    /// or a list.
    #[serde(default, deserialize_with = "one_or_many")]
    pub stubs_config: Vec<PathBuf>,

    /// Enable the persisted per-environment preset source.
    #[serde(default)]
    pub db_preset_enabled: bool,

    #[serde(default)]
    pub state: StateConfig,
}

impl EngineConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: EngineConfig =
            serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.state.backend.as_str() {
            "inmemory" => {}
            "redis" => {
                if self.state.redis.is_none() {
                    return Err(ConfigError::Invalid(
                        "state.backend is 'redis' but state.redis is not configured".to_string(),
                    ));
                }
            }
            other => {
                return Err(ConfigError::Invalid(format!(
                    "unknown state backend '{other}' (expected 'inmemory' or 'redis')"
                )));
            }
        }
        Ok(())
    }
}

/// Shared-state backend selection, mirrored into [`crate::state`].
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StateConfig {
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Default TTL for state entries, seconds.
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redis: Option<RedisConfig>,
}

impl Default for StateConfig {
    fn default() -> Self {
        StateConfig {
            backend: default_backend(),
            ttl_seconds: default_ttl_seconds(),
            redis: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedisConfig {
    pub url: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    #[serde(default)]
    pub key_prefix: String,
}

fn default_backend() -> String {
    "inmemory".to_string()
}

fn default_ttl_seconds() -> u64 {
    // prompt wish-lists live for a month unless replaced
    60 * 60 * 24 * 30
}

fn default_pool_size() -> usize {
    5
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<PathBuf>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(PathBuf),
        Many(Vec<PathBuf>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(path) => vec![path],
        OneOrMany::Many(paths) => paths,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: EngineConfig = serde_yaml::from_str("{}").unwrap();
        assert!(config.spec_files.is_empty());
        assert!(config.stubs_config.is_empty());
        assert!(!config.db_preset_enabled);
        assert_eq!(config.state.backend, "inmemory");
    }

    #[test]
    fn test_stubs_config_scalar_or_list() {
        let config: EngineConfig = serde_yaml::from_str("stubs_config: .stubs.yaml").unwrap();
        assert_eq!(config.stubs_config, vec![PathBuf::from(".stubs.yaml")]);

        let config: EngineConfig =
            serde_yaml::from_str("stubs_config: [override.yaml, base.yaml]").unwrap();
        assert_eq!(
            config.stubs_config,
            vec![PathBuf::from("override.yaml"), PathBuf::from("base.yaml")]
        );
    }

    #[test]
    fn test_validate_redis_requires_config() {
        let config: EngineConfig = serde_yaml::from_str("state: {backend: redis}").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config: EngineConfig = serde_yaml::from_str(
            "state:\n  backend: redis\n  redis:\n    url: redis://localhost:6379\n",
        )
        .unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.state.redis.unwrap().pool_size, 5);
    }

    #[test]
    fn test_validate_unknown_backend() {
        let config: EngineConfig = serde_yaml::from_str("state: {backend: etcd}").unwrap();
        let err = config.validate().err().unwrap().to_string();
        assert!(err.contains("unknown state backend"));
    }
}
