use std::path::{Path, PathBuf};

use tracing::warn;

use crate::controller::trainer::DEFAULT_LEARNING_RATE;
use crate::error::ConfigError;

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub trainer: TrainerConfig,
    pub network: NetworkConfig,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub epsilon: f32,
    pub learning_rate: f32,
    pub seed: Option<u64>,
    pub episodes: usize,
    pub max_steps: usize,
    // multiplied into epsilon after every episode
    pub epsilon_decay: f32,
    pub min_epsilon: f32,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        TrainerConfig {
            epsilon: 0.1,
            learning_rate: DEFAULT_LEARNING_RATE,
            seed: None,
            episodes: 100,
            max_steps: 10_000,
            epsilon_decay: 1.0,
            min_epsilon: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub input_size: usize,
    pub output_size: usize,
    pub checkpoint: PathBuf,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            input_size: 10,
            output_size: 3,
            checkpoint: PathBuf::from("checkpoints/qnet.bin"),
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    // a missing file yields the defaults
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            warn!(path = %path.display(), "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.trainer;
        if !(0.0..=1.0).contains(&t.epsilon) {
            return Err(ConfigError::Validation("trainer.epsilon must be in [0, 1]".into()));
        }
        if !(0.0..=1.0).contains(&t.min_epsilon) {
            return Err(ConfigError::Validation("trainer.min_epsilon must be in [0, 1]".into()));
        }
        if !(t.learning_rate > 0.0) {
            return Err(ConfigError::Validation("trainer.learning_rate must be > 0".into()));
        }
        if !(t.epsilon_decay > 0.0 && t.epsilon_decay <= 1.0) {
            return Err(ConfigError::Validation("trainer.epsilon_decay must be in (0, 1]".into()));
        }
        if t.max_steps == 0 {
            return Err(ConfigError::Validation("trainer.max_steps must be > 0".into()));
        }
        if self.network.input_size == 0 || self.network.output_size == 0 {
            return Err(ConfigError::Validation("network sizes must be > 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.trainer.learning_rate, 0.001);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [trainer]
            epsilon = 0.3
            seed = 17

            [network]
            input_size = 220
            "#,
        )
        .unwrap();

        assert_eq!(config.trainer.epsilon, 0.3);
        assert_eq!(config.trainer.seed, Some(17));
        assert_eq!(config.trainer.episodes, 100);
        assert_eq!(config.network.input_size, 220);
        assert_eq!(config.network.output_size, 3);
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[trainer]\nepsilon = 1.5\n").unwrap();

        let err = AppConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = AppConfig::default();
        config.trainer.epsilon_decay = 0.99;
        config.network.checkpoint = PathBuf::from("runs/a.bin");
        std::fs::write(&path, toml::to_string(&config).unwrap()).unwrap();

        assert_eq!(AppConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_malformed_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[trainer\nepsilon = ").unwrap();
        assert!(matches!(AppConfig::load(&path), Err(ConfigError::TomlParse(_))));
    }
}
