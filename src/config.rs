// Configuration for the pick'em engine.
// Supports YAML configuration files for scoring points and editor history.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub history: HistorySettings,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(String),
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        if !Path::new(path).exists() {
            return Err(ConfigError::NotFound(path.to_string()));
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Load configuration from file if it exists, otherwise use defaults.
    pub fn load_or_default(path: Option<&str>) -> Self {
        match path {
            Some(p) => Self::from_file(p).unwrap_or_else(|e| {
                warn!("{}; using default configuration", e);
                Self::default()
            }),
            None => {
                for default_path in &["pickem.yaml", "pickem.yml", ".pickem.yaml"] {
                    if Path::new(default_path).exists() {
                        if let Ok(config) = Self::from_file(default_path) {
                            return config;
                        }
                    }
                }
                Self::default()
            }
        }
    }

    /// Save configuration to a YAML file.
    pub fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)?;
        Ok(())
    }
}

/// Scoring configuration shared by both challenge formats.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringSettings {
    /// Points awarded per counted pick (correct winner for the best-bracket
    /// challenge, correct loser for the worst-bracket challenge).
    #[serde(default = "default_points_per_pick")]
    pub points_per_pick: u32,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        ScoringSettings { points_per_pick: default_points_per_pick() }
    }
}

fn default_points_per_pick() -> u32 {
    10
}

/// Pick-editor history settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorySettings {
    /// How many undo snapshots the editor keeps before evicting the oldest.
    #[serde(default = "default_max_snapshots")]
    pub max_snapshots: usize,
}

impl Default for HistorySettings {
    fn default() -> Self {
        HistorySettings { max_snapshots: default_max_snapshots() }
    }
}

fn default_max_snapshots() -> usize {
    20
}

/// Generate a sample configuration file.
pub fn generate_sample_config() -> String {
    r#"# pickem configuration
# All values shown are defaults - uncomment and modify as needed

# Scoring configuration
scoring:
  # Points per counted pick (correct winner for Best, correct loser for Worst)
  points_per_pick: 10

# Pick editor history
history:
  # Undo snapshots kept before the oldest is evicted
  max_snapshots: 20
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.scoring.points_per_pick, 10);
        assert_eq!(config.history.max_snapshots, 20);
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
scoring:
  points_per_pick: 25
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.scoring.points_per_pick, 25);
        // Defaults should still work
        assert_eq!(config.history.max_snapshots, 20);
    }

    #[test]
    fn test_sample_config_parses() {
        let config: Config = serde_yaml::from_str(&generate_sample_config()).unwrap();
        assert_eq!(config.scoring.points_per_pick, 10);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = Config::load_or_default(Some("/definitely/not/here.yaml"));
        assert_eq!(config.scoring.points_per_pick, 10);
    }
}
