//! Panel configuration
//!
//! Loaded from a JSON file; every field has a default so partial files work.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PanelError, Result};

/// Default name of the marker layer
pub const DEFAULT_MARKER_NAME: &str = "White Balance";

/// Default auto-toggle debounce window in milliseconds
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Label texts shown in the mode label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Labels {
    pub manual: String,
    pub auto: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            manual: "Manual White Balance".to_string(),
            auto: "Auto White Balance Applied".to_string(),
        }
    }
}

/// Undo-step names used for each kind of transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionNames {
    pub temperature: String,
    pub tint: String,
    pub auto: String,
    pub auto_off: String,
    pub reset: String,
    pub pipeline: String,
}

impl Default for TransactionNames {
    fn default() -> Self {
        Self {
            temperature: "Adjust Temperature".to_string(),
            tint: "Adjust Tint".to_string(),
            auto: "Auto White Balance".to_string(),
            auto_off: "Manual White Balance".to_string(),
            reset: "Reset White Balance".to_string(),
            pipeline: "Apply Effect".to_string(),
        }
    }
}

/// Configuration for the panel core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    /// Name of the marker layer (first match wins)
    pub marker_layer_name: String,

    /// Auto-toggle debounce window in milliseconds
    pub debounce_ms: u64,

    /// Inclusive slider range, applied before values are written
    pub slider_range: (f64, f64),

    pub labels: Labels,

    pub transaction_names: TransactionNames,

    /// History command names that flatten or merge layers
    pub flatten_commands: Vec<String>,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            marker_layer_name: DEFAULT_MARKER_NAME.to_string(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            slider_range: (-100.0, 100.0),
            labels: Labels::default(),
            transaction_names: TransactionNames::default(),
            flatten_commands: vec![
                "Flatten Image".to_string(),
                "Merge Visible".to_string(),
                "Merge Layers".to_string(),
                "Merge Down".to_string(),
            ],
        }
    }
}

impl PanelConfig {
    /// Load configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| PanelError::InvalidConfig {
            reason: format!("cannot read {}: {}", path.display(), e),
        })?;
        let config: PanelConfig =
            serde_json::from_str(&content).map_err(|e| PanelError::InvalidConfig {
                reason: format!("{}: {}", path.display(), e),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values the panel cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.marker_layer_name.trim().is_empty() {
            return Err(PanelError::InvalidConfig {
                reason: "marker_layer_name must not be empty".to_string(),
            });
        }
        let (min, max) = self.slider_range;
        if min >= max || min > 0.0 || max < 0.0 {
            return Err(PanelError::InvalidConfig {
                reason: format!("slider_range ({}, {}) must contain zero", min, max),
            });
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Clamp a slider value into the configured range
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.slider_range.0, self.slider_range.1)
    }

    /// Whether a history-changed command name removes layers by merging
    pub fn is_flatten_command(&self, command: &str) -> bool {
        self.flatten_commands
            .iter()
            .any(|c| c.eq_ignore_ascii_case(command))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = PanelConfig::default();
        assert_eq!(config.marker_layer_name, "White Balance");
        assert_eq!(config.debounce(), Duration::from_millis(300));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("panel.json");
        fs::write(&path, r#"{ "debounce_ms": 50, "labels": { "auto": "Auto" } }"#).unwrap();

        let config = PanelConfig::load(&path).unwrap();
        assert_eq!(config.debounce_ms, 50);
        assert_eq!(config.labels.auto, "Auto");
        assert_eq!(config.labels.manual, "Manual White Balance");
        assert_eq!(config.marker_layer_name, DEFAULT_MARKER_NAME);
    }

    #[test]
    fn test_invalid_range_rejected() {
        let config = PanelConfig {
            slider_range: (10.0, 100.0),
            ..PanelConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PanelError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = PanelConfig::load(Path::new("/nonexistent/panel.json")).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_flatten_command_matching() {
        let config = PanelConfig::default();
        assert!(config.is_flatten_command("Flatten Image"));
        assert!(config.is_flatten_command("merge visible"));
        assert!(!config.is_flatten_command("Brush Tool"));
    }

    #[test]
    fn test_clamp() {
        let config = PanelConfig::default();
        assert_eq!(config.clamp(150.0), 100.0);
        assert_eq!(config.clamp(-150.0), -100.0);
        assert_eq!(config.clamp(15.0), 15.0);
    }
}
