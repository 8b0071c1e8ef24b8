//! Configuration for the mouse-to-gamepad bridge
//!
//! Stored as TOML by default. A `.json` path is read and written as JSON so
//! configs from older setups keep working.

use crate::buttons::{default_bindings, ButtonBinding, ButtonMap};
use crate::error::BridgeError;
use crate::gamepad::{GamepadSpec, DEFAULT_AXIS_MAX};
use crate::mapper::Sensitivity;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Complete bridge configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Mouse event device; auto-detected when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mouse_device: Option<PathBuf>,
    /// Name for the virtual gamepad device
    pub gamepad_name: String,
    /// Stick sensitivity in [0, 1]; out-of-range values are clamped at use
    pub sensitivity: f64,
    pub vendor: u16,
    pub product: u16,
    pub version: u16,
    /// Stick range advertised by the virtual device
    pub axis_max: i32,
    /// Grab the mouse exclusively while running
    pub grab: bool,
    /// Mouse-to-gamepad button routing
    pub buttons: Vec<ButtonBinding>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            mouse_device: None,
            gamepad_name: "Virtual Gamepad".to_string(),
            sensitivity: 0.5,
            vendor: 0x1234,
            product: 0x5678,
            version: 0x100,
            axis_max: DEFAULT_AXIS_MAX,
            grab: false,
            buttons: default_bindings(),
        }
    }
}

impl BridgeConfig {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mouse-gamepad")
            .join("config.toml")
    }

    /// Load config from a file, or return default if not found
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            if is_json(path) {
                Self::from_json(&content)
            } else {
                Self::from_toml(&content)
            }
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_json(content: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Save config to a file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = if is_json(path) {
            serde_json::to_string_pretty(self)?
        } else {
            toml::to_string_pretty(self)?
        };
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check the values the bridge cannot run with
    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.axis_max <= 0 {
            return Err(BridgeError::Config(format!(
                "axis_max must be positive, got {}",
                self.axis_max
            )));
        }
        if self.gamepad_name.trim().is_empty() {
            return Err(BridgeError::Config("gamepad_name is empty".to_string()));
        }
        if ButtonMap::new(&self.buttons)?.is_empty() {
            warn!("No button bindings configured; only the stick will be mapped");
        }
        Ok(())
    }

    pub fn sensitivity(&self) -> Sensitivity {
        Sensitivity::new(self.sensitivity, self.axis_max)
    }

    pub fn button_map(&self) -> Result<ButtonMap, BridgeError> {
        ButtonMap::new(&self.buttons)
    }

    /// Identity and capabilities for the virtual device
    pub fn gamepad_spec(&self, buttons: &ButtonMap) -> GamepadSpec {
        GamepadSpec {
            name: self.gamepad_name.clone(),
            vendor: self.vendor,
            product: self.product,
            version: self.version,
            axis_max: self.axis_max,
            buttons: buttons.gamepad_buttons(),
        }
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use evdev::Key;

    #[test]
    fn test_default_config_serializes() {
        let config = BridgeConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("Virtual Gamepad"));
        assert!(toml_str.contains("mouse = \"left\""));
        assert!(toml_str.contains("gamepad = \"south\""));
        assert!(!toml_str.contains("mouse_device"));
    }

    #[test]
    fn test_roundtrip() {
        let mut config = BridgeConfig::default();
        config.mouse_device = Some(PathBuf::from("/dev/input/event4"));
        config.sensitivity = 0.25;
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = BridgeConfig::from_toml(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_legacy_json_format() {
        let json = r#"{
            "mouse_device": "/dev/input/event5",
            "gamepad_name": "Virtual Gamepad",
            "sensitivity": 0.5,
            "vendor": 4660,
            "product": 22136,
            "version": 256
        }"#;
        let config = BridgeConfig::from_json(json).unwrap();
        assert_eq!(config.mouse_device, Some(PathBuf::from("/dev/input/event5")));
        assert_eq!(config.vendor, 0x1234);
        assert_eq!(config.product, 0x5678);
        assert_eq!(config.version, 0x100);
        assert_eq!(config.axis_max, DEFAULT_AXIS_MAX);
        assert_eq!(config.buttons, default_bindings());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = BridgeConfig::from_toml(
            r#"
sensitivity = 0.8
grab = true

[[buttons]]
mouse = "side"
gamepad = "tl"
"#,
        )
        .unwrap();
        assert_eq!(config.sensitivity, 0.8);
        assert!(config.grab);
        assert_eq!(config.gamepad_name, "Virtual Gamepad");
        assert_eq!(
            config.buttons,
            vec![ButtonBinding::new(Key::BTN_SIDE, Key::BTN_TL)]
        );
    }

    #[test]
    fn test_validate() {
        assert!(BridgeConfig::default().validate().is_ok());

        let mut config = BridgeConfig::default();
        config.axis_max = 0;
        assert!(config.validate().is_err());

        let mut config = BridgeConfig::default();
        config.buttons.push(ButtonBinding::new(Key::BTN_LEFT, Key::BTN_NORTH));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_button_table_is_valid() {
        let config = BridgeConfig::from_toml("buttons = []\n").unwrap();
        assert!(config.buttons.is_empty());
        assert!(config.validate().is_ok());
        assert!(config.button_map().unwrap().is_empty());
        assert!(!BridgeConfig::default().button_map().unwrap().is_empty());
    }

    #[test]
    fn test_gamepad_spec_from_config() {
        let config = BridgeConfig::default();
        let spec = config.gamepad_spec(&config.button_map().unwrap());
        assert_eq!(spec.name, "Virtual Gamepad");
        assert_eq!(spec.axis_max, 32767);
        assert_eq!(
            spec.buttons,
            vec![Key::BTN_SOUTH.code(), Key::BTN_EAST.code()]
        );
    }

    #[test]
    fn test_sensitivity_clamped_at_use() {
        let mut config = BridgeConfig::default();
        config.sensitivity = 4.0;
        assert_eq!(config.sensitivity().factor(), 1.0);
    }

    #[test]
    fn test_missing_file_gives_default() {
        let path = std::env::temp_dir().join("mouse-gamepad-does-not-exist.toml");
        let config = BridgeConfig::load(&path).unwrap();
        assert_eq!(config, BridgeConfig::default());
    }

    #[test]
    fn test_save_and_load_json() {
        let dir = std::env::temp_dir().join(format!("mouse-gamepad-test-{}", std::process::id()));
        let path = dir.join("config.json");
        let mut config = BridgeConfig::default();
        config.gamepad_name = "Desk Pad".to_string();
        config.save(&path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.trim_start().starts_with('{'));
        assert_eq!(BridgeConfig::load(&path).unwrap(), config);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
