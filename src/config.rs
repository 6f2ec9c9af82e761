use crate::state::Position;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "./statlay.yaml";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    #[serde(default = "default_text_color")]
    pub text_color: String,
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    #[serde(default = "default_margin_px")]
    pub margin_px: f32,
    #[serde(default = "default_window_width")]
    pub window_width: f32,
    #[serde(default = "default_window_height")]
    pub window_height: f32,
    #[serde(default)]
    pub gpu: GpuConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GpuConfig {
    #[serde(default = "default_nvml")]
    pub nvml: bool,
    #[serde(default = "default_smi_command")]
    pub smi_command: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            position: None,
            opacity: default_opacity(),
            text_color: default_text_color(),
            font_size: default_font_size(),
            margin_px: default_margin_px(),
            window_width: default_window_width(),
            window_height: default_window_height(),
            gpu: GpuConfig::default(),
        }
    }
}

impl Default for GpuConfig {
    fn default() -> Self {
        Self {
            nvml: default_nvml(),
            smi_command: default_smi_command(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: String, source: io::Error },
    #[error("failed to parse YAML in {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("invalid config: {0}")]
    Validation(String),
}

impl Config {
    /// Loads `path` when given. Without an explicit path the default file is
    /// optional and built-in defaults are used when it does not exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    Self::load_from_file(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let path_display = path_ref.display().to_string();
        let text = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_display.clone(),
            source,
        })?;

        // An empty document deserializes to unit, not to a mapping.
        let cfg: Config = if text.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path_display,
                source,
            })?
        };

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_ms < 100 {
            return Err(ConfigError::Validation("interval_ms must be >= 100".to_string()));
        }
        if !(0.1..=1.0).contains(&self.opacity) {
            return Err(ConfigError::Validation("opacity must be in range 0.1..=1.0".to_string()));
        }
        if parse_hex_rgb(&self.text_color).is_none() {
            return Err(ConfigError::Validation(format!(
                "text_color '{}' must look like #rrggbb",
                self.text_color
            )));
        }
        if self.font_size <= 0.0 {
            return Err(ConfigError::Validation("font_size must be > 0".to_string()));
        }
        if self.margin_px < 0.0 {
            return Err(ConfigError::Validation("margin_px must be >= 0".to_string()));
        }
        if self.window_width <= 0.0 || self.window_height <= 0.0 {
            return Err(ConfigError::Validation(
                "window_width and window_height must be > 0".to_string(),
            ));
        }
        if self.gpu.smi_command.trim().is_empty() {
            return Err(ConfigError::Validation("gpu.smi_command must not be empty".to_string()));
        }

        Ok(())
    }

    pub fn text_rgb(&self) -> [u8; 3] {
        parse_hex_rgb(&self.text_color).unwrap_or(DEFAULT_TEXT_RGB)
    }

    pub fn example_yaml() -> &'static str {
        include_str!("../config.yaml.example")
    }
}

const DEFAULT_TEXT_RGB: [u8; 3] = [0xaa, 0x1d, 0xc6];

pub fn parse_hex_rgb(input: &str) -> Option<[u8; 3]> {
    let hex = input.trim().strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

const fn default_interval_ms() -> u64 {
    1000
}

const fn default_opacity() -> f32 {
    0.85
}

fn default_text_color() -> String {
    "#aa1dc6".to_string()
}

const fn default_font_size() -> f32 {
    13.0
}

const fn default_margin_px() -> f32 {
    10.0
}

const fn default_window_width() -> f32 {
    200.0
}

const fn default_window_height() -> f32 {
    120.0
}

const fn default_nvml() -> bool {
    true
}

fn default_smi_command() -> String {
    "nvidia-smi".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(text.as_bytes()).expect("write config");
        file
    }

    #[test]
    fn defaults_are_valid() {
        Config::default()
            .validate()
            .expect("built-in defaults must pass validation");
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let file = write_config("interval_ms: 2000\nposition: bottom-left\n");
        let cfg = Config::load_from_file(file.path()).expect("config should load");

        assert_eq!(cfg.interval_ms, 2000);
        assert_eq!(cfg.position, Some(Position::BottomLeft));
        assert_eq!(cfg.text_color, "#aa1dc6");
        assert_eq!(cfg.gpu.smi_command, "nvidia-smi");
        assert!(cfg.gpu.nvml);
    }

    #[test]
    fn empty_file_means_defaults() {
        let file = write_config("\n");
        let cfg = Config::load_from_file(file.path()).expect("empty config should load");
        assert_eq!(cfg.interval_ms, 1000);
        assert_eq!(cfg.position, None);
    }

    #[test]
    fn unknown_position_is_a_parse_error() {
        let file = write_config("position: center\n");
        let err = Config::load_from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }), "got {err:?}");
    }

    #[test]
    fn explicit_missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = Config::load(Some(&dir.path().join("missing.yaml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }), "got {err:?}");
    }

    #[test]
    fn rejects_out_of_range_values() {
        let mut cfg = Config {
            interval_ms: 50,
            ..Config::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::Validation(_))));

        cfg.interval_ms = 1000;
        cfg.opacity = 0.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::Validation(_))));

        cfg.opacity = 0.85;
        cfg.text_color = "purple".to_string();
        assert!(matches!(cfg.validate(), Err(ConfigError::Validation(_))));

        cfg.text_color = "#aa1dc6".to_string();
        cfg.gpu.smi_command = "  ".to_string();
        assert!(matches!(cfg.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn hex_colors() {
        assert_eq!(parse_hex_rgb("#aa1dc6"), Some([0xaa, 0x1d, 0xc6]));
        assert_eq!(parse_hex_rgb(" #FFFFFF "), Some([255, 255, 255]));
        assert_eq!(parse_hex_rgb("aa1dc6"), None);
        assert_eq!(parse_hex_rgb("#aa1dc"), None);
        assert_eq!(parse_hex_rgb("#gg0000"), None);
    }

    #[test]
    fn example_yaml_parses() {
        let cfg: Config = serde_yaml::from_str(Config::example_yaml()).expect("example parses");
        cfg.validate().expect("example is valid");
    }
}
