use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::audio::spectrum::AnalyserSettings;

const CONFIG_FILE: &str = "beatpulse.toml";
const APP_DIR: &str = "beatpulse";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("fft size {0} must be a power of two between 32 and 32768")]
    InvalidFftSize(usize),
    #[error("decibel range is empty: min {min} dB is not below max {max} dB")]
    InvertedDbRange { min: f32, max: f32 },
    #[error("smoothing {0} must be in [0, 1)")]
    InvalidSmoothing(f32),
    #[error("fps must be greater than zero")]
    ZeroFps,
}

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub analyser: AnalyserConfig,
    #[serde(default)]
    pub tonality: TonalityConfig,
}

#[derive(Debug, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_true")]
    pub display_bpm: bool,
    #[serde(default = "default_true")]
    pub change_colors: bool,
    #[serde(default)]
    pub font: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct AnalyserConfig {
    #[serde(default = "default_fft_size")]
    pub fft_size: usize,
    #[serde(default = "default_smoothing")]
    pub smoothing: f32,
    #[serde(default = "default_min_db")]
    pub min_db: f32,
    #[serde(default = "default_max_db")]
    pub max_db: f32,
}

#[derive(Debug, Deserialize)]
pub struct TonalityConfig {
    #[serde(default = "default_rule")]
    pub rule: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            width: default_width(),
            height: default_height(),
            display_bpm: true,
            change_colors: true,
            font: None,
        }
    }
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            fft_size: default_fft_size(),
            smoothing: default_smoothing(),
            min_db: default_min_db(),
            max_db: default_max_db(),
        }
    }
}

impl Default for TonalityConfig {
    fn default() -> Self {
        Self {
            rule: default_rule(),
        }
    }
}

pub fn default_fps() -> u32 { 60 }
pub fn default_width() -> u32 { 1280 }
pub fn default_height() -> u32 { 720 }
pub fn default_fft_size() -> usize { 512 }
pub fn default_smoothing() -> f32 { 0.8 }
fn default_min_db() -> f32 { -100.0 }
fn default_max_db() -> f32 { -30.0 }
pub fn default_rule() -> String { "filename".into() }
fn default_true() -> bool { true }

impl AnalyserConfig {
    pub fn settings(&self) -> AnalyserSettings {
        AnalyserSettings {
            fft_size: self.fft_size,
            smoothing: self.smoothing,
            min_db: self.min_db,
            max_db: self.max_db,
        }
    }
}

/// Reject analyser and display settings the pipeline cannot run with.
pub fn validate(settings: &AnalyserSettings, fps: u32) -> Result<(), ConfigError> {
    let n = settings.fft_size;
    if !n.is_power_of_two() || !(32..=32768).contains(&n) {
        return Err(ConfigError::InvalidFftSize(n));
    }
    if settings.min_db >= settings.max_db {
        return Err(ConfigError::InvertedDbRange {
            min: settings.min_db,
            max: settings.max_db,
        });
    }
    if !(0.0..1.0).contains(&settings.smoothing) {
        return Err(ConfigError::InvalidSmoothing(settings.smoothing));
    }
    if fps == 0 {
        return Err(ConfigError::ZeroFps);
    }
    Ok(())
}

/// `./beatpulse.toml`, then `~/.config/beatpulse/config.toml`, then the
/// platform config directory.
pub fn discover_config() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join(APP_DIR).join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join(APP_DIR).join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    parse_config(&content)
}

fn parse_config(content: &str) -> Option<Config> {
    match toml::from_str(content) {
        Ok(config) => Some(config),
        Err(e) => {
            log::warn!("Invalid config: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.display.fps, 60);
        assert!(config.display.display_bpm);
        assert!(config.display.change_colors);
        assert_eq!(config.analyser.fft_size, 512);
        assert_eq!(config.tonality.rule, "filename");
    }

    #[test]
    fn partial_sections() {
        let config = parse_config(
            r#"
            [display]
            fps = 30
            change_colors = false

            [analyser]
            smoothing = 0.5

            [tonality]
            rule = "minor"
            "#,
        )
        .unwrap();
        assert_eq!(config.display.fps, 30);
        assert_eq!(config.display.width, 1280);
        assert!(!config.display.change_colors);
        assert_eq!(config.analyser.smoothing, 0.5);
        assert_eq!(config.analyser.max_db, -30.0);
        assert_eq!(config.tonality.rule, "minor");
    }

    #[test]
    fn analyser_section_to_settings() {
        let config = parse_config(
            r#"
            [analyser]
            fft_size = 2048
            min_db = -90.0
            "#,
        )
        .unwrap();
        let settings = config.analyser.settings();
        assert_eq!(settings.fft_size, 2048);
        assert_eq!(settings.min_db, -90.0);
        assert_eq!(settings.max_db, -30.0);
        assert_eq!(settings.smoothing, 0.8);
    }

    #[test]
    fn malformed_toml_is_none() {
        assert!(parse_config("[display\nfps = ").is_none());
    }

    #[test]
    fn missing_file_is_none() {
        assert!(load_config(Path::new("/no/such/beatpulse.toml")).is_none());
    }

    #[test]
    fn validation() {
        let ok = AnalyserSettings::default();
        assert_eq!(validate(&ok, 60), Ok(()));

        let odd = AnalyserSettings { fft_size: 500, ..ok };
        assert_eq!(validate(&odd, 60), Err(ConfigError::InvalidFftSize(500)));

        let tiny = AnalyserSettings { fft_size: 16, ..ok };
        assert_eq!(validate(&tiny, 60), Err(ConfigError::InvalidFftSize(16)));

        let inverted = AnalyserSettings { min_db: -20.0, ..ok };
        assert!(matches!(
            validate(&inverted, 60),
            Err(ConfigError::InvertedDbRange { .. })
        ));

        let smooth = AnalyserSettings { smoothing: 1.0, ..ok };
        assert_eq!(validate(&smooth, 60), Err(ConfigError::InvalidSmoothing(1.0)));

        assert_eq!(validate(&ok, 0), Err(ConfigError::ZeroFps));
    }
}
