//! # Configuration Management
//!
//! This module handles loading and parsing configuration from the
//! terminator-config.toml file: map size and refresh rate, twilight shape,
//! marker style and colours, the landmark list, and animation mode.

use crate::mask::{DEFAULT_BLUR_RADIUS, DEFAULT_TWILIGHT_HALF_WIDTH};
use crate::pipeline::MAX_UPDATE_FPS;
use crate::{Result, TerminatorError};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default config file, looked up in the working directory.
pub const CONFIG_FILE: &str = "terminator-config.toml";

/// Application configuration loaded from terminator-config.toml
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Config {
    pub display: DisplayConfig,
    pub mask: MaskConfig,
    pub markers: MarkerConfig,
    pub animation: AnimationConfig,
    /// Named crosses drawn before the sun and moon markers
    pub landmarks: Vec<Landmark>,
}

/// Map raster and refresh settings
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct DisplayConfig {
    /// Map width in pixels (must match the day/night images)
    pub width: u32,
    /// Map height in pixels
    pub height: u32,
    /// Regenerations per second; also the minimum time step between frames
    pub update_fps: f64,
}

/// Twilight shape
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct MaskConfig {
    /// Ramp half-width in units of cos(zenith)
    pub twilight_half_width: f64,
    /// Gaussian blur sigma in pixels, 0 disables
    pub blur_radius: f64,
}

/// Marker style
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct MarkerConfig {
    pub arm_length: u32,
    pub line_width: u32,
    pub landmark_color: [u8; 3],
    pub subsolar_color: [u8; 3],
    pub sublunar_color: [u8; 3],
    pub show_subsolar: bool,
    pub show_sublunar: bool,
}

/// Time-lapse mode: each frame advances the clock by a fixed step
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct AnimationConfig {
    pub enabled: bool,
    /// Hours added per frame
    pub step_hours: f64,
    /// RFC 3339 start time; defaults to now
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Landmark {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

impl Landmark {
    fn new(name: &str, lat: f64, lon: f64) -> Self {
        Self {
            name: name.to_string(),
            lat,
            lon,
        }
    }
}

/// Cities shown on the HyperPixel map out of the box
pub fn default_landmarks() -> Vec<Landmark> {
    vec![
        Landmark::new("Null Island", 0.0, 0.0),
        Landmark::new("Portage", 42.2012, -85.5800),
        Landmark::new("Tokyo", 35.6895, 139.6917),
        Landmark::new("Stockholm", 59.3293, 18.0686),
        Landmark::new("Honolulu", 21.3069, -157.8583),
        Landmark::new("NYC", 40.7128, -74.0060),
        Landmark::new("LA", 34.0522, -118.2437),
        Landmark::new("Tierra del Fuego", -54.8019, -68.3029),
        Landmark::new("Sydney", -33.8688, 151.2093),
        Landmark::new("João Pessoa", -7.115, -34.86306),
        Landmark::new("Cape Town", -33.917419, 18.386274),
    ]
}

impl Default for Config {
    fn default() -> Self {
        Config {
            display: DisplayConfig {
                width: 400,  // HyperPixel 4.0 in portrait
                height: 800, // HyperPixel 4.0 in portrait
                update_fps: 10.0,
            },
            mask: MaskConfig {
                twilight_half_width: DEFAULT_TWILIGHT_HALF_WIDTH,
                blur_radius: DEFAULT_BLUR_RADIUS,
            },
            markers: MarkerConfig {
                arm_length: 6,
                line_width: 2,
                landmark_color: [255, 0, 0],
                subsolar_color: [255, 255, 0],
                sublunar_color: [0, 255, 255],
                show_subsolar: true,
                show_sublunar: true,
            },
            animation: AnimationConfig {
                enabled: false,
                step_hours: 24.0,
                start: None,
            },
            landmarks: default_landmarks(),
        }
    }
}

impl Config {
    /// Load configuration from terminator-config.toml
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load() -> Self {
        Self::load_from_path(CONFIG_FILE)
    }

    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(config) => match config.validate() {
                    Ok(()) => {
                        info!(
                            "Loaded configuration from {} ({} landmarks)",
                            path.display(),
                            config.landmarks.len()
                        );
                        config
                    }
                    Err(e) => {
                        warn!("Rejected config {}: {}", path.display(), e);
                        Self::default()
                    }
                },
                Err(e) => {
                    warn!("Invalid config file format in {}: {}", path.display(), e);
                    warn!("Using default configuration");
                    Self::default()
                }
            },
            Err(_) => {
                info!("No config file at {}, using default configuration", path.display());
                Self::default()
            }
        }
    }

    /// Save configuration as pretty TOML
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path.as_ref(), contents)?;
        info!("Configuration saved to {}", path.as_ref().display());
        Ok(())
    }

    /// Check ranges the generation pipeline relies on.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(TerminatorError::InvalidInput(msg));
        if self.display.width == 0 || self.display.height == 0 {
            return invalid(format!(
                "display size must be positive, got {}x{}",
                self.display.width, self.display.height
            ));
        }
        let fps = self.display.update_fps;
        if !(fps.is_finite() && fps > 0.0 && fps <= MAX_UPDATE_FPS) {
            return invalid(format!(
                "update_fps must be in (0, {}], got {}",
                MAX_UPDATE_FPS, fps
            ));
        }
        if !(self.mask.twilight_half_width.is_finite() && self.mask.twilight_half_width >= 0.0) {
            return invalid(format!(
                "twilight_half_width must be non-negative, got {}",
                self.mask.twilight_half_width
            ));
        }
        if !(self.mask.blur_radius.is_finite() && self.mask.blur_radius >= 0.0) {
            return invalid(format!(
                "blur_radius must be non-negative, got {}",
                self.mask.blur_radius
            ));
        }
        if self.animation.enabled
            && !(self.animation.step_hours.is_finite() && self.animation.step_hours != 0.0)
        {
            return invalid(format!(
                "animation step_hours must be non-zero, got {}",
                self.animation.step_hours
            ));
        }
        for landmark in &self.landmarks {
            if !(-90.0..=90.0).contains(&landmark.lat) || !(-180.0..=180.0).contains(&landmark.lon) {
                return invalid(format!(
                    "landmark '{}' at ({}, {}) is off the map",
                    landmark.name, landmark.lat, landmark.lon
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.display.width, 400);
        assert_eq!(config.display.height, 800);
        assert_eq!(config.display.update_fps, 10.0);
        assert_eq!(config.mask.blur_radius, 4.0);
        assert_eq!(config.markers.arm_length, 6);
        assert_eq!(config.landmarks.len(), 11);
        assert_eq!(config.landmarks[0].name, "Null Island");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let config = Config::load_from_path("/nonexistent/path");
        // Should fallback to default
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_custom_file() {
        let test_config = r#"
landmarks = [{ name = "Reykjavik", lat = 64.1466, lon = -21.9426 }]

[display]
width = 800
height = 400
update_fps = 2.0

[mask]
twilight_half_width = 0.05
blur_radius = 0.0

[markers]
arm_length = 4
line_width = 1
landmark_color = [255, 255, 255]
subsolar_color = [255, 200, 0]
sublunar_color = [180, 180, 255]
show_subsolar = true
show_sublunar = false

[animation]
enabled = true
step_hours = 1.5
start = "2024-03-20T00:00:00Z"
"#;
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), test_config).unwrap();

        let config = Config::load_from_path(file.path());
        assert_eq!(config.display.width, 800);
        assert_eq!(config.mask.twilight_half_width, 0.05);
        assert!(!config.markers.show_sublunar);
        assert_eq!(config.landmarks.len(), 1);
        assert_eq!(config.landmarks[0].name, "Reykjavik");
        assert_eq!(config.animation.start.as_deref(), Some("2024-03-20T00:00:00Z"));
    }

    #[test]
    fn test_invalid_file_falls_back() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "this is = = not toml").unwrap();
        assert_eq!(Config::load_from_path(file.path()), Config::default());
    }

    #[test]
    fn test_out_of_range_values_fall_back() {
        let mut config = Config::default();
        config.display.update_fps = 0.0;
        let file = NamedTempFile::new().unwrap();
        config.save_to_path(file.path()).unwrap();
        assert_eq!(Config::load_from_path(file.path()), Config::default());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.display.width = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.mask.blur_radius = -1.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.display.update_fps = 5000.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.landmarks.push(Landmark::new("Nowhere", 91.0, 0.0));
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.animation.enabled = true;
        config.animation.step_hours = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let mut config = Config::default();
        config.display.update_fps = 5.0;
        config.animation.start = Some("2025-01-01T00:00:00Z".to_string());
        let file = NamedTempFile::new().unwrap();
        config.save_to_path(file.path()).unwrap();
        assert_eq!(Config::load_from_path(file.path()), config);
    }
}
