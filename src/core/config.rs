//=========================================================================
// View Configuration
//=========================================================================
//
// Session settings loaded from TOML.
//
// ```toml
// fps = 60.0
// use_multiview = false
//
// [eye_buffer]
// width = 1024
// height = 1024
//
// [splash]
// enabled = true
// display_time_secs = 5.0
// fade_time_secs = 0.9
// mode = "automatic"
// ```
//
// Every field is optional; missing fields take their defaults.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

//=== Internal Dependencies ===============================================

use crate::core::frame::SplashMode;

//=== ConfigError =========================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialization error: {0}")]
    Serialize(String),

    #[error("Invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

//=== EyeBufferParams =====================================================

/// Resolution of each eye's render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EyeBufferParams {
    pub width: u32,
    pub height: u32,
}

impl Default for EyeBufferParams {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 1024,
        }
    }
}

//=== SplashSettings ======================================================

/// Splash screen behavior.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplashSettings {
    /// Show a splash screen when the application provides one.
    pub enabled: bool,
    /// Seconds before an automatic close; zero closes as soon as
    /// initialization has finished.
    pub display_time_secs: f32,
    /// Length of the closing fade.
    pub fade_time_secs: f32,
    pub mode: SplashMode,
}

impl SplashSettings {
    /// Display time, or `None` when the splash closes right after init.
    /// Values too large for a `Duration` saturate.
    pub fn display_time(&self) -> Option<Duration> {
        (self.display_time_secs > 0.0).then(|| saturating_secs(self.display_time_secs))
    }

    /// Fade length; zero unless positive, saturating like `display_time`.
    pub fn fade_time(&self) -> Duration {
        if self.fade_time_secs > 0.0 {
            saturating_secs(self.fade_time_secs)
        } else {
            Duration::ZERO
        }
    }
}

impl Default for SplashSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            display_time_secs: 5.0,
            fade_time_secs: 0.9,
            mode: SplashMode::Automatic,
        }
    }
}

//=== ViewConfig ==========================================================

/// Settings for one rendering session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Target frames per second of the render loop.
    pub fps: f64,
    /// Draw both eyes in a single multiview pass.
    pub use_multiview: bool,
    pub eye_buffer: EyeBufferParams,
    pub splash: SplashSettings,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            fps: 60.0,
            use_multiview: false,
            eye_buffer: EyeBufferParams::default(),
            splash: SplashSettings::default(),
        }
    }
}

impl ViewConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Writes the configuration as TOML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Checks value ranges. Every accepted time converts to a `Duration`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fps.is_finite() && self.fps > 0.0) {
            return Err(invalid("fps", format!("must be positive, got {}", self.fps)));
        }
        if Duration::try_from_secs_f64(1.0 / self.fps).is_err() {
            return Err(invalid("fps", format!("frame duration out of range, got {}", self.fps)));
        }
        if self.eye_buffer.width == 0 || self.eye_buffer.height == 0 {
            return Err(invalid(
                "eye_buffer",
                format!("must be non-empty, got {}x{}", self.eye_buffer.width, self.eye_buffer.height),
            ));
        }
        check_secs("splash.display_time_secs", self.splash.display_time_secs)?;
        check_secs("splash.fade_time_secs", self.splash.fade_time_secs)?;
        Ok(())
    }
}

fn check_secs(field: &'static str, secs: f32) -> Result<(), ConfigError> {
    if Duration::try_from_secs_f32(secs).is_err() {
        return Err(invalid(field, format!("must be >= 0 and fit a duration, got {}", secs)));
    }
    Ok(())
}

fn saturating_secs(secs: f32) -> Duration {
    Duration::try_from_secs_f32(secs).unwrap_or(Duration::MAX)
}

fn invalid(field: &'static str, reason: String) -> ConfigError {
    ConfigError::Invalid { field, reason }
}

//=========================================================================
// Unit Tests
//=========================================================================
