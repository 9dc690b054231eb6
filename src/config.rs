//! Player configuration, loadable from JSON.

use crate::midi::CHANNEL_COUNT;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Sample rate for audio synthesis (44.1 kHz standard).
pub const SAMPLE_RATE: u32 = 44100;

/// Frames per synthesis sub-block. Matches rustysynth's default block size.
pub const RENDER_BLOCK_FRAMES: usize = 64;

/// Frames requested from the device per callback.
pub const DEVICE_BUFFER_FRAMES: usize = 512;

/// Block sizes rustysynth accepts.
const RENDER_BLOCK_RANGE: std::ops::RangeInclusive<usize> = 8..=1024;

/// Errors from reading or validating a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// What `start` does when the output device cannot be opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceErrorPolicy {
    /// Roll back the session and report the error.
    #[default]
    Abort,
    /// Keep the session without audio output. Mutes and queries still work.
    Degrade,
}

/// Settings for a [`Player`](crate::Player).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Largest number of frames rendered between event drains.
    pub render_block_frames: usize,
    /// Frames per device callback.
    pub device_buffer_frames: usize,
    pub on_device_error: DeviceErrorPolicy,
    /// Default mute states, used when `start` is given none.
    pub initial_channels: Option<[bool; CHANNEL_COUNT]>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            render_block_frames: RENDER_BLOCK_FRAMES,
            device_buffer_frames: DEVICE_BUFFER_FRAMES,
            on_device_error: DeviceErrorPolicy::default(),
            initial_channels: None,
        }
    }
}

impl PlayerConfig {
    /// Parses and validates a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, parsed, or fails validation
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Serializes to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::Invalid("sample_rate must be positive".into()));
        }
        if !RENDER_BLOCK_RANGE.contains(&self.render_block_frames) {
            return Err(ConfigError::Invalid(format!(
                "render_block_frames must be in {}..={}, got {}",
                RENDER_BLOCK_RANGE.start(),
                RENDER_BLOCK_RANGE.end(),
                self.render_block_frames
            )));
        }
        if self.device_buffer_frames == 0 {
            return Err(ConfigError::Invalid(
                "device_buffer_frames must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PlayerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sample_rate, 44100);
        assert_eq!(config.on_device_error, DeviceErrorPolicy::Abort);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = PlayerConfig::from_json(r#"{ "on_device_error": "degrade" }"#).unwrap();
        assert_eq!(config.on_device_error, DeviceErrorPolicy::Degrade);
        assert_eq!(config.render_block_frames, RENDER_BLOCK_FRAMES);
        assert_eq!(config.initial_channels, None);
    }

    #[test]
    fn test_initial_channels_round_trip() {
        let mut config = PlayerConfig::default();
        let mut states = [true; CHANNEL_COUNT];
        states[9] = false;
        config.initial_channels = Some(states);
        let parsed = PlayerConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            PlayerConfig::from_json(r#"{ "render_block_frames": 4 }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            PlayerConfig::from_json(r#"{ "sample_rate": 0 }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            PlayerConfig::from_json(r#"{ "initial_channels": [true] }"#),
            Err(ConfigError::Parse(_))
        ));
    }
}
