use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::types::ReconnectPolicy;
use crate::error_handling::types::ConfigError;

/// Application configuration structure that defines all runtime parameters.
///
/// Loaded from a TOML file; every field has a default matching the
/// reference behavior, so a partial (or empty) file is valid.
///
/// # Fields Overview
///
/// The configuration contains the following attributes:
/// - `backend_url`: base URL of the REST backend (session start/end, identity)
/// - `ws_url`: base URL of the tracking WebSocket endpoint
/// - `frame_interval_ms`: sampling cadence of the frame uplink
/// - `connect_delay_ms`: deliberate delay before dialing the tracking channel
/// - `jpeg_quality`: JPEG quality for uplinked frames (1-100)
/// - `gaze_sensitivity`: horizontal amplification of gaze coordinates
/// - `gaze_blob_radius_px`: radius of the gaze heat blob
/// - `fallback_width` / `fallback_height`: raster size used before stream metadata is known
/// - `viewport_width` / `viewport_height`: logical viewport for the gaze overlay
/// - `state_path`: file holding the locally persisted user/session state
/// - `overlay_snapshot_dir`: when set, overlay layers are written there as PNGs
/// - `reconnect`: channel reconnection policy
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend_url: String,
    pub ws_url: String,
    pub frame_interval_ms: u64,
    pub connect_delay_ms: u64,
    pub jpeg_quality: u8,
    pub gaze_sensitivity: f64,
    pub gaze_blob_radius_px: u32,
    pub fallback_width: u32,
    pub fallback_height: u32,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub state_path: PathBuf,
    pub overlay_snapshot_dir: Option<PathBuf>,
    pub reconnect: ReconnectPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: "http://127.0.0.1:8000".to_string(),
            ws_url: "ws://127.0.0.1:8000".to_string(),
            frame_interval_ms: 100,
            connect_delay_ms: 300,
            jpeg_quality: 80,
            gaze_sensitivity: 5.0,
            gaze_blob_radius_px: 50,
            fallback_width: 640,
            fallback_height: 480,
            viewport_width: 1280,
            viewport_height: 720,
            state_path: PathBuf::from("invigil_state.json"),
            overlay_snapshot_dir: None,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl Config {
    /// Reads and validates a configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        let config: Config =
            toml::from_str(&raw).map_err(|e| ConfigError::TomlError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every parameter against its accepted range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.backend_url.starts_with("http://") && !self.backend_url.starts_with("https://") {
            return Err(ConfigError::BadUrl(format!(
                "backend_url must be http(s), got '{}'",
                self.backend_url
            )));
        }
        if !self.ws_url.starts_with("ws://") && !self.ws_url.starts_with("wss://") {
            return Err(ConfigError::BadUrl(format!(
                "ws_url must be ws(s), got '{}'",
                self.ws_url
            )));
        }
        if self.frame_interval_ms == 0 {
            return Err(ConfigError::NotInRange(
                "frame_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(ConfigError::NotInRange(format!(
                "jpeg_quality must be 1-100, got {}",
                self.jpeg_quality
            )));
        }
        if !self.gaze_sensitivity.is_finite() || self.gaze_sensitivity <= 0.0 {
            return Err(ConfigError::NotInRange(format!(
                "gaze_sensitivity must be positive, got {}",
                self.gaze_sensitivity
            )));
        }
        if self.gaze_blob_radius_px == 0 {
            return Err(ConfigError::NotInRange(
                "gaze_blob_radius_px must be greater than 0".to_string(),
            ));
        }
        if self.fallback_width == 0 || self.fallback_height == 0 {
            return Err(ConfigError::NotInRange(
                "fallback resolution must be non-zero".to_string(),
            ));
        }
        if self.viewport_width == 0 || self.viewport_height == 0 {
            return Err(ConfigError::NotInRange(
                "viewport must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.frame_interval_ms, 100);
        assert_eq!(config.connect_delay_ms, 300);
        assert_eq!(config.jpeg_quality, 80);
        assert!(!config.reconnect.enabled);
    }

    #[test]
    fn test_from_partial_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "backend_url = \"http://10.0.0.2:9000\"\nframe_interval_ms = 250\n\n[reconnect]\nenabled = true\nmax_attempts = 5\ndelay_ms = 2000"
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.backend_url, "http://10.0.0.2:9000");
        assert_eq!(config.frame_interval_ms, 250);
        // untouched fields keep their defaults
        assert_eq!(config.jpeg_quality, 80);
        assert!(config.reconnect.enabled);
        assert_eq!(config.reconnect.max_attempts, 5);
    }

    #[test]
    fn test_rejects_bad_quality() {
        let config = Config {
            jpeg_quality: 0,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NotInRange(_))
        ));
    }

    #[test]
    fn test_rejects_bad_urls() {
        let config = Config {
            ws_url: "http://not-a-ws".to_string(),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::BadUrl(_))));
    }
}
