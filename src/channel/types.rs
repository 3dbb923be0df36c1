use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error_handling::types::ChannelError;

/// Connection state of the tracking channel.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ChannelState {
    Open,
    Closed,
    Error,
}

/// Face bounding box in the video's native pixel coordinates.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub struct FaceBox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

/// Normalized gaze coordinates as estimated by the backend.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub struct GazePoint {
    pub horizontal: f64,
    pub vertical: f64,
}

/// The backend's latest face/gaze inference result.
///
/// One instance fully replaces the previous on each inbound message;
/// no history is retained.
#[derive(Debug, PartialEq, Clone, Copy, Default)]
pub struct DetectionFrame {
    pub face: Option<FaceBox>,
    pub gaze: Option<GazePoint>,
}

/// Inbound wire shape. Backend-defined and versioned: unknown fields
/// are ignored, and gaze may arrive either nested or as top-level
/// horizontal/vertical fields depending on the backend revision.
#[derive(Debug, Deserialize)]
struct DetectionPayload {
    #[serde(default)]
    face: Option<FaceBox>,
    #[serde(default)]
    gaze: Option<GazePoint>,
    #[serde(default)]
    horizontal: Option<f64>,
    #[serde(default)]
    vertical: Option<f64>,
}

impl DetectionFrame {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let payload: DetectionPayload = serde_json::from_str(raw)?;
        let gaze = payload
            .gaze
            .or(match (payload.horizontal, payload.vertical) {
                (Some(horizontal), Some(vertical)) => Some(GazePoint {
                    horizontal,
                    vertical,
                }),
                _ => None,
            });
        Ok(Self {
            face: payload.face,
            gaze,
        })
    }
}

/// Outbound frame envelope sent over the tracking channel.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct FrameEnvelope {
    /// Base64 data URL of the JPEG-encoded frame.
    pub image: String,
    /// Capture time in epoch milliseconds.
    pub timestamp: i64,
}

/// Send side of the tracking channel as seen by the frame uplink.
///
/// Injected as a trait object so the uplink can be exercised without a
/// live connection.
#[async_trait]
pub trait FrameSink: Send + Sync {
    fn state(&self) -> ChannelState;

    /// Sends one envelope. `Ok(false)` means the send was skipped
    /// because the sink is not open; skipped frames are never retried
    /// or buffered.
    async fn send_frame(&self, envelope: &FrameEnvelope) -> Result<bool, ChannelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_gaze_payload() {
        let raw = r#"{"face": {"x": 10, "y": 20, "w": 100, "h": 120},
                      "gaze": {"horizontal": 0.4, "vertical": 0.6, "eyes": {"left": {}}}}"#;
        let frame = DetectionFrame::from_json(raw).unwrap();
        assert_eq!(
            frame.face,
            Some(FaceBox {
                x: 10.0,
                y: 20.0,
                w: 100.0,
                h: 120.0
            })
        );
        assert_eq!(
            frame.gaze,
            Some(GazePoint {
                horizontal: 0.4,
                vertical: 0.6
            })
        );
    }

    #[test]
    fn test_parse_flat_gaze_payload() {
        let raw = r#"{"horizontal": 0.1, "vertical": 0.9}"#;
        let frame = DetectionFrame::from_json(raw).unwrap();
        assert!(frame.face.is_none());
        assert_eq!(
            frame.gaze,
            Some(GazePoint {
                horizontal: 0.1,
                vertical: 0.9
            })
        );
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let raw = r#"{"face": null, "confidence": 0.87, "model_version": "v2"}"#;
        let frame = DetectionFrame::from_json(raw).unwrap();
        assert_eq!(frame, DetectionFrame::default());
    }

    #[test]
    fn test_malformed_payload_is_an_error() {
        assert!(DetectionFrame::from_json("not json at all").is_err());
        assert!(DetectionFrame::from_json("[1, 2, 3]").is_err());
    }
}
