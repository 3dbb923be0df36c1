use chrono::{DateTime, Utc};
use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Capability request passed to a media device.
///
/// Mirrors the shape of a browser `getUserMedia` constraints object,
/// reduced to what this client actually asks for.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct MediaConstraints {
    pub video: bool,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self { video: true }
    }
}

/// Native pixel dimensions of a video stream.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// A single decoded video frame at the stream's native resolution.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub image: RgbImage,
    pub resolution: Resolution,
    pub captured_at: DateTime<Utc>,
}

impl VideoFrame {
    pub fn new(image: RgbImage, captured_at: DateTime<Utc>) -> Self {
        let resolution = Resolution::new(image.width(), image.height());
        Self {
            image,
            resolution,
            captured_at,
        }
    }
}
