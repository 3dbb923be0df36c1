use crate::channel::types::FaceBox;

/// Logical size of the surface the gaze layer is drawn on.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// The gaze heat blob, in viewport pixel coordinates.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct GazeBlob {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

/// Computed visual state for one Detection Frame: what each of the two
/// canvases should show. Fully replaces the previous overlay on every
/// new detection.
#[derive(Debug, PartialEq, Clone, Copy, Default)]
pub struct OverlayFrame {
    /// Face box on the video-aligned layer, in native video pixels.
    pub face_layer: Option<FaceBox>,
    /// Heat blob on the full-viewport layer.
    pub gaze_layer: Option<GazeBlob>,
}

impl OverlayFrame {
    pub fn is_empty(&self) -> bool {
        self.face_layer.is_none() && self.gaze_layer.is_none()
    }
}
