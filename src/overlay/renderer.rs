use image::{Rgba, RgbaImage};
use log::debug;

use crate::channel::types::{DetectionFrame, FaceBox, GazePoint};
use crate::media_source::types::Resolution;
use crate::overlay::types::{GazeBlob, OverlayFrame, Viewport};

const FACE_STROKE_PX: u32 = 3;
// limegreen
const FACE_STROKE_COLOR: Rgba<u8> = Rgba([50, 205, 50, 255]);
// rgba(0, 150, 255) at full blob-center opacity
const GAZE_COLOR: [u8; 3] = [0, 150, 255];
const GAZE_CENTER_ALPHA: f64 = 128.0;

/// Turns Detection Frames into drawable overlay state. The face layer is
/// expressed in the video's native pixel space and the gaze layer in
/// viewport space, so the two never need a shared coordinate system.
#[derive(Debug, Clone)]
pub struct OverlayRenderer {
    viewport: Viewport,
    native_resolution: Resolution,
    sensitivity: f64,
    blob_radius: f64,
}

impl OverlayRenderer {
    pub fn new(
        viewport: Viewport,
        native_resolution: Resolution,
        sensitivity: f64,
        blob_radius: f64,
    ) -> Self {
        Self {
            viewport,
            native_resolution,
            sensitivity,
            blob_radius,
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn native_resolution(&self) -> Resolution {
        self.native_resolution
    }

    /// Computes the overlay for one detection. Pure: no drawing happens
    /// here, only geometry.
    pub fn render(&self, detection: &DetectionFrame) -> OverlayFrame {
        OverlayFrame {
            face_layer: detection.face,
            gaze_layer: detection.gaze.and_then(|g| self.map_gaze(&g)),
        }
    }

    /// Maps normalized gaze coordinates to a viewport point. Horizontal
    /// displacement is amplified around the center by the sensitivity
    /// factor; vertical maps linearly. Both axes clamp to the viewport,
    /// and non-finite inputs produce no blob.
    fn map_gaze(&self, gaze: &GazePoint) -> Option<GazeBlob> {
        if !gaze.horizontal.is_finite() || !gaze.vertical.is_finite() {
            debug!("discarding gaze sample with non-finite coordinates");
            return None;
        }

        let w = f64::from(self.viewport.width);
        let h = f64::from(self.viewport.height);

        let x = (w / 2.0 + (gaze.horizontal - 0.5) * self.sensitivity * w).clamp(0.0, w);
        let y = (gaze.vertical * h).clamp(0.0, h);

        Some(GazeBlob {
            x,
            y,
            radius: self.blob_radius,
        })
    }

    /// Rasterizes the face layer onto a transparent image at the video's
    /// native resolution.
    pub fn rasterize_face_layer(&self, overlay: &OverlayFrame) -> RgbaImage {
        let mut canvas = RgbaImage::new(
            self.native_resolution.width,
            self.native_resolution.height,
        );

        if let Some(face) = overlay.face_layer {
            self.stroke_rect(&mut canvas, &face);
        }

        canvas
    }

    /// Rasterizes the gaze layer onto a transparent viewport-sized image.
    /// The blob is a radial gradient fading linearly from the center
    /// alpha to fully transparent at the radius.
    pub fn rasterize_gaze_layer(&self, overlay: &OverlayFrame) -> RgbaImage {
        let mut canvas = RgbaImage::new(self.viewport.width, self.viewport.height);

        let blob = match overlay.gaze_layer {
            Some(blob) => blob,
            None => return canvas,
        };

        if blob.radius <= 0.0 {
            return canvas;
        }

        // Only touch the bounding box around the blob.
        let x_min = (blob.x - blob.radius).floor().max(0.0) as u32;
        let y_min = (blob.y - blob.radius).floor().max(0.0) as u32;
        let x_max = ((blob.x + blob.radius).ceil() as u32).min(canvas.width().saturating_sub(1));
        let y_max = ((blob.y + blob.radius).ceil() as u32).min(canvas.height().saturating_sub(1));

        for py in y_min..=y_max {
            for px in x_min..=x_max {
                let dx = f64::from(px) + 0.5 - blob.x;
                let dy = f64::from(py) + 0.5 - blob.y;
                let dist = (dx * dx + dy * dy).sqrt();
                if dist >= blob.radius {
                    continue;
                }
                let alpha = (GAZE_CENTER_ALPHA * (1.0 - dist / blob.radius)).round() as u8;
                if alpha == 0 {
                    continue;
                }
                canvas.put_pixel(
                    px,
                    py,
                    Rgba([GAZE_COLOR[0], GAZE_COLOR[1], GAZE_COLOR[2], alpha]),
                );
            }
        }

        canvas
    }

    fn stroke_rect(&self, canvas: &mut RgbaImage, face: &FaceBox) {
        let (cw, ch) = (canvas.width() as i64, canvas.height() as i64);
        let left = face.x.round() as i64;
        let top = face.y.round() as i64;
        let right = left + face.w.round().max(0.0) as i64;
        let bottom = top + face.h.round().max(0.0) as i64;
        let stroke = i64::from(FACE_STROKE_PX);

        // A box thinner than twice the stroke fills solid.
        for py in top.max(0)..bottom.min(ch) {
            for px in left.max(0)..right.min(cw) {
                let on_edge = px < left + stroke
                    || px >= right - stroke
                    || py < top + stroke
                    || py >= bottom - stroke;
                if on_edge {
                    canvas.put_pixel(px as u32, py as u32, FACE_STROKE_COLOR);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer() -> OverlayRenderer {
        OverlayRenderer::new(
            Viewport::new(1280, 720),
            Resolution {
                width: 640,
                height: 480,
            },
            5.0,
            50.0,
        )
    }

    #[test]
    fn centered_gaze_maps_to_viewport_center_x() {
        let detection = DetectionFrame {
            face: None,
            gaze: Some(GazePoint {
                horizontal: 0.5,
                vertical: 0.5,
            }),
        };

        let overlay = renderer().render(&detection);
        let blob = overlay.gaze_layer.unwrap();
        assert_eq!(blob.x, 640.0);
        assert_eq!(blob.y, 360.0);
        assert_eq!(blob.radius, 50.0);
    }

    #[test]
    fn horizontal_offset_is_amplified_by_sensitivity() {
        let detection = DetectionFrame {
            face: None,
            gaze: Some(GazePoint {
                horizontal: 0.6,
                vertical: 0.0,
            }),
        };

        let blob = renderer().render(&detection).gaze_layer.unwrap();
        // 1280/2 + 0.1 * 5.0 * 1280 = 640 + 640 = 1280 (right edge)
        assert!((blob.x - 1280.0).abs() < 1e-6);
        assert_eq!(blob.y, 0.0);
    }

    #[test]
    fn gaze_clamps_to_viewport_bounds() {
        let detection = DetectionFrame {
            face: None,
            gaze: Some(GazePoint {
                horizontal: -3.0,
                vertical: 7.0,
            }),
        };

        let blob = renderer().render(&detection).gaze_layer.unwrap();
        assert_eq!(blob.x, 0.0);
        assert_eq!(blob.y, 720.0);
    }

    #[test]
    fn non_finite_gaze_produces_no_blob() {
        for (h, v) in [
            (f64::NAN, 0.5),
            (0.5, f64::NAN),
            (f64::INFINITY, 0.5),
            (0.5, f64::NEG_INFINITY),
        ] {
            let detection = DetectionFrame {
                face: None,
                gaze: Some(GazePoint {
                    horizontal: h,
                    vertical: v,
                }),
            };
            assert!(renderer().render(&detection).gaze_layer.is_none());
        }
    }

    #[test]
    fn missing_detections_yield_empty_layers() {
        let overlay = renderer().render(&DetectionFrame::default());
        assert!(overlay.is_empty());
    }

    #[test]
    fn face_only_detection_keeps_gaze_layer_empty() {
        let detection = DetectionFrame {
            face: Some(FaceBox {
                x: 10.0,
                y: 20.0,
                w: 100.0,
                h: 80.0,
            }),
            gaze: None,
        };

        let overlay = renderer().render(&detection);
        assert!(overlay.face_layer.is_some());
        assert!(overlay.gaze_layer.is_none());
    }

    #[test]
    fn face_layer_raster_strokes_box_edges_only() {
        let r = renderer();
        let overlay = OverlayFrame {
            face_layer: Some(FaceBox {
                x: 100.0,
                y: 100.0,
                w: 200.0,
                h: 150.0,
            }),
            gaze_layer: None,
        };

        let canvas = r.rasterize_face_layer(&overlay);
        assert_eq!(canvas.width(), 640);
        assert_eq!(canvas.height(), 480);

        // On the top edge stroke.
        assert_eq!(canvas.get_pixel(150, 100).0[3], 255);
        // Interior stays transparent.
        assert_eq!(canvas.get_pixel(200, 175).0[3], 0);
        // Well outside the box.
        assert_eq!(canvas.get_pixel(10, 10).0[3], 0);
    }

    #[test]
    fn empty_face_layer_raster_is_fully_transparent() {
        let canvas = renderer().rasterize_face_layer(&OverlayFrame::default());
        assert!(canvas.pixels().all(|p| p.0[3] == 0));
    }

    #[test]
    fn gaze_blob_fades_from_center_to_edge() {
        let r = renderer();
        let overlay = OverlayFrame {
            face_layer: None,
            gaze_layer: Some(GazeBlob {
                x: 400.0,
                y: 300.0,
                radius: 50.0,
            }),
        };

        let canvas = r.rasterize_gaze_layer(&overlay);
        assert_eq!(canvas.width(), 1280);
        assert_eq!(canvas.height(), 720);

        let center = canvas.get_pixel(400, 300).0;
        assert_eq!(&center[..3], &[0, 150, 255]);
        assert!(center[3] >= 120);

        let mid = canvas.get_pixel(425, 300).0[3];
        assert!(mid > 0 && mid < center[3]);

        // Past the radius there is nothing.
        assert_eq!(canvas.get_pixel(460, 300).0[3], 0);
    }

    #[test]
    fn gaze_blob_at_viewport_corner_stays_in_bounds() {
        let r = renderer();
        let overlay = OverlayFrame {
            face_layer: None,
            gaze_layer: Some(GazeBlob {
                x: 0.0,
                y: 0.0,
                radius: 50.0,
            }),
        };

        let canvas = r.rasterize_gaze_layer(&overlay);
        assert!(canvas.get_pixel(0, 0).0[3] > 0);
    }
}
