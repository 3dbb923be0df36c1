//! Synthetic media device.
//!
//! Produces a deterministic moving test pattern instead of real camera
//! frames, so the whole pipeline can run headless (CLI and tests). The
//! device can also be configured to fail acquisition, to exercise the
//! capture error paths without touching hardware.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use image::RgbImage;
use log::trace;

use super::source::{FrameSource, MediaDevice, VideoTrack};
use super::types::{MediaConstraints, Resolution, VideoFrame};
use crate::error_handling::types::CaptureError;

/// How the synthetic device behaves on `open`.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SyntheticBehavior {
    Healthy,
    PermissionDenied,
    NoDevice,
    DeviceBusy,
}

pub struct SyntheticDevice {
    behavior: SyntheticBehavior,
    resolution: Resolution,
    metadata_delay: Duration,
    open_count: AtomicU32,
    last_source: std::sync::Mutex<Option<Arc<SyntheticSource>>>,
}

impl SyntheticDevice {
    pub fn new(behavior: SyntheticBehavior, resolution: Resolution) -> Self {
        Self {
            behavior,
            resolution,
            metadata_delay: Duration::ZERO,
            open_count: AtomicU32::new(0),
            last_source: std::sync::Mutex::new(None),
        }
    }

    /// Delays metadata availability after open, imitating a camera that
    /// needs warm-up time before its native resolution is known.
    pub fn with_metadata_delay(mut self, delay: Duration) -> Self {
        self.metadata_delay = delay;
        self
    }

    pub fn open_count(&self) -> u32 {
        self.open_count.load(Ordering::SeqCst)
    }

    /// Stop calls received by the most recently opened source.
    pub fn stop_count(&self) -> u32 {
        self.last_source
            .lock()
            .unwrap()
            .as_ref()
            .map(|s| s.stop_count())
            .unwrap_or(0)
    }
}

#[async_trait]
impl MediaDevice for SyntheticDevice {
    async fn open(&self, constraints: &MediaConstraints) -> Result<Vec<VideoTrack>, CaptureError> {
        self.open_count.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            SyntheticBehavior::PermissionDenied => return Err(CaptureError::PermissionDenied),
            SyntheticBehavior::NoDevice => return Err(CaptureError::NoDevice),
            SyntheticBehavior::DeviceBusy => return Err(CaptureError::DeviceBusy),
            SyntheticBehavior::Healthy => {}
        }

        if !constraints.video {
            return Ok(Vec::new());
        }

        let source = Arc::new(SyntheticSource::with_metadata_delay(
            self.resolution,
            self.metadata_delay,
        ));
        *self.last_source.lock().unwrap() = Some(source.clone());
        Ok(vec![VideoTrack::new(source)])
    }
}

/// Deterministic test-pattern frame source.
pub struct SyntheticSource {
    resolution: Resolution,
    ready_at: Instant,
    frame_counter: AtomicU64,
    stop_calls: AtomicU32,
}

impl SyntheticSource {
    pub fn ready(resolution: Resolution) -> Self {
        Self::with_metadata_delay(resolution, Duration::ZERO)
    }

    pub fn with_metadata_delay(resolution: Resolution, delay: Duration) -> Self {
        Self {
            resolution,
            ready_at: Instant::now() + delay,
            frame_counter: AtomicU64::new(0),
            stop_calls: AtomicU32::new(0),
        }
    }

    pub fn stop_count(&self) -> u32 {
        self.stop_calls.load(Ordering::SeqCst)
    }

    fn is_ready(&self) -> bool {
        Instant::now() >= self.ready_at
    }
}

impl FrameSource for SyntheticSource {
    fn resolution(&self) -> Option<Resolution> {
        if self.is_ready() {
            Some(self.resolution)
        } else {
            None
        }
    }

    fn capture(&self) -> Option<VideoFrame> {
        if !self.is_ready() {
            return None;
        }
        let tick = self.frame_counter.fetch_add(1, Ordering::SeqCst);
        let shift = (tick % 256) as u32;
        let image = RgbImage::from_fn(self.resolution.width, self.resolution.height, |x, y| {
            // scrolling gradient so consecutive frames differ
            let r = ((x + shift) % 256) as u8;
            let g = ((y + shift) % 256) as u8;
            let b = ((x ^ y) % 256) as u8;
            image::Rgb([r, g, b])
        });
        trace!("synthetic frame {} generated", tick);
        Some(VideoFrame::new(image, Utc::now()))
    }

    fn stop(&self) {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
    }
}
