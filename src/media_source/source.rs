use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};
use uuid::Uuid;

use super::types::{MediaConstraints, Resolution, VideoFrame};
use crate::error_handling::types::CaptureError;

/// Device boundary: anything that can open live video tracks.
///
/// Real camera backends implement this; the crate ships a synthetic
/// test-pattern device (see `media_source::synthetic`).
#[async_trait]
pub trait MediaDevice: Send + Sync {
    async fn open(&self, constraints: &MediaConstraints) -> Result<Vec<VideoTrack>, CaptureError>;
}

/// Frame supplier behind a single video track.
///
/// `resolution()` and `capture()` return `None` until the source has
/// produced its metadata, matching a video element before
/// `loadedmetadata`.
pub trait FrameSource: Send + Sync {
    fn resolution(&self) -> Option<Resolution>;
    fn capture(&self) -> Option<VideoFrame>;
    /// Called exactly once when the owning track is stopped.
    fn stop(&self) {}
}

/// A live video track. Cloning shares the underlying source and stop
/// state, so a track handed to the uplink and one kept by the owner
/// refer to the same hardware resource.
#[derive(Clone)]
pub struct VideoTrack {
    id: Uuid,
    source: Arc<dyn FrameSource>,
    stopped: Arc<AtomicBool>,
}

impl VideoTrack {
    pub fn new(source: Arc<dyn FrameSource>) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn resolution(&self) -> Option<Resolution> {
        if self.is_stopped() {
            return None;
        }
        self.source.resolution()
    }

    /// Current frame at native resolution, or `None` pre-metadata or
    /// after the track has been stopped.
    pub fn latest_frame(&self) -> Option<VideoFrame> {
        if self.is_stopped() {
            return None;
        }
        self.source.capture()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Stops the track. The underlying source is told to stop exactly
    /// once no matter how many clones call this; returns whether this
    /// call was the one that stopped it.
    pub fn stop(&self) -> bool {
        let first = !self.stopped.swap(true, Ordering::SeqCst);
        if first {
            debug!("stopping video track {}", self.id);
            self.source.stop();
        }
        first
    }
}

/// Handle to zero or more live video tracks, as returned by a device.
pub struct MediaStream {
    tracks: Vec<VideoTrack>,
}

impl MediaStream {
    pub fn new(tracks: Vec<VideoTrack>) -> Self {
        Self { tracks }
    }

    pub fn video_tracks(&self) -> &[VideoTrack] {
        &self.tracks
    }

    /// Stops every track. Safe to call more than once.
    pub fn stop_all(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }
}

/// Owns acquisition and release of the local camera stream.
///
/// Acquisition is idempotent: asking again while a stream is already
/// held (with unchanged constraints) returns the held stream instead of
/// re-opening the device. Release stops all tracks so the hardware
/// indicator is never leaked, including on error and teardown paths.
pub struct MediaSource {
    device: Arc<dyn MediaDevice>,
    constraints: MediaConstraints,
    stream: Option<MediaStream>,
}

impl MediaSource {
    pub fn new(device: Arc<dyn MediaDevice>, constraints: MediaConstraints) -> Self {
        Self {
            device,
            constraints,
            stream: None,
        }
    }

    pub async fn acquire(&mut self) -> Result<&MediaStream, CaptureError> {
        if self.stream.is_some() {
            debug!("media stream already held, skipping re-acquisition");
            return Ok(self.stream.as_ref().unwrap());
        }

        match self.device.open(&self.constraints).await {
            Ok(tracks) => {
                if self.constraints.video && tracks.is_empty() {
                    return Err(CaptureError::NoVideoTrack);
                }
                info!("acquired media stream with {} video track(s)", tracks.len());
                self.stream = Some(MediaStream::new(tracks));
                Ok(self.stream.as_ref().unwrap())
            }
            Err(e) => {
                warn!("media acquisition failed: {}", e);
                Err(e)
            }
        }
    }

    pub fn stream(&self) -> Option<&MediaStream> {
        self.stream.as_ref()
    }

    pub fn release(&mut self) {
        if let Some(stream) = self.stream.take() {
            stream.stop_all();
            info!("media stream released");
        }
    }
}

impl Drop for MediaSource {
    fn drop(&mut self) {
        self.release();
    }
}
