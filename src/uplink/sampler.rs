//! Fixed-cadence frame sampling loop.
//!
//! Samples a video track every `interval`, encodes the frame, and
//! fires it at the channel. A sample is skipped silently when the
//! channel is not open or the track has no frame yet, and skipped
//! frames are never retried or buffered.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{trace, warn};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::encoder::encode_data_url;
use crate::channel::types::{ChannelState, FrameEnvelope, FrameSink};
use crate::media_source::source::VideoTrack;

pub struct FrameUplink {
    handle: Option<JoinHandle<()>>,
    frames_sent: Arc<AtomicU64>,
    frames_skipped: Arc<AtomicU64>,
}

impl FrameUplink {
    /// Starts the sampling task. The task runs until `stop` is called
    /// or the uplink is dropped.
    pub fn start(
        track: VideoTrack,
        sink: Arc<dyn FrameSink>,
        interval: Duration,
        jpeg_quality: u8,
    ) -> Self {
        let frames_sent = Arc::new(AtomicU64::new(0));
        let frames_skipped = Arc::new(AtomicU64::new(0));

        let sent = Arc::clone(&frames_sent);
        let skipped = Arc::clone(&frames_skipped);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // the first interval tick fires immediately; align to the
            // cadence instead
            ticker.tick().await;

            loop {
                ticker.tick().await;

                if sink.state() != ChannelState::Open {
                    trace!("skipping sample: channel not open");
                    skipped.fetch_add(1, Ordering::SeqCst);
                    continue;
                }
                let Some(frame) = track.latest_frame() else {
                    // pre-metadata or stopped track
                    trace!("skipping sample: no frame available");
                    skipped.fetch_add(1, Ordering::SeqCst);
                    continue;
                };

                let image = match encode_data_url(&frame, jpeg_quality) {
                    Ok(url) => url,
                    Err(e) => {
                        warn!("frame encode failed: {}", e);
                        skipped.fetch_add(1, Ordering::SeqCst);
                        continue;
                    }
                };
                let envelope = FrameEnvelope {
                    image,
                    timestamp: Utc::now().timestamp_millis(),
                };
                match sink.send_frame(&envelope).await {
                    Ok(true) => {
                        sent.fetch_add(1, Ordering::SeqCst);
                    }
                    Ok(false) => {
                        skipped.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(e) => {
                        warn!("frame send failed, dropping sample: {}", e);
                        skipped.fetch_add(1, Ordering::SeqCst);
                    }
                }
            }
        });

        Self {
            handle: Some(handle),
            frames_sent,
            frames_skipped,
        }
    }

    /// Cancels the sampling task. Deterministic and synchronous: no
    /// tick can run once this returns. Idempotent.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent.load(Ordering::SeqCst)
    }

    pub fn frames_skipped(&self) -> u64 {
        self.frames_skipped.load(Ordering::SeqCst)
    }
}

impl Drop for FrameUplink {
    fn drop(&mut self) {
        self.stop();
    }
}
