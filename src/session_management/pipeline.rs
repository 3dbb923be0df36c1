use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use log::{info, warn};
use tokio::sync::watch;

use crate::api::types::SessionReport;
use crate::api::ApiClient;
use crate::channel::types::{DetectionFrame, FrameSink};
use crate::channel::TrackingChannel;
use crate::configuration::Config;
use crate::local_state::StateStore;
use crate::media_source::source::VideoTrack;
use crate::session_management::descriptor::SessionDescriptor;
use crate::session_management::timer::SessionTimer;
use crate::uplink::FrameUplink;

/// Wires one session's pipeline together: tracking channel, frame
/// uplink and countdown timer, torn down as a unit. When the countdown
/// reaches zero the pipeline terminates the session itself; no embedder
/// action is required.
///
/// A failed channel connect degrades the session instead of aborting
/// it: the timer still runs and the session still ends on schedule,
/// there is simply no live detection feed to draw.
pub struct TrackingPipeline {
    descriptor: SessionDescriptor,
    channel: Option<Arc<TrackingChannel>>,
    uplink: StdMutex<Option<FrameUplink>>,
    timer: SessionTimer,
    api: ApiClient,
    store: Arc<StateStore>,
    ended: AtomicBool,
    ended_tx: watch::Sender<bool>,
}

impl TrackingPipeline {
    pub async fn start(
        descriptor: SessionDescriptor,
        track: VideoTrack,
        config: &Config,
        api: ApiClient,
        store: Arc<StateStore>,
    ) -> Arc<Self> {
        let session_id = descriptor.session_id.to_string();

        let channel = match TrackingChannel::connect(
            &config.ws_url,
            &session_id,
            Duration::from_millis(config.connect_delay_ms),
            config.reconnect.clone(),
        )
        .await
        {
            Ok(channel) => Some(channel),
            Err(e) => {
                warn!(
                    "tracking channel unavailable, continuing without live tracking: {}",
                    e
                );
                None
            }
        };

        let uplink = channel.as_ref().map(|channel| {
            FrameUplink::start(
                track,
                Arc::clone(channel) as Arc<dyn FrameSink>,
                Duration::from_millis(config.frame_interval_ms),
                config.jpeg_quality,
            )
        });

        let (timer, mut expiry_rx) = SessionTimer::start(&descriptor);
        info!(
            "pipeline started for session {} ({}s remaining)",
            session_id,
            timer.remaining_secs()
        );

        let (ended_tx, _) = watch::channel(false);
        let pipeline = Arc::new(Self {
            descriptor,
            channel,
            uplink: StdMutex::new(uplink),
            timer,
            api,
            store,
            ended: AtomicBool::new(false),
            ended_tx,
        });

        // Expiry watcher: the countdown hitting zero ends the session
        // on its own. Cancelling the timer drops the expiry sender, so
        // a manual end makes this task exit without a second teardown.
        let watcher = Arc::clone(&pipeline);
        tokio::spawn(async move {
            if expiry_rx.recv().await.is_some() {
                info!(
                    "session {} clock hit zero, terminating",
                    watcher.descriptor.session_id
                );
                watcher.end_session().await;
            }
        });

        pipeline
    }

    pub fn descriptor(&self) -> &SessionDescriptor {
        &self.descriptor
    }

    pub fn remaining_secs(&self) -> u64 {
        self.timer.remaining_secs()
    }

    pub fn is_degraded(&self) -> bool {
        self.channel.is_none()
    }

    pub fn is_ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }

    /// Live detection feed, if the channel connected. Holds the latest
    /// value only; consumers that fall behind see the newest detection.
    pub fn detections(&self) -> Option<watch::Receiver<Option<DetectionFrame>>> {
        self.channel
            .as_ref()
            .map(|channel| channel.latest_detection())
    }

    /// Resolves once the session has been fully torn down, whether by
    /// expiry or by an explicit `end_session` call.
    pub async fn wait_until_ended(&self) {
        let mut rx = self.ended_tx.subscribe();
        let _ = rx.wait_for(|ended| *ended).await;
    }

    /// Tears the pipeline down and reports the end to the backend.
    /// Teardown order matters: the timer and uplink stop before the
    /// channel closes, so nothing races a closing connection. Calling
    /// this twice is harmless; the second call does nothing.
    ///
    /// A backend that cannot be reached does not block local teardown;
    /// the error is logged and the report comes back empty.
    pub async fn end_session(&self) -> Option<SessionReport> {
        if self.ended.swap(true, Ordering::SeqCst) {
            return None;
        }
        info!("ending session {}", self.descriptor.session_id);

        self.timer.cancel();

        let uplink = match self.uplink.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(mut uplink) = uplink {
            uplink.stop();
            info!(
                "uplink stopped after {} frames sent, {} skipped",
                uplink.frames_sent(),
                uplink.frames_skipped()
            );
        }

        if let Some(channel) = &self.channel {
            channel.close().await;
        }

        let report = match self.api.end_session(self.descriptor.session_id).await {
            Ok(response) => response.report,
            Err(e) => {
                warn!("could not report session end to backend: {}", e);
                None
            }
        };
        if let Some(report) = &report {
            info!("session report received with {} flag(s)", report.flags.len());
        }

        if let Err(e) = self.store.clear_session() {
            warn!("could not clear persisted session: {}", e);
        }

        self.ended_tx.send_replace(true);
        report
    }
}

impl Drop for TrackingPipeline {
    fn drop(&mut self) {
        // Async teardown may not have run; close what can be closed
        // synchronously. Timer and uplink abort via their own drops.
        if !self.ended.load(Ordering::SeqCst) {
            if let Some(channel) = &self.channel {
                channel.close_now();
            }
        }
    }
}
