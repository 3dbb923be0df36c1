//! The persistent bidirectional tracking connection.
//!
//! One channel per session: frame envelopes go out, detection payloads
//! come in. Inbound payloads are funneled through a single dispatcher
//! that replaces one watched "latest detection" value (last write
//! wins); malformed payloads are logged and dropped without touching
//! the connection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use log::{debug, info, warn};
use tokio::net::TcpStream;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::types::{ChannelState, DetectionFrame, FrameEnvelope, FrameSink};
use crate::configuration::types::ReconnectPolicy;
use crate::error_handling::types::ChannelError;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsRead = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

pub struct TrackingChannel {
    session_id: String,
    state: Arc<StdMutex<ChannelState>>,
    sink: Arc<Mutex<Option<WsSink>>>,
    closing: Arc<AtomicBool>,
    latest_tx: Arc<watch::Sender<Option<DetectionFrame>>>,
    latest_rx: watch::Receiver<Option<DetectionFrame>>,
    reader: StdMutex<Option<JoinHandle<()>>>,
}

impl TrackingChannel {
    /// Opens the session-scoped tracking connection.
    ///
    /// Waits `connect_delay` before dialing so channel setup does not
    /// race the surrounding component's own initialization.
    pub async fn connect(
        ws_base: &str,
        session_id: &str,
        connect_delay: Duration,
        reconnect: ReconnectPolicy,
    ) -> Result<Arc<Self>, ChannelError> {
        tokio::time::sleep(connect_delay).await;

        let url = format!(
            "{}/ws/session/{}/track",
            ws_base.trim_end_matches('/'),
            session_id
        );
        let (ws, _) = connect_async(url.as_str())
            .await
            .map_err(|e| ChannelError::ConnectFailed(e.to_string()))?;
        info!("tracking channel connected for session {}", session_id);

        let (sink_half, read_half) = ws.split();
        let (latest_tx, latest_rx) = watch::channel(None);

        let channel = Arc::new(Self {
            session_id: session_id.to_string(),
            state: Arc::new(StdMutex::new(ChannelState::Open)),
            sink: Arc::new(Mutex::new(Some(sink_half))),
            closing: Arc::new(AtomicBool::new(false)),
            latest_tx: Arc::new(latest_tx),
            latest_rx,
            reader: StdMutex::new(None),
        });

        let reader = tokio::spawn(Self::read_loop(
            read_half,
            url,
            Arc::clone(&channel.state),
            Arc::clone(&channel.sink),
            Arc::clone(&channel.closing),
            Arc::clone(&channel.latest_tx),
            reconnect,
        ));
        *channel.reader.lock().unwrap() = Some(reader);

        Ok(channel)
    }

    /// Single inbound dispatcher: every message ends up as at most one
    /// update of the watched latest-detection value.
    async fn read_loop(
        mut read: WsRead,
        url: String,
        state: Arc<StdMutex<ChannelState>>,
        sink: Arc<Mutex<Option<WsSink>>>,
        closing: Arc<AtomicBool>,
        latest_tx: Arc<watch::Sender<Option<DetectionFrame>>>,
        reconnect: ReconnectPolicy,
    ) {
        let mut attempts_left = if reconnect.enabled {
            reconnect.max_attempts
        } else {
            0
        };

        loop {
            while let Some(msg) = read.next().await {
                if closing.load(Ordering::SeqCst) {
                    return;
                }
                match msg {
                    Ok(Message::Text(text)) => match DetectionFrame::from_json(text.as_str()) {
                        Ok(frame) => {
                            let _ = latest_tx.send(Some(frame));
                        }
                        Err(e) => {
                            warn!("dropping malformed tracking payload: {}", e);
                        }
                    },
                    Ok(Message::Close(_)) => {
                        info!("tracking channel closed by server");
                        *state.lock().unwrap() = ChannelState::Closed;
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("tracking channel error: {}", e);
                        *state.lock().unwrap() = ChannelState::Error;
                        break;
                    }
                }
            }

            if closing.load(Ordering::SeqCst) {
                return;
            }
            if *state.lock().unwrap() == ChannelState::Open {
                // stream ended without a close frame
                *state.lock().unwrap() = ChannelState::Error;
            }

            // redial only when explicitly configured
            loop {
                if attempts_left == 0 {
                    return;
                }
                attempts_left -= 1;
                tokio::time::sleep(Duration::from_millis(reconnect.delay_ms)).await;
                if closing.load(Ordering::SeqCst) {
                    return;
                }
                match connect_async(url.as_str()).await {
                    Ok((ws, _)) => {
                        info!("tracking channel reconnected");
                        let (new_sink, new_read) = ws.split();
                        *sink.lock().await = Some(new_sink);
                        *state.lock().unwrap() = ChannelState::Open;
                        read = new_read;
                        break;
                    }
                    Err(e) => {
                        warn!("tracking channel reconnect failed: {}", e);
                    }
                }
            }
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Receiver over the latest Detection Frame. `None` before the
    /// first detection and again after the channel is closed.
    pub fn latest_detection(&self) -> watch::Receiver<Option<DetectionFrame>> {
        self.latest_rx.clone()
    }

    /// Graceful close: sends a close frame, clears the latest
    /// detection, and stops the dispatcher. Idempotent.
    pub async fn close(&self) {
        if self.closing.swap(true, Ordering::SeqCst) {
            return;
        }
        *self.state.lock().unwrap() = ChannelState::Closed;
        if let Some(mut sink) = self.sink.lock().await.take() {
            let _ = sink.send(Message::Close(None)).await;
            let _ = sink.close().await;
        }
        let _ = self.latest_tx.send(None);
        if let Some(handle) = self.reader.lock().unwrap().take() {
            handle.abort();
        }
        info!("tracking channel for session {} closed", self.session_id);
    }

    /// Synchronous close for teardown paths that cannot await. Skips
    /// the close frame but still stops the dispatcher and clears the
    /// latest detection. Idempotent, also with respect to `close`.
    pub fn close_now(&self) {
        if self.closing.swap(true, Ordering::SeqCst) {
            return;
        }
        *self.state.lock().unwrap() = ChannelState::Closed;
        let _ = self.latest_tx.send(None);
        if let Some(handle) = self.reader.lock().unwrap().take() {
            handle.abort();
        }
        debug!("tracking channel for session {} torn down", self.session_id);
    }
}

#[async_trait]
impl FrameSink for TrackingChannel {
    fn state(&self) -> ChannelState {
        *self.state.lock().unwrap()
    }

    async fn send_frame(&self, envelope: &FrameEnvelope) -> Result<bool, ChannelError> {
        if self.state() != ChannelState::Open {
            return Ok(false);
        }
        let payload =
            serde_json::to_string(envelope).map_err(|e| ChannelError::SendFailed(e.to_string()))?;

        let mut guard = self.sink.lock().await;
        let Some(sink) = guard.as_mut() else {
            return Ok(false);
        };
        match sink.send(Message::Text(payload.into())).await {
            Ok(()) => Ok(true),
            Err(e) => {
                warn!("frame send failed: {}", e);
                *self.state.lock().unwrap() = ChannelState::Error;
                Err(ChannelError::SendFailed(e.to_string()))
            }
        }
    }
}
