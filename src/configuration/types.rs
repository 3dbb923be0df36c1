use serde::{Deserialize, Serialize};

/// Reconnection policy for the tracking channel.
///
/// The reference behavior performs no reconnection on channel drop: a
/// session is bounded in time, so a dropped channel simply degrades the
/// session to "no live overlay". Deployments that want redial behavior
/// opt in here explicitly.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ReconnectPolicy {
    /// Whether to redial the channel after an abnormal close.
    pub enabled: bool,
    /// Maximum number of redial attempts per session.
    pub max_attempts: u32,
    /// Fixed delay between redial attempts, in milliseconds.
    pub delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            max_attempts: 3,
            delay_ms: 1000,
        }
    }
}
