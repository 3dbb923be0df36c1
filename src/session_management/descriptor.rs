use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::types::StartSessionResponse;

/// Identity and timing of one proctored session, as granted by the
/// backend. The remaining time is always derived from `start_time` plus
/// `session_duration` against the current clock, never from a local
/// countdown, so a client restarted mid-session lands on the right value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionDescriptor {
    pub session_id: Uuid,
    pub start_time: DateTime<Utc>,
    /// Total session length in minutes, the unit the backend grants in.
    pub session_duration: u64,
}

impl SessionDescriptor {
    pub fn duration_secs(&self) -> u64 {
        self.session_duration * 60
    }

    /// Seconds left at `now`, saturating at zero once the deadline has
    /// passed.
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> u64 {
        let elapsed = (now - self.start_time).num_seconds();
        if elapsed < 0 {
            // Clock skew put us before the recorded start; report the
            // full duration rather than something larger.
            return self.duration_secs();
        }
        self.duration_secs().saturating_sub(elapsed as u64)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.remaining_secs(now) == 0
    }
}

impl From<StartSessionResponse> for SessionDescriptor {
    fn from(response: StartSessionResponse) -> Self {
        Self {
            session_id: response.session_id,
            start_time: response.start_time,
            session_duration: response.session_duration,
        }
    }
}

/// Formats seconds as `MM:SS` for countdown display.
pub fn format_clock(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
