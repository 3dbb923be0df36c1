use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body for `POST /session/start`.
#[derive(Debug, Serialize)]
pub struct StartSessionRequest {
    /// Requested session length in minutes.
    pub session_duration: u64,
}

/// Response from `POST /session/start`. Extra server fields are ignored.
#[derive(Debug, Deserialize)]
pub struct StartSessionResponse {
    pub session_id: Uuid,
    pub start_time: DateTime<Utc>,
    /// Total session length in minutes.
    pub session_duration: u64,
}

/// Summary the backend returns when a session ends. Carried opaquely so
/// the surface the backend adds to it keeps flowing through.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    #[serde(default)]
    pub flags: Vec<serde_json::Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct EndSessionResponse {
    #[serde(default)]
    pub report: Option<SessionReport>,
}

/// Response from `GET /me`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: Uuid,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// One entry of a user's session history.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionRecord {
    pub session_id: Uuid,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    /// Session length in minutes.
    pub session_duration: u64,
}

#[derive(Debug, Deserialize)]
pub struct UserSessionsResponse {
    #[serde(default)]
    pub sessions: Vec<SessionRecord>,
}
