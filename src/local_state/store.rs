use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::api::types::UserIdentity;
use crate::error_handling::StateError;
use crate::session_management::SessionDescriptor;

/// Everything the client persists between runs: who is signed in and
/// which session, if any, is still in flight.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub user: Option<UserIdentity>,
    #[serde(default)]
    pub session: Option<SessionDescriptor>,
}

impl PersistedState {
    /// A persisted session still worth rejoining at `now`: present and
    /// not yet expired. A client restarted mid-session picks its
    /// countdown back up from here instead of starting a new session.
    pub fn resumable_session(&self, now: DateTime<Utc>) -> Option<SessionDescriptor> {
        self.session.filter(|session| !session.is_expired(now))
    }
}

/// JSON-file backed state store. Every mutation rewrites the file, so
/// the on-disk copy is always a complete snapshot. A corrupt or missing
/// file degrades to the empty state instead of failing startup.
pub struct StateStore {
    path: PathBuf,
    state: Mutex<PersistedState>,
}

impl StateStore {
    pub fn load(path: &Path) -> Self {
        let state = match fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(state) => state,
                Err(e) => {
                    warn!(
                        "state file {} is corrupt, starting fresh: {}",
                        path.display(),
                        e
                    );
                    PersistedState::default()
                }
            },
            Err(_) => PersistedState::default(),
        };

        Self {
            path: path.to_path_buf(),
            state: Mutex::new(state),
        }
    }

    pub fn current(&self) -> PersistedState {
        match self.state.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn save_user(&self, user: UserIdentity) -> Result<(), StateError> {
        self.mutate(|state| state.user = Some(user))
    }

    pub fn save_session(&self, session: SessionDescriptor) -> Result<(), StateError> {
        self.mutate(|state| state.session = Some(session))
    }

    pub fn clear_session(&self) -> Result<(), StateError> {
        self.mutate(|state| state.session = None)
    }

    pub fn clear_all(&self) -> Result<(), StateError> {
        self.mutate(|state| *state = PersistedState::default())
    }

    fn mutate(&self, apply: impl FnOnce(&mut PersistedState)) -> Result<(), StateError> {
        let snapshot = {
            let mut guard = match self.state.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            apply(&mut guard);
            guard.clone()
        };
        self.persist(&snapshot)
    }

    fn persist(&self, state: &PersistedState) -> Result<(), StateError> {
        let raw = serde_json::to_string_pretty(state)
            .map_err(|e| StateError::WriteFailed(e.to_string()))?;
        fs::write(&self.path, raw).map_err(|e| StateError::WriteFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::tempdir;
    use uuid::Uuid;

    fn sample_session() -> SessionDescriptor {
        SessionDescriptor {
            session_id: Uuid::new_v4(),
            start_time: Utc::now(),
            session_duration: 10,
        }
    }

    #[test]
    fn missing_file_loads_empty_state() {
        let dir = tempdir().unwrap();
        let store = StateStore::load(&dir.path().join("state.json"));
        let state = store.current();
        assert!(state.user.is_none());
        assert!(state.session.is_none());
    }

    #[test]
    fn corrupt_file_degrades_to_empty_state() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{not json").unwrap();

        let store = StateStore::load(&path);
        assert!(store.current().session.is_none());
    }

    #[test]
    fn saved_session_survives_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        let session = sample_session();

        let store = StateStore::load(&path);
        store.save_session(session).unwrap();
        drop(store);

        let reloaded = StateStore::load(&path);
        assert_eq!(reloaded.current().session, Some(session));
    }

    #[test]
    fn clear_session_keeps_the_user() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        let store = StateStore::load(&path);

        store
            .save_user(UserIdentity {
                id: Uuid::new_v4(),
                username: "candidate".to_string(),
                email: None,
            })
            .unwrap();
        store.save_session(sample_session()).unwrap();
        store.clear_session().unwrap();

        let state = store.current();
        assert!(state.user.is_some());
        assert!(state.session.is_none());
    }

    #[test]
    fn in_flight_session_is_resumable_after_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        let session = SessionDescriptor {
            session_id: Uuid::new_v4(),
            start_time: Utc::now() - chrono::Duration::minutes(5),
            session_duration: 10,
        };

        let store = StateStore::load(&path);
        store.save_session(session).unwrap();
        drop(store);

        let reloaded = StateStore::load(&path);
        let now = Utc::now();
        let resumed = reloaded.current().resumable_session(now).unwrap();
        assert_eq!(resumed.session_id, session.session_id);
        // The restarted client lands on the true remaining time.
        let remaining = resumed.remaining_secs(now);
        assert!((299..=300).contains(&remaining));
    }

    #[test]
    fn expired_session_is_not_resumable() {
        let expired = SessionDescriptor {
            session_id: Uuid::new_v4(),
            start_time: Utc::now() - chrono::Duration::minutes(30),
            session_duration: 10,
        };
        let state = PersistedState {
            user: None,
            session: Some(expired),
        };
        assert!(state.resumable_session(Utc::now()).is_none());
    }

    #[test]
    fn clear_all_wipes_everything() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        let store = StateStore::load(&path);

        store.save_session(sample_session()).unwrap();
        store.clear_all().unwrap();

        let reloaded = StateStore::load(&path);
        let state = reloaded.current();
        assert!(state.user.is_none());
        assert!(state.session.is_none());
    }
}
