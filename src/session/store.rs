use std::sync::Arc;

use tokio::{
    sync::Mutex,
    time::{Duration, Instant},
};
use uuid::Uuid;

use crate::models::{FinalizedSession, Snapshot};

use super::{Observation, SessionState};

/// Shared handle to the one session the process tracks.
///
/// Every read and every read-modify-write goes through the same mutex, so the
/// sampler and request handlers always see a complete update. Nothing here does
/// I/O while holding the lock.
#[derive(Clone, Default)]
pub struct SessionStore {
    state: Arc<Mutex<SessionState>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the new session id, or `None` if a session was already running.
    pub async fn start(&self) -> Option<String> {
        let session_id = Uuid::new_v4().to_string();
        let mut guard = self.state.lock().await;
        if guard.begin_session(session_id.clone(), Instant::now()) {
            Some(session_id)
        } else {
            None
        }
    }

    pub async fn stop(&self) -> Option<FinalizedSession> {
        self.state.lock().await.finish(Instant::now())
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.state.lock().await.snapshot(Instant::now())
    }

    pub async fn record_sample(&self, asserted: bool, debounce: Duration) -> Observation {
        self.state
            .lock()
            .await
            .observe(asserted, Instant::now(), debounce)
    }

    pub async fn session_id(&self) -> Option<String> {
        self.state.lock().await.session_id.clone()
    }
}
