use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::Local;
use log::{error, info};

use crate::{
    history::HistorySink,
    models::{HistoryRecord, Snapshot},
};

use super::SessionStore;

/// Request-facing orchestration on top of [`SessionStore`]: start/stop and
/// handing finished sessions to the history log.
#[derive(Clone)]
pub struct SessionService {
    store: SessionStore,
    history: Arc<dyn HistorySink>,
}

impl SessionService {
    pub fn new(store: SessionStore, history: Arc<dyn HistorySink>) -> Self {
        Self { store, history }
    }

    /// Returns true if this call started a new session.
    pub async fn handle_start(&self) -> bool {
        match self.store.start().await {
            Some(session_id) => {
                info!("Session {session_id} started");
                true
            }
            None => false,
        }
    }

    /// Ends the running session and appends it to the history log. Returns the
    /// record that was produced, or `None` if nothing was running. A failed
    /// append is logged and the record is dropped.
    pub async fn handle_stop(&self) -> Option<HistoryRecord> {
        let finalized = self.store.stop().await?;
        let session_id = finalized.session_id.clone();
        let record = HistoryRecord::from_finalized(Local::now(), finalized);

        info!(
            "Session {} stopped: uptime={:.2}s stops={} ratio={:.2}",
            session_id,
            record.uptime_seconds,
            record.stop_count,
            record.ratio
        );

        if let Err(err) = self.persist(record.clone()).await {
            error!("Failed to append session to history: {err:?}");
        }

        Some(record)
    }

    pub async fn handle_snapshot(&self) -> Snapshot {
        self.store.snapshot().await
    }

    async fn persist(&self, record: HistoryRecord) -> Result<()> {
        let history = Arc::clone(&self.history);
        tokio::task::spawn_blocking(move || history.append(&record))
            .await
            .map_err(|err| anyhow!("history writer task failed: {err}"))?
    }
}
