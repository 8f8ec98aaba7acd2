use tokio::time::{Duration, Instant};

use crate::models::{round2, stop_ratio, FinalizedSession, Snapshot};

/// What a single sensor sample did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// No session running; the sample was ignored.
    Inactive,
    Asserted,
    /// Signal low but not (yet) long enough to count, or already counted.
    Deasserted,
    /// A stop was detected; carries the new stop count.
    StopCounted(u32),
}

#[derive(Debug, Clone)]
pub struct SessionState {
    pub active: bool,
    pub session_id: Option<String>,
    pub final_uptime_secs: f64,
    pub stop_count: u32,
    /// Last sample that saw the line running. Cleared once a stop is counted so
    /// a prolonged outage is only counted once.
    pub last_asserted_at: Option<Instant>,
    pub running_anchor: Option<Instant>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            active: false,
            session_id: None,
            final_uptime_secs: 0.0,
            stop_count: 0,
            last_asserted_at: None,
            running_anchor: None,
        }
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn uptime_secs(&self, now: Instant) -> f64 {
        match (self.active, self.running_anchor) {
            (true, Some(anchor)) => now.saturating_duration_since(anchor).as_secs_f64(),
            _ => self.final_uptime_secs,
        }
    }

    /// Returns false when a session is already running.
    pub fn begin_session(&mut self, session_id: String, now: Instant) -> bool {
        if self.active {
            return false;
        }

        *self = Self {
            active: true,
            session_id: Some(session_id),
            final_uptime_secs: 0.0,
            stop_count: 0,
            last_asserted_at: None,
            running_anchor: Some(now),
        };
        true
    }

    /// Freezes the uptime and ends the session. The frozen figures remain
    /// visible to snapshots until the next `begin_session`.
    pub fn finish(&mut self, now: Instant) -> Option<FinalizedSession> {
        if !self.active {
            return None;
        }

        let uptime = self.uptime_secs(now);
        self.final_uptime_secs = uptime;
        self.active = false;
        let session_id = self.session_id.take().unwrap_or_default();
        self.last_asserted_at = None;
        self.running_anchor = None;

        Some(FinalizedSession {
            session_id,
            uptime_seconds: round2(uptime),
            stop_count: self.stop_count,
            ratio: stop_ratio(uptime, self.stop_count),
        })
    }

    pub fn observe(&mut self, asserted: bool, now: Instant, debounce: Duration) -> Observation {
        if !self.active {
            return Observation::Inactive;
        }

        if asserted {
            self.last_asserted_at = Some(now);
            return Observation::Asserted;
        }

        match self.last_asserted_at {
            Some(last) if now.saturating_duration_since(last) >= debounce => {
                self.stop_count += 1;
                self.last_asserted_at = None;
                Observation::StopCounted(self.stop_count)
            }
            _ => Observation::Deasserted,
        }
    }

    pub fn snapshot(&self, now: Instant) -> Snapshot {
        let uptime = self.uptime_secs(now);
        Snapshot {
            active: self.active,
            uptime_seconds: round2(uptime),
            stop_count: self.stop_count,
            ratio: stop_ratio(uptime, self.stop_count),
        }
    }
}
