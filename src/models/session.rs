use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Live view of the current (or last finished) session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub active: bool,
    pub uptime_seconds: f64,
    pub stop_count: u32,
    pub ratio: f64,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            active: false,
            uptime_seconds: 0.0,
            stop_count: 0,
            ratio: 0.0,
        }
    }
}

/// Figures frozen at the moment a session is stopped.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalizedSession {
    pub session_id: String,
    pub uptime_seconds: f64,
    pub stop_count: u32,
    pub ratio: f64,
}

/// One completed session as written to the history log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub timestamp: DateTime<Local>,
    pub uptime_seconds: f64,
    pub stop_count: u32,
    pub ratio: f64,
}

impl HistoryRecord {
    pub fn from_finalized(timestamp: DateTime<Local>, session: FinalizedSession) -> Self {
        Self {
            timestamp,
            uptime_seconds: session.uptime_seconds,
            stop_count: session.stop_count,
            ratio: session.ratio,
        }
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Uptime per stop; zero when the line never stopped.
pub fn stop_ratio(uptime_seconds: f64, stop_count: u32) -> f64 {
    if stop_count > 0 {
        round2(uptime_seconds / f64::from(stop_count))
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_is_zero_without_stops() {
        assert_eq!(stop_ratio(123.456, 0), 0.0);
    }

    #[test]
    fn ratio_rounds_to_two_decimals() {
        assert_eq!(stop_ratio(100.0, 3), 33.33);
        assert_eq!(stop_ratio(20.0, 1), 20.0);
    }

    #[test]
    fn snapshot_serializes_camel_case() {
        let json = serde_json::to_value(Snapshot {
            active: true,
            uptime_seconds: 12.5,
            stop_count: 2,
            ratio: 6.25,
        })
        .unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "active": true,
                "uptimeSeconds": 12.5,
                "stopCount": 2,
                "ratio": 6.25,
            })
        );
    }
}
