pub mod session;

pub use session::{round2, stop_ratio, FinalizedSession, HistoryRecord, Snapshot};
