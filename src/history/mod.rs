use std::{
    fs::{self, OpenOptions},
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Mutex,
};

use anyhow::{Context, Result};
use log::info;
use serde::Serialize;

use crate::models::HistoryRecord;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DELIMITER: u8 = b';';

/// Durable destination for finished sessions. Implementations block, so
/// callers run them off the async runtime.
pub trait HistorySink: Send + Sync + 'static {
    fn append(&self, record: &HistoryRecord) -> Result<()>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct HistoryRow {
    timestamp: String,
    uptime_seconds: f64,
    stop_count: u32,
    ratio: f64,
}

impl From<&HistoryRecord> for HistoryRow {
    fn from(record: &HistoryRecord) -> Self {
        Self {
            timestamp: record.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            uptime_seconds: record.uptime_seconds,
            stop_count: record.stop_count,
            ratio: record.ratio,
        }
    }
}

/// Append-only `;`-delimited history file. The header is written when the
/// file is created; rows are never rewritten.
pub struct CsvHistory {
    path: PathBuf,
    // Serializes appends so two writers can't both decide to emit the header.
    write_guard: Mutex<()>,
}

impl CsvHistory {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// Raw file contents, or `None` if no session has been recorded yet.
    pub fn contents(&self) -> Result<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err)
                .with_context(|| format!("failed to read history from {}", self.path.display())),
        }
    }
}

impl HistorySink for CsvHistory {
    fn append(&self, record: &HistoryRecord) -> Result<()> {
        let _guard = match self.write_guard.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create history directory {}", parent.display())
            })?;
        }

        let needs_header = match fs::metadata(&self.path) {
            Ok(meta) => meta.len() == 0,
            Err(err) if err.kind() == ErrorKind::NotFound => true,
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to stat history file {}", self.path.display())
                })
            }
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open history file {}", self.path.display()))?;

        let mut writer = csv::WriterBuilder::new()
            .delimiter(DELIMITER)
            .has_headers(needs_header)
            .from_writer(file);
        writer
            .serialize(HistoryRow::from(record))
            .context("failed to encode history row")?;
        writer.flush().context("failed to flush history file")?;

        if needs_header {
            info!("Created history log at {}", self.path.display());
        }
        Ok(())
    }
}
