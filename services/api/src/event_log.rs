//! services/api/src/event_log.rs
//!
//! Append-only on-disk event log. Each category (requests, errors, database
//! errors) gets its own file of tab-separated lines:
//!
//! `ddmmyyyy<TAB>HH:MM:SS<TAB><uid><TAB><message>`
//!
//! The directory is created on first write. Logging failures are reported via
//! `tracing` and otherwise swallowed; the event log must never take a request
//! down with it.

use std::path::PathBuf;

use chrono::Utc;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::warn;
use uuid::Uuid;

pub const REQUEST_LOG: &str = "reqLog.log";
pub const ERROR_LOG: &str = "errLog.log";
pub const DB_ERROR_LOG: &str = "dbErrLog.log";

#[derive(Clone, Debug)]
pub struct EventLog {
    dir: PathBuf,
}

impl EventLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Appends one line to the named log file, stamping it with the current
    /// date/time and a per-event uid.
    pub async fn append(&self, message: &str, file_name: &str) {
        let line = format!(
            "{}\t{}\t{}\n",
            Utc::now().format("%d%m%Y\t%H:%M:%S"),
            Uuid::new_v4(),
            message
        );
        if let Err(e) = self.write_line(&line, file_name).await {
            warn!("failed to append to {file_name}: {e}");
        }
    }

    async fn write_line(&self, line: &str, file_name: &str) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir).await?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(file_name))
            .await?;
        file.write_all(line.as_bytes()).await
    }
}
