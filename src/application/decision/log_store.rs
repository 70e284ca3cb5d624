use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

use crate::domain::decision::DecisionLog;
use crate::domain::errors::AppError;

/// Append-only JSON-lines store for decision logs, one file per day. Writes
/// are serialized through a mutex so concurrent callers don't interleave
/// lines (the single-exclusive-mutator-per-log-file design note).
pub struct DecisionLogStore {
    directory: PathBuf,
    write_lock: Mutex<()>,
}

impl DecisionLogStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn file_path_for(&self, date: DateTime<Utc>) -> PathBuf {
        self.directory.join(format!("decisions_{}.jsonl", date.format("%Y%m%d")))
    }

    pub async fn append(&self, log: &DecisionLog) -> Result<(), AppError> {
        let _guard = self.write_lock.lock().await;
        fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| AppError::internal(format!("failed to create decision log directory: {e}")))?;

        let line = serde_json::to_string(log)
            .map_err(|e| AppError::internal(format!("failed to serialize decision log: {e}")))?;

        let path = self.file_path_for(log.created_at);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| AppError::internal(format!("failed to open decision log file {path:?}: {e}")))?;

        file.write_all(line.as_bytes())
            .await
            .map_err(|e| AppError::internal(format!("failed to write decision log: {e}")))?;
        file.write_all(b"\n")
            .await
            .map_err(|e| AppError::internal(format!("failed to write decision log: {e}")))?;
        Ok(())
    }

    /// Reads every decision log recorded on the given date; malformed lines
    /// are skipped with a warning rather than failing the whole read.
    pub async fn read_for_date(&self, date: DateTime<Utc>) -> Result<Vec<DecisionLog>, AppError> {
        let path = self.file_path_for(date);
        let contents = match fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AppError::internal(format!("failed to read decision log file {path:?}: {e}"))),
        };

        Ok(contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<DecisionLog>(line) {
                Ok(log) => Some(log),
                Err(e) => {
                    warn!(error = %e, "decision_log_store: skipping malformed line");
                    None
                }
            })
            .collect())
    }

    /// Finds and mutates the most recent matching log for (symbol, signal
    /// timestamp), rewriting the whole day's file. Outcome updates are rare
    /// relative to appends so a read-modify-rewrite is acceptable here.
    pub async fn record_outcome(
        &self,
        date: DateTime<Utc>,
        symbol: &str,
        signal_timestamp: DateTime<Utc>,
        pnl_btc: f64,
        pnl_pct: f64,
    ) -> Result<bool, AppError> {
        let _guard = self.write_lock.lock().await;
        let mut logs = self.read_for_date(date).await?;
        let mut found = false;
        for log in logs.iter_mut() {
            if log.symbol == symbol && log.signal_timestamp == signal_timestamp {
                log.record_outcome(pnl_btc, pnl_pct);
                found = true;
            }
        }
        if !found {
            return Ok(false);
        }

        let path = self.file_path_for(date);
        let serialized = logs
            .iter()
            .map(|l| serde_json::to_string(l).map_err(|e| AppError::internal(e.to_string())))
            .collect::<Result<Vec<_>, _>>()?
            .join("\n");
        fs::write(&path, serialized + "\n")
            .await
            .map_err(|e| AppError::internal(format!("failed to rewrite decision log file {path:?}: {e}")))?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::decision::{Recommendation, RiskLevel};

    fn sample_log() -> DecisionLog {
        DecisionLog::new("BTC", Utc::now(), Recommendation::Hold, RiskLevel::Medium, 0.6, vec!["test".into()])
    }

    #[tokio::test]
    async fn append_and_read_back_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = DecisionLogStore::new(dir.path());
        let log = sample_log();
        store.append(&log).await.unwrap();

        let read_back = store.read_for_date(log.created_at).await.unwrap();
        assert_eq!(read_back.len(), 1);
        assert_eq!(read_back[0].symbol, "BTC");
    }

    #[tokio::test]
    async fn record_outcome_updates_the_matching_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = DecisionLogStore::new(dir.path());
        let log = sample_log();
        store.append(&log).await.unwrap();

        let updated = store
            .record_outcome(log.created_at, "BTC", log.signal_timestamp, 0.02, 3.5)
            .await
            .unwrap();
        assert!(updated);

        let read_back = store.read_for_date(log.created_at).await.unwrap();
        assert_eq!(read_back[0].pnl_btc, Some(0.02));
    }

    #[tokio::test]
    async fn reading_a_missing_file_returns_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = DecisionLogStore::new(dir.path());
        let logs = store.read_for_date(Utc::now()).await.unwrap();
        assert!(logs.is_empty());
    }
}
