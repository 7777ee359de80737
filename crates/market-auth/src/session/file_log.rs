//! Session log persisted to a JSON file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info};

use market_core::result::AppResult;

use super::log::{SessionLog, SessionLogRecord, token_reference};

/// Session log stored as a JSON array, rewritten on every change.
#[derive(Debug)]
pub struct FileSessionLog {
    path: PathBuf,
    records: Mutex<Vec<SessionLogRecord>>,
}

impl FileSessionLog {
    /// Opens the log at `path`, creating it on first write.
    pub async fn open(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref().to_path_buf();
        let records = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        info!(path = %path.display(), "Session log opened");
        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    async fn persist(&self, records: &[SessionLogRecord]) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(records)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), count = records.len(), "Session log written");
        Ok(())
    }
}

#[async_trait]
impl SessionLog for FileSessionLog {
    async fn record_login(
        &self,
        email: &str,
        token: &str,
        login_time: DateTime<Utc>,
    ) -> AppResult<SessionLogRecord> {
        let reference = token_reference(token);
        let mut records = self.records.lock().await;
        if let Some(existing) = records.iter().find(|r| r.token == reference) {
            return Ok(existing.clone());
        }

        let record = SessionLogRecord::open(email, token, login_time);
        let mut next = records.clone();
        next.push(record.clone());
        self.persist(&next).await?;
        *records = next;

        info!(email = %email, record_id = %record.id, "Session login recorded");
        Ok(record)
    }

    async fn record_logout(&self, token: &str, logout_time: DateTime<Utc>) -> AppResult<bool> {
        let reference = token_reference(token);
        let mut records = self.records.lock().await;
        let mut next = records.clone();
        let closed = next
            .iter_mut()
            .find(|r| r.token == reference)
            .map(|r| r.close(logout_time))
            .unwrap_or(false);

        if closed {
            self.persist(&next).await?;
            *records = next;
            info!("Session logout recorded");
        }
        Ok(closed)
    }

    async fn close_expired(&self, ttl: Duration, now: DateTime<Utc>) -> AppResult<usize> {
        let mut records = self.records.lock().await;
        let mut next = records.clone();
        let closed = next
            .iter_mut()
            .map(|r| r.close_if_lapsed(ttl, now))
            .filter(|closed| *closed)
            .count();

        if closed > 0 {
            self.persist(&next).await?;
            *records = next;
            info!(closed, "Expired session records closed");
        }
        Ok(closed)
    }

    async fn find_by_token(&self, token: &str) -> AppResult<Option<SessionLogRecord>> {
        let reference = token_reference(token);
        Ok(self
            .records
            .lock()
            .await
            .iter()
            .find(|r| r.token == reference)
            .cloned())
    }

    async fn active_for(&self, email: &str) -> AppResult<Vec<SessionLogRecord>> {
        Ok(self
            .records
            .lock()
            .await
            .iter()
            .filter(|r| r.is_active && r.email.eq_ignore_ascii_case(email))
            .cloned()
            .collect())
    }

    async fn all(&self) -> AppResult<Vec<SessionLogRecord>> {
        Ok(self.records.lock().await.clone())
    }
}
