//! Durable audit trail of session starts and ends.
//!
//! The log never decides access; the authentication gate does. Records are
//! keyed by a SHA-256 reference of the credential so the log never holds a
//! usable token.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use uuid::Uuid;

use market_core::result::AppResult;

/// One issued credential's session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionLogRecord {
    /// Record ID.
    pub id: Uuid,
    /// Subject identifier.
    pub email: String,
    /// SHA-256 reference of the credential.
    pub token: String,
    /// When the credential was issued.
    pub login_time: DateTime<Utc>,
    /// When the session ended, if it has.
    pub logout_time: Option<DateTime<Utc>>,
    /// Whether the session is still open.
    pub is_active: bool,
}

impl SessionLogRecord {
    /// Opens a record for a credential.
    pub fn open(email: &str, token: &str, login_time: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.to_string(),
            token: token_reference(token),
            login_time,
            logout_time: None,
            is_active: true,
        }
    }

    /// Closes the record at `at`. Returns `false` if it was already closed.
    pub fn close(&mut self, at: DateTime<Utc>) -> bool {
        if !self.is_active {
            return false;
        }
        self.is_active = false;
        self.logout_time = Some(at);
        true
    }

    /// Closes an open record whose credential, valid for `ttl` from login,
    /// has run out by `now`. The record ends at the credential's expiry.
    pub fn close_if_lapsed(&mut self, ttl: Duration, now: DateTime<Utc>) -> bool {
        match self.login_time.checked_add_signed(ttl) {
            Some(expired_at) if expired_at <= now => self.close(expired_at),
            _ => false,
        }
    }
}

/// Hex SHA-256 of a credential, the key under which its record is stored.
pub fn token_reference(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

/// Append/update store of session records.
#[async_trait]
pub trait SessionLog: Send + Sync + std::fmt::Debug + 'static {
    /// Opens a record for a newly issued credential.
    ///
    /// Other active records for the same subject are left alone. Logging the
    /// same credential twice returns the existing record unchanged.
    async fn record_login(
        &self,
        email: &str,
        token: &str,
        login_time: DateTime<Utc>,
    ) -> AppResult<SessionLogRecord>;

    /// Closes the record for `token`.
    ///
    /// Returns `true` if a record was closed; an unknown or already closed
    /// credential is a no-op returning `false`.
    async fn record_logout(&self, token: &str, logout_time: DateTime<Utc>) -> AppResult<bool>;

    /// Closes every open record whose credential lifetime `ttl` has run out
    /// by `now`. Returns the number of records closed.
    async fn close_expired(&self, ttl: Duration, now: DateTime<Utc>) -> AppResult<usize>;

    /// The record for a credential.
    async fn find_by_token(&self, token: &str) -> AppResult<Option<SessionLogRecord>>;

    /// Open records for a subject, oldest first.
    async fn active_for(&self, email: &str) -> AppResult<Vec<SessionLogRecord>>;

    /// Every record, oldest first.
    async fn all(&self) -> AppResult<Vec<SessionLogRecord>>;
}

/// Session log held in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionLog {
    records: Arc<DashMap<String, SessionLogRecord>>,
}

impl MemorySessionLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionLog for MemorySessionLog {
    async fn record_login(
        &self,
        email: &str,
        token: &str,
        login_time: DateTime<Utc>,
    ) -> AppResult<SessionLogRecord> {
        let record = SessionLogRecord::open(email, token, login_time);
        match self.records.entry(record.token.clone()) {
            Entry::Occupied(existing) => {
                debug!(email = %email, "Credential already logged");
                Ok(existing.get().clone())
            }
            Entry::Vacant(slot) => {
                info!(email = %email, record_id = %record.id, "Session login recorded");
                slot.insert(record.clone());
                Ok(record)
            }
        }
    }

    async fn record_logout(&self, token: &str, logout_time: DateTime<Utc>) -> AppResult<bool> {
        let reference = token_reference(token);
        let closed = self
            .records
            .get_mut(&reference)
            .map(|mut record| record.close(logout_time))
            .unwrap_or(false);

        if closed {
            info!(token_ref = %&reference[..12], "Session logout recorded");
        } else {
            debug!(token_ref = %&reference[..12], "Logout ignored: unknown or closed session");
        }
        Ok(closed)
    }

    async fn close_expired(&self, ttl: Duration, now: DateTime<Utc>) -> AppResult<usize> {
        let mut closed = 0;
        for mut record in self.records.iter_mut() {
            if record.close_if_lapsed(ttl, now) {
                closed += 1;
            }
        }
        if closed > 0 {
            info!(closed, "Expired session records closed");
        }
        Ok(closed)
    }

    async fn find_by_token(&self, token: &str) -> AppResult<Option<SessionLogRecord>> {
        Ok(self
            .records
            .get(&token_reference(token))
            .map(|r| r.value().clone()))
    }

    async fn active_for(&self, email: &str) -> AppResult<Vec<SessionLogRecord>> {
        let mut records: Vec<SessionLogRecord> = self
            .records
            .iter()
            .filter(|r| r.is_active && r.email.eq_ignore_ascii_case(email))
            .map(|r| r.value().clone())
            .collect();
        records.sort_by_key(|r| r.login_time);
        Ok(records)
    }

    async fn all(&self) -> AppResult<Vec<SessionLogRecord>> {
        let mut records: Vec<SessionLogRecord> =
            self.records.iter().map(|r| r.value().clone()).collect();
        records.sort_by_key(|r| r.login_time);
        Ok(records)
    }
}
