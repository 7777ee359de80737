//! Periodic closing of session log records whose credential has expired.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use market_core::result::AppResult;

use super::log::SessionLog;

/// Closes records for credentials that lapsed without an explicit logout.
#[derive(Clone)]
pub struct SessionLogSweeper {
    /// Log whose open records are swept.
    session_log: Arc<dyn SessionLog>,
    /// Lifetime of every issued credential.
    ttl: Duration,
}

impl std::fmt::Debug for SessionLogSweeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLogSweeper")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl SessionLogSweeper {
    /// Creates a sweeper for credentials issued with `ttl_seconds` of lifetime.
    pub fn new(session_log: Arc<dyn SessionLog>, ttl_seconds: u64) -> Self {
        let ttl = i64::try_from(ttl_seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX);
        Self { session_log, ttl }
    }

    /// Runs one cleanup cycle against the current time.
    ///
    /// Returns the number of records closed.
    pub async fn run_cleanup(&self) -> AppResult<usize> {
        self.run_cleanup_at(Utc::now()).await
    }

    /// Runs one cleanup cycle as of `now`.
    pub async fn run_cleanup_at(&self, now: DateTime<Utc>) -> AppResult<usize> {
        let closed = self.session_log.close_expired(self.ttl, now).await?;
        if closed > 0 {
            info!(closed, "Session log cleanup completed");
        }
        Ok(closed)
    }

    /// Runs a cleanup cycle every `every` until the returned task is aborted.
    pub fn spawn(self, every: StdDuration) -> JoinHandle<()> {
        let every = every.max(StdDuration::from_secs(1));
        info!(interval_secs = every.as_secs(), "Session log sweeper started");
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = self.run_cleanup().await {
                    error!(error = %e, "Session log cleanup failed");
                }
            }
        })
    }
}
