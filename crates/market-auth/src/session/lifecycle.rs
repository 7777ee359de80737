//! Client-side session lifecycle: one credential, two timers, one teardown.
//!
//! `start_session` persists the credential and arms a recurring check plus a
//! one-shot hard-expiry timer. Either timer, or the user, may end the
//! session; only the first `end_session` tears anything down. Stored values
//! are the source of truth, so a session persisted by a previous process can
//! be picked up again with [`SessionLifecycle::resume`].

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde_json::Value;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use market_core::config::SessionConfig;
use market_core::error::SessionError;
use market_core::result::AppResult;
use market_core::traits::{Clock, SessionStorage, keys};

use super::listener::{EndReason, SessionListener};

/// Floor for the recurring check period.
const MIN_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Observable lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Nothing has been started.
    NoSession,
    /// A valid session outside the warning window.
    Active,
    /// A started session inside the warning window.
    Warning,
    /// The session was torn down.
    Ended,
}

/// Result of a session check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Valid, with more than the warning window left.
    Valid {
        /// Time until expiry.
        time_left: Duration,
    },
    /// Valid, but inside the warning window. A warning was emitted.
    Expiring {
        /// Time until expiry.
        time_left: Duration,
    },
    /// No usable session.
    Invalid,
}

impl SessionStatus {
    /// Whether the session may still be used.
    pub fn is_valid(&self) -> bool {
        !matches!(self, Self::Invalid)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    NoSession,
    Active,
    Ended,
}

#[derive(Debug)]
struct Timers {
    check: JoinHandle<()>,
    deadline: JoinHandle<()>,
}

impl Timers {
    fn cancel(self) {
        self.check.abort();
        self.deadline.abort();
    }
}

#[derive(Debug)]
struct Control {
    phase: Phase,
    /// Bumped on every arm; a timer acts only if its generation is current.
    generation: u64,
    timers: Option<Timers>,
}

enum Stored {
    Empty,
    Present { expires_at: i64 },
    Corrupt(SessionError),
}

struct Inner {
    clock: Arc<dyn Clock>,
    storage: Arc<dyn SessionStorage>,
    listener: Arc<dyn SessionListener>,
    check_interval: Duration,
    warning_window: Duration,
    control: Mutex<Control>,
}

/// Owns the client's notion of "currently authenticated".
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct SessionLifecycle {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for SessionLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLifecycle")
            .field("check_interval", &self.inner.check_interval)
            .field("warning_window", &self.inner.warning_window)
            .field("state", &self.state())
            .finish()
    }
}

impl SessionLifecycle {
    /// Creates a lifecycle manager over the given clock, storage, and listener.
    pub fn new(
        clock: Arc<dyn Clock>,
        storage: Arc<dyn SessionStorage>,
        listener: Arc<dyn SessionListener>,
        config: &SessionConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                clock,
                storage,
                listener,
                // A zero period would panic inside the timer task.
                check_interval: config.check_interval().max(MIN_CHECK_INTERVAL),
                warning_window: config.warning_window(),
                control: Mutex::new(Control {
                    phase: Phase::NoSession,
                    generation: 0,
                    timers: None,
                }),
            }),
        }
    }

    /// Starts tracking a freshly issued credential, replacing any prior session.
    ///
    /// Persists the token, the absolute expiry (`now + ttl_seconds`), and the
    /// subject data, then re-arms the recurring check and the hard-expiry
    /// timer in the same critical section. Timers need a tokio runtime; without
    /// one the session is only re-validated when checked.
    pub fn start_session(
        &self,
        token: &str,
        ttl_seconds: u64,
        subject_data: Value,
    ) -> AppResult<()> {
        let inner = &self.inner;
        let now = inner.clock.now_millis();
        let ttl_millis = i64::try_from(ttl_seconds)
            .unwrap_or(i64::MAX)
            .saturating_mul(1000);
        let expires_at = now.saturating_add(ttl_millis);

        let replaced = {
            let mut control = inner.lock();
            if let Some(timers) = control.timers.take() {
                timers.cancel();
            }

            let previous = if control.phase == Phase::Active {
                inner.stored_token().filter(|old| old != token)
            } else {
                None
            };

            control.generation += 1;
            let generation = control.generation;

            let written = inner.storage.set_many(&[
                (keys::TOKEN, token.to_string()),
                (keys::EXPIRATION_TIME, expires_at.to_string()),
                (keys::USER_DATA, subject_data.to_string()),
            ]);
            if let Err(e) = written {
                error!(error = %e, "Failed to persist session");
                if let Err(e) = inner.storage.remove_many(&keys::ALL) {
                    error!(error = %e, "Failed to clear partially written session");
                }
                control.phase = Phase::NoSession;
                return Err(e);
            }

            control.timers = arm(inner, generation, Duration::from_secs(ttl_seconds));
            control.phase = Phase::Active;
            previous
        };

        info!(ttl_seconds, expires_at, "Session started");

        if let Some(old) = replaced {
            inner.listener.session_ended(Some(&old), EndReason::Replaced);
        }
        Ok(())
    }

    /// Re-arms timers for a session left in storage by an earlier run.
    ///
    /// Expired or corrupt stored state is torn down; empty storage stays
    /// [`LifecycleState::NoSession`].
    pub fn resume(&self) -> LifecycleState {
        let inner = &self.inner;
        match inner.read_stored() {
            Stored::Empty => LifecycleState::NoSession,
            Stored::Corrupt(err) => {
                warn!(error = %err, "Stored session unusable");
                inner.terminate(EndReason::CorruptState, None);
                LifecycleState::Ended
            }
            Stored::Present { expires_at } => {
                let left_ms = expires_at - inner.clock.now_millis();
                if left_ms <= 0 {
                    debug!(error = %SessionError::ExpiredLocally, "Stored session lapsed");
                    inner.terminate(EndReason::Expired, None);
                    return LifecycleState::Ended;
                }

                {
                    let mut control = inner.lock();
                    if let Some(timers) = control.timers.take() {
                        timers.cancel();
                    }
                    control.generation += 1;
                    let generation = control.generation;
                    control.timers = arm(inner, generation, Duration::from_millis(left_ms as u64));
                    control.phase = Phase::Active;
                }

                info!(remaining_ms = left_ms, "Session resumed");
                self.state()
            }
        }
    }

    /// Re-validates the session against the clock.
    ///
    /// Lapsed or corrupt sessions are ended here and reported as
    /// [`SessionStatus::Invalid`]. Inside the warning window one warning is
    /// emitted per call. With no session, returns `Invalid` and does nothing.
    pub fn check_session(&self) -> SessionStatus {
        self.inner.check()
    }

    /// Ends the session as a user logout. Idempotent.
    pub fn end_session(&self) {
        self.inner.terminate(EndReason::Logout, None);
    }

    /// Ends the session for the given reason. Idempotent.
    pub fn end_session_with(&self, reason: EndReason) {
        self.inner.terminate(reason, None);
    }

    /// True iff a token is stored and a check reports it valid.
    pub fn is_authenticated(&self) -> bool {
        self.get_token().is_some() && self.check_session().is_valid()
    }

    /// The stored credential, if any.
    pub fn get_token(&self) -> Option<String> {
        self.inner.stored_token()
    }

    /// The subject data stored with the credential, if any.
    pub fn get_subject_data(&self) -> Option<Value> {
        self.get_token()?;
        let raw = match self.inner.storage.get(keys::USER_DATA) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(error = %e, "Failed to read subject data");
                return None;
            }
        };
        serde_json::from_str(&raw)
            .map_err(|e| warn!(error = %e, "Stored subject data is not JSON"))
            .ok()
    }

    /// The stored absolute expiry in epoch milliseconds, if parseable.
    pub fn expires_at(&self) -> Option<i64> {
        match self.inner.read_stored() {
            Stored::Present { expires_at } => Some(expires_at),
            _ => None,
        }
    }

    /// Current state. A pure read: a lapsed session still reports
    /// [`LifecycleState::Warning`] until a check or timer ends it.
    pub fn state(&self) -> LifecycleState {
        let phase = self.inner.lock().phase;
        match phase {
            Phase::NoSession => LifecycleState::NoSession,
            Phase::Ended => LifecycleState::Ended,
            Phase::Active => match self.inner.read_stored() {
                Stored::Present { expires_at } => {
                    let left_ms = expires_at - self.inner.clock.now_millis();
                    if left_ms > self.inner.warning_window.as_millis() as i64 {
                        LifecycleState::Active
                    } else {
                        LifecycleState::Warning
                    }
                }
                _ => LifecycleState::Ended,
            },
        }
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Control> {
        // The guarded data stays consistent across a panic in a listener-free
        // section, so a poisoned lock is still usable.
        self.control.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn stored_token(&self) -> Option<String> {
        self.storage
            .get(keys::TOKEN)
            .map_err(|e| warn!(error = %e, "Failed to read stored token"))
            .ok()
            .flatten()
    }

    fn read_stored(&self) -> Stored {
        let token = match self.storage.get(keys::TOKEN) {
            Ok(token) => token,
            Err(e) => return Stored::Corrupt(SessionError::CorruptLocalState(e.to_string())),
        };
        let expiry = match self.storage.get(keys::EXPIRATION_TIME) {
            Ok(expiry) => expiry,
            Err(e) => return Stored::Corrupt(SessionError::CorruptLocalState(e.to_string())),
        };

        match (token, expiry) {
            (None, None) => Stored::Empty,
            (Some(_), Some(raw)) => match raw.trim().parse::<i64>() {
                Ok(expires_at) => Stored::Present { expires_at },
                Err(_) => Stored::Corrupt(SessionError::CorruptLocalState(format!(
                    "unparsable expiry: {raw:?}"
                ))),
            },
            (Some(_), None) => Stored::Corrupt(SessionError::CorruptLocalState(
                "token without expiry".to_string(),
            )),
            (None, Some(_)) => Stored::Corrupt(SessionError::CorruptLocalState(
                "expiry without token".to_string(),
            )),
        }
    }

    fn check(&self) -> SessionStatus {
        match self.read_stored() {
            Stored::Empty => {
                if self.lock().phase == Phase::Active {
                    warn!("Session values disappeared from storage");
                    self.terminate(EndReason::CorruptState, None);
                }
                SessionStatus::Invalid
            }
            Stored::Corrupt(err) => {
                warn!(error = %err, "Failing closed on corrupt session state");
                self.terminate(EndReason::CorruptState, None);
                SessionStatus::Invalid
            }
            Stored::Present { expires_at } => {
                let left_ms = expires_at - self.clock.now_millis();
                if left_ms <= 0 {
                    debug!(error = %SessionError::ExpiredLocally, "Session check failed");
                    self.terminate(EndReason::Expired, None);
                    return SessionStatus::Invalid;
                }

                let time_left = Duration::from_millis(left_ms as u64);
                if time_left <= self.warning_window {
                    self.listener.expiry_warning(time_left);
                    SessionStatus::Expiring { time_left }
                } else {
                    SessionStatus::Valid { time_left }
                }
            }
        }
    }

    /// Periodic tick. Returns `false` once the timer should stop.
    fn periodic_check(&self, generation: u64) -> bool {
        {
            let control = self.lock();
            if control.generation != generation || control.phase != Phase::Active {
                return false;
            }
        }
        self.check().is_valid()
    }

    /// Tears the session down.
    ///
    /// With `expected_generation` set (timer callbacks) nothing happens unless
    /// that generation is still the live session. The first call on a live
    /// session clears storage, cancels both timers, and notifies the listener;
    /// later calls only repeat the redirect.
    fn terminate(&self, reason: EndReason, expected_generation: Option<u64>) {
        let ended = {
            let mut control = self.lock();
            if let Some(generation) = expected_generation {
                if control.generation != generation || control.phase != Phase::Active {
                    return;
                }
            }

            if let Some(timers) = control.timers.take() {
                timers.cancel();
            }

            let live = control.phase == Phase::Active
                || !matches!(self.read_stored(), Stored::Empty);
            let token = self.stored_token();

            if let Err(e) = self.storage.remove_many(&keys::ALL) {
                error!(error = %e, "Failed to clear session storage");
            }

            if live {
                control.phase = Phase::Ended;
                Some(token)
            } else {
                None
            }
        };

        if let Some(token) = ended {
            info!(reason = %reason, "Session ended");
            self.listener.session_ended(token.as_deref(), reason);
        }
        self.listener.redirect_to_login();
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let control = self.control.get_mut().unwrap_or_else(|p| p.into_inner());
        if let Some(timers) = control.timers.take() {
            timers.cancel();
        }
    }
}

/// Spawns the recurring check and the hard-expiry timer for `generation`.
///
/// The tasks hold only a weak reference, so dropping the last
/// [`SessionLifecycle`] stops them.
fn arm(inner: &Arc<Inner>, generation: u64, deadline: Duration) -> Option<Timers> {
    let handle = match Handle::try_current() {
        Ok(handle) => handle,
        Err(_) => {
            warn!("No tokio runtime; session timers not armed");
            return None;
        }
    };

    let period = inner.check_interval;
    let weak = Arc::downgrade(inner);

    let check = handle.spawn({
        let weak = weak.clone();
        async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else { break };
                if !inner.periodic_check(generation) {
                    break;
                }
            }
        }
    });

    let deadline = handle.spawn(async move {
        tokio::time::sleep(deadline).await;
        if let Some(inner) = weak.upgrade() {
            inner.terminate(EndReason::Deadline, Some(generation));
        }
    });

    debug!(generation, "Session timers armed");
    Some(Timers { check, deadline })
}
