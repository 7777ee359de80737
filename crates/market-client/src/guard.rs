//! Role-level route guard.

use std::sync::Arc;

use tracing::debug;

use market_auth::session::SessionLifecycle;
use market_core::types::Role;

use crate::client::UserProfile;

/// Where unauthenticated users are sent.
pub const LOGIN_ROUTE: &str = "/login";

/// What the router should do with a navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Render the requested page.
    Allow,
    /// Send the user to the given route instead.
    Redirect(String),
}

/// Decides whether a role-restricted page may render.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    lifecycle: Arc<SessionLifecycle>,
    login_route: String,
}

impl RouteGuard {
    /// Creates a guard that redirects to [`LOGIN_ROUTE`].
    pub fn new(lifecycle: Arc<SessionLifecycle>) -> Self {
        Self::with_login_route(lifecycle, LOGIN_ROUTE)
    }

    /// Creates a guard with a custom login route.
    pub fn with_login_route(lifecycle: Arc<SessionLifecycle>, login_route: &str) -> Self {
        Self {
            lifecycle,
            login_route: login_route.to_string(),
        }
    }

    /// Checks a page that requires `required`.
    ///
    /// Users without a valid session go to the login route; users with
    /// another role go to their own home route.
    pub fn check(&self, required: Role) -> GuardDecision {
        let Some(role) = self.current_role() else {
            return GuardDecision::Redirect(self.login_route.clone());
        };

        if role == required {
            GuardDecision::Allow
        } else {
            debug!(%role, %required, "Role mismatch, redirecting home");
            GuardDecision::Redirect(role.home_route().to_string())
        }
    }

    /// Checks a page open to any signed-in user.
    pub fn check_authenticated(&self) -> GuardDecision {
        match self.current_role() {
            Some(_) => GuardDecision::Allow,
            None => GuardDecision::Redirect(self.login_route.clone()),
        }
    }

    /// Role of the signed-in user, or `None` without a valid session.
    fn current_role(&self) -> Option<Role> {
        if !self.lifecycle.is_authenticated() {
            return None;
        }
        let subject = self.lifecycle.get_subject_data()?;
        match serde_json::from_value::<UserProfile>(subject) {
            Ok(profile) => Some(profile.role),
            Err(e) => {
                debug!(error = %e, "Subject data carries no role");
                None
            }
        }
    }
}
