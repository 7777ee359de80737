//! JWT claims carried by every marketplace credential.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use market_core::types::Role;

/// Claims payload embedded in a credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject, the account ID.
    pub sub: Uuid,
    /// Account e-mail, the session log's subject identifier.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Role level at the time of issuance.
    pub role: Role,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
    /// Unique credential ID.
    pub jti: Uuid,
}

impl Claims {
    /// Returns the account ID from the subject claim.
    pub fn account_id(&self) -> Uuid {
        self.sub
    }

    /// Returns the expiration as a `DateTime<Utc>`.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    /// Returns the remaining lifetime in seconds at `now` (0 if lapsed).
    pub fn remaining_seconds_at(&self, now: DateTime<Utc>) -> u64 {
        let remaining = self.exp - now.timestamp();
        if remaining > 0 { remaining as u64 } else { 0 }
    }
}
