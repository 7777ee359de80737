//! Role levels consumed by route guards and carried in credentials.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Account role, serialized as its integer level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Role {
    /// Level 1.
    Admin,
    /// Level 2.
    Seller,
    /// Level 3.
    Buyer,
}

impl Role {
    /// The integer level of this role.
    pub fn level(self) -> u8 {
        match self {
            Self::Admin => 1,
            Self::Seller => 2,
            Self::Buyer => 3,
        }
    }

    /// Landing route for a signed-in user of this role.
    pub fn home_route(self) -> &'static str {
        match self {
            Self::Admin => "/admin",
            Self::Seller => "/seller",
            Self::Buyer => "/",
        }
    }
}

impl TryFrom<u8> for Role {
    type Error = String;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        match level {
            1 => Ok(Self::Admin),
            2 => Ok(Self::Seller),
            3 => Ok(Self::Buyer),
            other => Err(format!("unknown role level: {other}")),
        }
    }
}

impl From<Role> for u8 {
    fn from(role: Role) -> Self {
        role.level()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Seller => write!(f, "seller"),
            Self::Buyer => write!(f, "buyer"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" | "1" => Ok(Self::Admin),
            "seller" | "2" => Ok(Self::Seller),
            "buyer" | "3" => Ok(Self::Buyer),
            other => Err(format!("unknown role: {other}")),
        }
    }
}
