//! Account lookup for the login flow.
//!
//! Account CRUD lives outside this subsystem; the directory only answers
//! "who is this e-mail" at credential issuance.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use market_core::config::SeedAccount;
use market_core::error::AppError;
use market_core::result::AppResult;
use market_core::types::Role;

use crate::password::PasswordHasher;

/// An account that can sign in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Account ID, the credential subject.
    pub id: Uuid,
    /// Login e-mail.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Role level.
    pub role: Role,
    /// Argon2id PHC string.
    #[serde(skip_serializing)]
    pub password_hash: String,
}

/// Read access to accounts by login e-mail.
#[async_trait]
pub trait AccountDirectory: Send + Sync + std::fmt::Debug + 'static {
    /// Finds an account by e-mail (case-insensitive).
    async fn find_by_email(&self, email: &str) -> AppResult<Option<Account>>;
}

/// In-memory account directory.
#[derive(Debug, Clone, Default)]
pub struct MemoryAccountDirectory {
    accounts: Arc<DashMap<String, Account>>,
}

impl MemoryAccountDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a directory from configured seed accounts.
    pub fn from_seeds(seeds: &[SeedAccount]) -> AppResult<Self> {
        let directory = Self::new();
        for seed in seeds {
            let role = Role::try_from(seed.role).map_err(|e| {
                AppError::configuration(format!("Seed account '{}': {e}", seed.email))
            })?;
            directory.insert(Account {
                id: Uuid::new_v4(),
                email: seed.email.clone(),
                name: seed.name.clone(),
                role,
                password_hash: seed.password_hash.clone(),
            });
        }
        info!(count = seeds.len(), "Seed accounts loaded");
        Ok(directory)
    }

    /// Adds or replaces an account.
    pub fn insert(&self, account: Account) {
        self.accounts.insert(normalize(&account.email), account);
    }

    /// Hashes `password` and adds the account.
    pub fn register(
        &self,
        email: &str,
        name: &str,
        role: Role,
        password: &str,
        hasher: &PasswordHasher,
    ) -> AppResult<Account> {
        let account = Account {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: name.to_string(),
            role,
            password_hash: hasher.hash_password(password)?,
        };
        self.insert(account.clone());
        Ok(account)
    }
}

#[async_trait]
impl AccountDirectory for MemoryAccountDirectory {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        Ok(self
            .accounts
            .get(&normalize(email))
            .map(|entry| entry.value().clone()))
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}
