use crate::models::User;
use async_trait::async_trait;
use bcrypt::{hash, verify, DEFAULT_COST};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::spawn_blocking;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("username {0:?} already exists")]
    DuplicateUser(String),
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("password hashing task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// How passwords are kept at rest and compared on login.
///
/// `Plain` stores the password as given and compares by exact string match.
/// `Bcrypt` stores a salted hash instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PasswordScheme {
    #[default]
    Plain,
    Bcrypt,
}

/// Bcrypt work runs on tokio's blocking pool so request workers stay free.
impl PasswordScheme {
    async fn seal(self, password: &str) -> Result<String, StoreError> {
        match self {
            PasswordScheme::Plain => Ok(password.to_string()),
            PasswordScheme::Bcrypt => {
                let password = password.to_string();
                Ok(spawn_blocking(move || hash(password, DEFAULT_COST)).await??)
            }
        }
    }

    async fn matches(self, password: &str, stored: &str) -> bool {
        match self {
            PasswordScheme::Plain => password == stored,
            PasswordScheme::Bcrypt => {
                let (password, stored) = (password.to_string(), stored.to_string());
                spawn_blocking(move || verify(password, &stored).unwrap_or(false))
                    .await
                    .unwrap_or(false)
            }
        }
    }
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Inserts a new, enabled user. Fails with `DuplicateUser` if the name is taken.
    async fn register(&self, username: &str, password: &str) -> Result<(), StoreError>;

    /// Returns the user record when the username exists and the password matches.
    async fn authenticate(&self, username: &str, password: &str) -> Option<User>;
}

pub type SharedStore = Arc<dyn CredentialStore>;

#[derive(Default)]
pub struct InMemoryStore {
    users: Mutex<HashMap<String, User>>,
    scheme: PasswordScheme,
}

impl InMemoryStore {
    pub fn new(scheme: PasswordScheme) -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
            scheme,
        }
    }

    /// Inserts configured users, skipping names that already exist.
    pub async fn seed(&self, users: &[(String, String)]) -> Result<(), StoreError> {
        for (username, password) in users {
            match self.register(username, password).await {
                Ok(()) => debug!(username = %username, "seeded user"),
                Err(StoreError::DuplicateUser(_)) => {
                    warn!(username = %username, "skipping duplicate seed user")
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.users.lock().await.len()
    }
}

#[async_trait]
impl CredentialStore for InMemoryStore {
    async fn register(&self, username: &str, password: &str) -> Result<(), StoreError> {
        // Hash outside the lock; the presence check and insert share one guard.
        let sealed = self.scheme.seal(password).await?;
        let mut users = self.users.lock().await;
        if users.contains_key(username) {
            return Err(StoreError::DuplicateUser(username.to_string()));
        }
        users.insert(
            username.to_string(),
            User {
                username: username.to_string(),
                password: sealed,
                disabled: false,
            },
        );
        Ok(())
    }

    async fn authenticate(&self, username: &str, password: &str) -> Option<User> {
        let user = self.users.lock().await.get(username).cloned()?;
        if self.scheme.matches(password, &user.password).await {
            Some(user)
        } else {
            None
        }
    }
}
