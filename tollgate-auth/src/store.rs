//! Credential store collaborator
//!
//! The login flow only ever asks two questions of storage: fetch a record by
//! login, and fetch a record by id. Anything that can answer them can back
//! the auth service.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::claims::{PublicIdentity, Role};
use crate::error::StoreError;
use crate::password::hash_password;

/// An identity paired with the one-way hash of its secret
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub id: String,
    pub login: String,
    /// PHC-formatted hash of the secret
    pub password_hash: String,
    #[serde(default)]
    pub is_admin: bool,
}

impl CredentialRecord {
    pub fn role(&self) -> Role {
        Role::from_admin_flag(self.is_admin)
    }

    pub fn identity(&self) -> PublicIdentity {
        PublicIdentity {
            id: self.id.clone(),
            login: self.login.clone(),
            is_admin: self.is_admin,
        }
    }
}

/// `admin/admin123` (elevated) and `user/user123`, freshly hashed
pub fn demo_users() -> Result<Vec<CredentialRecord>, argon2::password_hash::Error> {
    [("admin", "admin123", true), ("user", "user123", false)]
        .into_iter()
        .map(|(login, password, is_admin)| -> Result<CredentialRecord, argon2::password_hash::Error> {
            Ok(CredentialRecord {
                id: Uuid::new_v4().to_string(),
                login: login.to_string(),
                password_hash: hash_password(password)?,
                is_admin,
            })
        })
        .collect()
}

/// Trait for credential lookup - allows swapping implementations
/// (in-memory for dev and tests, a database for production)
#[async_trait::async_trait]
pub trait CredentialStore: Send + Sync {
    /// `Ok(None)` when no record exists for the login
    async fn fetch_by_login(&self, login: &str) -> Result<Option<CredentialRecord>, StoreError>;

    /// `Ok(None)` when no record exists for the id
    async fn fetch_by_id(&self, id: &str) -> Result<Option<CredentialRecord>, StoreError>;
}

/// In-memory credential store keyed by login
#[derive(Clone, Default)]
pub struct InMemoryCredentialStore {
    records: Arc<RwLock<HashMap<String, CredentialRecord>>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = CredentialRecord>) -> Self {
        let map = records
            .into_iter()
            .map(|record| (record.login.clone(), record))
            .collect();
        Self {
            records: Arc::new(RwLock::new(map)),
        }
    }

    /// Load records from a JSON array of [`CredentialRecord`]
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let records: Vec<CredentialRecord> = serde_json::from_str(json)?;
        Ok(Self::from_records(records))
    }

    /// Store seeded with [`demo_users`]
    pub fn with_demo_users() -> Result<Self, argon2::password_hash::Error> {
        Ok(Self::from_records(demo_users()?))
    }

    pub async fn insert(&self, record: CredentialRecord) {
        self.records
            .write()
            .await
            .insert(record.login.clone(), record);
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn fetch_by_login(&self, login: &str) -> Result<Option<CredentialRecord>, StoreError> {
        Ok(self.records.read().await.get(login).cloned())
    }

    async fn fetch_by_id(&self, id: &str) -> Result<Option<CredentialRecord>, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .find(|record| record.id == id)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, login: &str) -> CredentialRecord {
        CredentialRecord {
            id: id.into(),
            login: login.into(),
            password_hash: "$argon2id$placeholder".into(),
            is_admin: false,
        }
    }

    #[tokio::test]
    async fn test_fetch_by_login_and_id() {
        let store = InMemoryCredentialStore::from_records([record("1", "alice"), record("2", "bob")]);

        let alice = store.fetch_by_login("alice").await.unwrap().unwrap();
        assert_eq!(alice.id, "1");

        let bob = store.fetch_by_id("2").await.unwrap().unwrap();
        assert_eq!(bob.login, "bob");

        assert!(store.fetch_by_login("carol").await.unwrap().is_none());
        assert!(store.fetch_by_id("3").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_demo_users() {
        let store = InMemoryCredentialStore::with_demo_users().unwrap();
        assert_eq!(store.len().await, 2);

        let admin = store.fetch_by_login("admin").await.unwrap().unwrap();
        assert_eq!(admin.role(), Role::Elevated);
        assert!(admin.password_hash.starts_with("$argon2"));

        let user = store.fetch_by_login("user").await.unwrap().unwrap();
        assert_eq!(user.role(), Role::Standard);
    }

    #[tokio::test]
    async fn test_from_json() {
        let json = r#"[
            {"id": "u-1", "login": "ops", "password_hash": "$argon2id$x", "is_admin": true},
            {"id": "u-2", "login": "dev", "password_hash": "$argon2id$y"}
        ]"#;
        let store = InMemoryCredentialStore::from_json(json).unwrap();

        assert!(store.fetch_by_login("ops").await.unwrap().unwrap().is_admin);
        assert!(!store.fetch_by_login("dev").await.unwrap().unwrap().is_admin);
    }

    #[tokio::test]
    async fn test_insert() {
        let store = InMemoryCredentialStore::new();
        assert!(store.is_empty().await);
        store.insert(record("9", "zed")).await;
        assert_eq!(store.fetch_by_id("9").await.unwrap().unwrap().login, "zed");
    }
}
