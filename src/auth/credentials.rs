use std::collections::HashMap;

use crate::auth::models::{CredentialRecord, Role};
use crate::error::AuthError;

/// Username and password of the account seeded at startup
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

/// Read-only lookup of credential records by username
#[derive(Debug, Clone)]
pub struct CredentialStore {
    records: HashMap<String, CredentialRecord>,
    dummy_hash: String,
}

impl CredentialStore {
    /// Build a store from records. Usernames must be unique.
    ///
    /// `cost` is only used for the placeholder hash that unknown usernames are
    /// checked against, so a miss takes as long as a wrong password.
    pub fn new(records: Vec<CredentialRecord>, cost: u32) -> Result<Self, AuthError> {
        let mut by_name = HashMap::with_capacity(records.len());
        for record in records {
            if by_name.contains_key(&record.username) {
                return Err(AuthError::Internal(format!(
                    "Duplicate credential for username '{}'",
                    record.username
                )));
            }
            by_name.insert(record.username.clone(), record);
        }

        Ok(Self {
            records: by_name,
            dummy_hash: hash_password("not-a-real-password", cost)?,
        })
    }

    /// Store holding the default `admin` account
    pub fn with_default_seed(cost: u32) -> Result<Self, AuthError> {
        let admin = CredentialRecord {
            id: 1,
            username: DEFAULT_ADMIN_USERNAME.to_string(),
            password_hash: hash_password(DEFAULT_ADMIN_PASSWORD, cost)?,
            role: Role::Admin,
        };
        Self::new(vec![admin], cost)
    }

    /// Exact, case-sensitive lookup
    pub fn find_by_username(&self, username: &str) -> Option<&CredentialRecord> {
        self.records.get(username)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub(crate) fn dummy_hash(&self) -> &str {
        &self.dummy_hash
    }
}

/// bcrypt-hash a password at the given cost
pub fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    bcrypt::hash(password, cost).map_err(|e| AuthError::Internal(format!("Failed to hash password: {}", e)))
}
