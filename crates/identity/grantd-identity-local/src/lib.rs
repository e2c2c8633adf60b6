//! Local resource-owner store with email/password authentication.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use async_trait::async_trait;
use grantd_identity_core::{CredentialVerifier, IdentityError, IdentityResult, Subject};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, Semaphore};
use tracing::debug;
use uuid::Uuid;

/// Shortest password accepted at registration.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Upper bound on concurrent Argon2 verifications.
const MAX_CONCURRENT_VERIFICATIONS: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub active: bool,
}

impl LocalUser {
    fn to_subject(&self) -> Subject {
        Subject {
            id: self.id.to_string(),
            identifier: self.email.clone(),
            display_name: (!self.name.is_empty()).then(|| self.name.clone()),
            active: self.active,
        }
    }
}

/// Users keyed by normalized (trimmed, lowercased) email.
#[derive(Clone)]
pub struct LocalUserProvider {
    users: Arc<RwLock<HashMap<String, LocalUser>>>,
    semaphore: Arc<Semaphore>,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl LocalUserProvider {
    pub fn new() -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
            semaphore: Arc::new(Semaphore::new(MAX_CONCURRENT_VERIFICATIONS)),
        }
    }

    /// Registers a new active user and returns its id.
    pub async fn register(&self, email: &str, name: &str, password: &str) -> IdentityResult<String> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(IdentityError::InvalidRegistration(
                "Email cannot be empty".to_string(),
            ));
        }
        if !email.contains('@') {
            return Err(IdentityError::InvalidRegistration(
                "Invalid email format".to_string(),
            ));
        }
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(IdentityError::InvalidRegistration(format!(
                "Password must be at least {MIN_PASSWORD_LENGTH} characters long"
            )));
        }

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| IdentityError::ProviderError(e.to_string()))?
            .to_string();

        let user = LocalUser {
            id: Uuid::new_v4(),
            email: email.clone(),
            name: name.trim().to_string(),
            password_hash,
            active: true,
        };
        let id = user.id.to_string();

        let mut users = self.users.write().await;
        if users.contains_key(&email) {
            return Err(IdentityError::AlreadyRegistered);
        }
        users.insert(email, user);
        debug!(user_id = %id, "registered local user");

        Ok(id)
    }

    /// Returns false when no user has this email.
    pub async fn set_active(&self, email: &str, active: bool) -> bool {
        let mut users = self.users.write().await;
        match users.get_mut(&normalize_email(email)) {
            Some(user) => {
                user.active = active;
                true
            }
            None => false,
        }
    }

    pub async fn find_by_email(&self, email: &str) -> Option<LocalUser> {
        let users = self.users.read().await;
        users.get(&normalize_email(email)).cloned()
    }

    pub async fn remove_user(&self, email: &str) -> Option<LocalUser> {
        let mut users = self.users.write().await;
        users.remove(&normalize_email(email))
    }

    async fn verify_user(&self, email: &str, password: &str) -> IdentityResult<LocalUser> {
        let _permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| IdentityError::ProviderError(e.to_string()))?;
        let users = self.users.read().await;

        // Real Argon2 hash of "dummy_password", verified for unknown users so
        // both failure paths cost the same.
        const DUMMY_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$9QsJRKgzJkKaOUvlp7gl2Q$qmE3qIFBNJ6nZYbLYXEI2uo0zZc7T0Q8LU1ZsqsZ3QE";

        let user = users.get(&normalize_email(email));
        let password_hash = user.map_or(DUMMY_HASH, |u| u.password_hash.as_str());

        let parsed_hash = PasswordHash::new(password_hash)
            .map_err(|e| IdentityError::ProviderError(e.to_string()))?;

        let password_valid = Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok();

        match user {
            Some(user) if password_valid => Ok(user.clone()),
            _ => Err(IdentityError::InvalidCredentials),
        }
    }
}

impl Default for LocalUserProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialVerifier for LocalUserProvider {
    async fn verify(&self, identifier: &str, secret: &str) -> IdentityResult<Subject> {
        let user = self.verify_user(identifier, secret).await?;
        Ok(user.to_subject())
    }
}
