//! Core identity traits and types.
//!
//! The token endpoint only talks to its collaborators through the traits in
//! this crate: a [`CredentialVerifier`] that resolves a resource owner from a
//! username and raw password, and a [`TokenIssuer`] that mints and introspects
//! bearer tokens.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifetime of an issued access token when the issuer does not say otherwise.
pub const DEFAULT_TOKEN_LIFETIME_SECONDS: u64 = 3600;

#[derive(Debug, Error)]
pub enum IdentityError {
    /// Unknown subject or wrong secret. The two cases are never distinguished.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Identifier already registered")]
    AlreadyRegistered,

    #[error("Invalid registration: {0}")]
    InvalidRegistration(String),

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Provider error: {0}")]
    ProviderError(String),
}

pub type IdentityResult<T> = Result<T, IdentityError>;

/// A resource owner as seen by the token endpoint.
///
/// The credential hash stays with the store that owns the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// Opaque, stable identifier. Tokens are bound to this value.
    pub id: String,
    /// The login identifier the subject authenticated with.
    pub identifier: String,
    pub display_name: Option<String>,
    pub active: bool,
}

/// Resolves a resource owner from a login identifier and a raw secret.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// Returns the matching subject, active or not.
    ///
    /// Implementations must return [`IdentityError::InvalidCredentials`] both
    /// for an unknown identifier and for a wrong secret.
    async fn verify(&self, identifier: &str, secret: &str) -> IdentityResult<Subject>;
}

/// Mints opaque bearer tokens bound to a subject id.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    async fn issue(&self, subject_id: &str) -> IdentityResult<String>;

    /// Recovers the subject id bound to a previously issued token.
    async fn introspect(&self, token: &str) -> IdentityResult<String>;

    /// Seconds an issued token stays valid, reported as `expires_in`.
    fn lifetime_seconds(&self) -> u64 {
        DEFAULT_TOKEN_LIFETIME_SECONDS
    }
}
