//! Bearer-token authentication traits for resource routes.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while authenticating a bearer token.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthError {
    /// The provided token is invalid, revoked or malformed.
    #[error("Invalid token")]
    InvalidToken,

    /// The token has expired.
    #[error("Token expired")]
    TokenExpired,

    /// Authentication is required but no bearer token was provided.
    #[error("Authentication required")]
    AuthenticationRequired,
}

/// The resource owner a bearer token was issued to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    /// Subject id the token is bound to.
    pub subject_id: String,

    /// Unique id of the token itself, usable for revocation.
    pub token_id: String,
}

/// Result type for authentication operations.
pub type AuthResult<T = AuthenticatedUser> = Result<T, AuthError>;

/// Boxed future for async authentication operations.
pub type AuthFuture<'a, T = AuthenticatedUser> =
    Pin<Box<dyn Future<Output = AuthResult<T>> + Send + 'a>>;

/// Validates bearer tokens presented to resource routes.
pub trait AuthProvider: Send + Sync + 'static {
    /// Validates a token and returns the user it was issued to.
    fn authenticate(&self, token: String) -> AuthFuture<'_>;
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
///
/// The scheme is matched case-insensitively. A blank token yields `None`.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedProvider;

    impl AuthProvider for FixedProvider {
        fn authenticate(&self, token: String) -> AuthFuture<'_> {
            Box::pin(async move {
                if token == "good" {
                    Ok(AuthenticatedUser {
                        subject_id: "user-1".to_string(),
                        token_id: "jti-1".to_string(),
                    })
                } else {
                    Err(AuthError::InvalidToken)
                }
            })
        }
    }

    #[test]
    fn test_bearer_token_extraction() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("bearer   abc "), Some("abc"));
        assert_eq!(bearer_token("Basic dXNlcjpwYXNz"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Bearer"), None);
    }

    #[test]
    fn test_error_messages() {
        let messages: Vec<String> = [
            AuthError::InvalidToken,
            AuthError::TokenExpired,
            AuthError::AuthenticationRequired,
        ]
        .iter()
        .map(ToString::to_string)
        .collect();

        assert_eq!(
            messages,
            ["Invalid token", "Token expired", "Authentication required"]
        );
    }

    #[tokio::test]
    async fn test_provider_through_trait_object() {
        let provider: Box<dyn AuthProvider> = Box::new(FixedProvider);

        let user = provider.authenticate("good".to_string()).await.unwrap();
        assert_eq!(user.subject_id, "user-1");

        let err = provider.authenticate("bad".to_string()).await.unwrap_err();
        assert_eq!(err, AuthError::InvalidToken);
    }
}
