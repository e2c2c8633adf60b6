//! Access-token issuance with signed JWTs.
//!
//! Every token carries a random `jti` that is recorded as an active session.
//! Introspection requires both a valid signature/expiry and a live session, so
//! revoking the `jti` invalidates the token before it expires.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use grantd_auth_core::{AuthError, AuthFuture, AuthProvider, AuthenticatedUser};
use grantd_identity_core::{IdentityError, IdentityResult, TokenIssuer};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("Session expired")]
    SessionExpired,

    #[error("Session not found")]
    SessionNotFound,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub jwt_secret: String,
    pub jwt_ttl: Duration,
    pub algorithm: Algorithm,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "change-me-in-production".to_string(),
            jwt_ttl: Duration::seconds(3600),
            algorithm: Algorithm::HS256,
        }
    }
}

pub struct JwtTokenIssuer {
    config: SessionConfig,
    active_sessions: Arc<RwLock<HashMap<String, JwtClaims>>>,
}

impl JwtTokenIssuer {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            active_sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn begin_session(&self, subject_id: &str) -> Result<String, SessionError> {
        let now = Utc::now();
        let claims = JwtClaims {
            sub: subject_id.to_string(),
            exp: (now + self.config.jwt_ttl).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(
            &Header::new(self.config.algorithm),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )?;

        let mut sessions = self.active_sessions.write().await;
        debug!(jti = %claims.jti, "session started");
        sessions.insert(claims.jti.clone(), claims);

        Ok(token)
    }

    pub async fn verify_session(&self, token: &str) -> Result<JwtClaims, SessionError> {
        let token_data = decode::<JwtClaims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &Validation::new(self.config.algorithm),
        )
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => SessionError::SessionExpired,
            _ => SessionError::JwtError(e),
        })?;

        let sessions = self.active_sessions.read().await;
        if !sessions.contains_key(&token_data.claims.jti) {
            return Err(SessionError::SessionNotFound);
        }

        Ok(token_data.claims)
    }

    /// Revokes the session behind `jti`; returns whether it was live.
    pub async fn revoke(&self, jti: &str) -> bool {
        let mut sessions = self.active_sessions.write().await;
        sessions.remove(jti).is_some()
    }

    /// Drops sessions whose tokens have expired and returns how many.
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now().timestamp();
        let mut sessions = self.active_sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, claims| claims.exp > now);
        before - sessions.len()
    }
}

#[async_trait]
impl TokenIssuer for JwtTokenIssuer {
    async fn issue(&self, subject_id: &str) -> IdentityResult<String> {
        self.begin_session(subject_id)
            .await
            .map_err(|e| IdentityError::ProviderError(e.to_string()))
    }

    async fn introspect(&self, token: &str) -> IdentityResult<String> {
        match self.verify_session(token).await {
            Ok(claims) => Ok(claims.sub),
            Err(SessionError::SessionExpired) => Err(IdentityError::TokenExpired),
            Err(_) => Err(IdentityError::InvalidToken),
        }
    }

    fn lifetime_seconds(&self) -> u64 {
        self.config.jwt_ttl.num_seconds().max(0) as u64
    }
}

/// Authenticates bearer tokens on resource routes against the issuer's sessions.
#[derive(Clone)]
pub struct JwtAuthProvider {
    issuer: Arc<JwtTokenIssuer>,
}

impl JwtAuthProvider {
    pub fn new(issuer: Arc<JwtTokenIssuer>) -> Self {
        Self { issuer }
    }
}

impl AuthProvider for JwtAuthProvider {
    fn authenticate(&self, token: String) -> AuthFuture<'_> {
        Box::pin(async move {
            let claims = self
                .issuer
                .verify_session(&token)
                .await
                .map_err(|e| match e {
                    SessionError::SessionExpired => AuthError::TokenExpired,
                    _ => AuthError::InvalidToken,
                })?;

            Ok(AuthenticatedUser {
                subject_id: claims.sub,
                token_id: claims.jti,
            })
        })
    }
}
