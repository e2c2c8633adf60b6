use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    routing::{get, post},
};
use grantd_auth_core::AuthProvider;
use grantd_identity_local::LocalUserProvider;
use grantd_identity_session::{JwtAuthProvider, JwtTokenIssuer};
use grantd_token_endpoint::{ClientRegistry, TokenEndpoint, token_router};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api;
use crate::config::Config;

/// Shared handles for every route.
#[derive(Clone)]
pub struct AppState {
    pub endpoint: Arc<TokenEndpoint>,
    pub users: LocalUserProvider,
    pub issuer: Arc<JwtTokenIssuer>,
    pub auth: Arc<dyn AuthProvider>,
}

impl AppState {
    pub fn new(
        users: LocalUserProvider,
        issuer: Arc<JwtTokenIssuer>,
        clients: Arc<dyn ClientRegistry>,
    ) -> Self {
        let endpoint = TokenEndpoint::new(clients, Arc::new(users.clone()), issuer.clone());
        let auth = JwtAuthProvider::new(issuer.clone());

        Self {
            endpoint: Arc::new(endpoint),
            users,
            issuer,
            auth: Arc::new(auth),
        }
    }

    /// Build the state from configuration, creating every seed account.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let users = LocalUserProvider::new();
        for seed in &config.users {
            users
                .register(&seed.email, &seed.name, &seed.password)
                .await
                .with_context(|| format!("Failed to create seed user {}", seed.email))?;
            if !seed.active {
                users.set_active(&seed.email, false).await;
            }
            info!("Created seed user: {}", seed.email);
        }

        let issuer = Arc::new(JwtTokenIssuer::new(config.auth.session_config()?));
        let clients = config.client_registry();
        info!("Registered {} OAuth2 client(s)", clients.len());

        Ok(Self::new(users, issuer, Arc::new(clients)))
    }
}

pub fn build_router(state: AppState) -> Router {
    let endpoint = state.endpoint.clone();

    Router::new()
        .route("/register", post(api::register))
        .route("/login", post(api::login))
        .route("/me", get(api::me))
        .route("/health", get(api::health))
        .with_state(state)
        .merge(token_router(endpoint))
        .layer(TraceLayer::new_for_http())
}
