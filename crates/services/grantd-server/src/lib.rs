//! grantd: an OAuth2 password-grant token server.
//!
//! Serves `POST /oauth/token` alongside account registration, direct login
//! and a bearer-protected `GET /me`.

pub mod api;
pub mod app;
pub mod config;
pub mod telemetry;

pub use app::{AppState, build_router};
pub use config::Config;
