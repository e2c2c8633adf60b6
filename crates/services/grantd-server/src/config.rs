//! Configuration for the token server
//!
//! Sources, later ones winning:
//! - Defaults
//! - Configuration file (`config.toml`, or the path in `GRANTD_CONFIG_FILE`)
//! - Environment variables with the `GRANTD` prefix, e.g. `GRANTD__SERVER__PORT`
//! - Plain `HOST`, `PORT`, `JWT_SECRET` and `RUST_LOG` variables

use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File};
use grantd_identity_session::SessionConfig;
use grantd_token_endpoint::{RegisteredClient, StaticClientRegistry};
use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};

pub const DEFAULT_JWT_SECRET: &str = "dev-secret-key-change-in-production";

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const VALID_LOG_FORMATS: [&str; 3] = ["pretty", "json", "compact"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    /// OAuth2 clients allowed to call the token endpoint
    pub clients: ClientsConfig,
    /// Accounts created at startup
    pub users: Vec<SeedUser>,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to (default: 127.0.0.1)
    pub host: IpAddr,

    /// Port to bind to (default: 8080)
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret for signing access tokens
    pub jwt_secret: String,

    /// Access token lifetime in seconds (default: 3600)
    pub token_ttl_seconds: i64,

    /// JWT algorithm, one of HS256, HS384, HS512 (default: HS256)
    pub jwt_algorithm: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientsConfig {
    pub registered: Vec<ClientConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub client_id: String,

    #[serde(default)]
    pub client_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedUser {
    pub email: String,

    #[serde(default)]
    pub name: String,

    /// Plaintext, hashed on startup
    pub password: String,

    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level, or a full tracing filter directive
    pub level: String,

    /// Log format (pretty, json, compact)
    pub format: String,
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8080,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            token_ttl_seconds: 3600,
            jwt_algorithm: "HS256".to_string(),
        }
    }
}

impl Default for ClientsConfig {
    fn default() -> Self {
        Self {
            registered: vec![ClientConfig {
                client_id: "todo-web".to_string(),
                client_secret: "todo-secret".to_string(),
            }],
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment and optional config file
    pub fn load() -> Result<Self> {
        let config_path =
            std::env::var("GRANTD_CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());
        Self::load_from(Path::new(&config_path))
    }

    /// Load configuration using `path` as the config file, if it exists
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        if path.exists() {
            info!("Loading configuration from {}", path.display());
            builder = builder.add_source(File::from(path));
        } else {
            debug!("No config file found at {}, using defaults", path.display());
        }

        builder = builder.add_source(
            Environment::with_prefix("GRANTD")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let mut settings: Config = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        settings.apply_env_overrides()?;
        settings.validate()?;

        Ok(settings)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(host) = std::env::var("HOST") {
            info!("Using HOST environment variable");
            self.server.host = host.parse().context("Invalid HOST value")?;
        }

        if let Ok(port) = std::env::var("PORT") {
            info!("Using PORT environment variable");
            self.server.port = port.parse().context("Invalid PORT value")?;
        }

        if let Ok(jwt_secret) = std::env::var("JWT_SECRET") {
            info!("Using JWT_SECRET environment variable");
            self.auth.jwt_secret = jwt_secret;
        }

        if let Ok(log_level) = std::env::var("RUST_LOG") {
            self.logging.level = log_level;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port cannot be 0");
        }

        if self.auth.jwt_secret.is_empty() {
            anyhow::bail!("JWT secret cannot be empty");
        }
        if self.auth.jwt_secret == DEFAULT_JWT_SECRET {
            if cfg!(debug_assertions) {
                warn!("Using default JWT secret - this is insecure for production!");
            } else {
                anyhow::bail!("JWT secret must be changed from default in production");
            }
        }

        if self.auth.token_ttl_seconds <= 0 {
            anyhow::bail!("Token TTL must be positive");
        }

        self.auth.algorithm()?;

        let level = self.logging.level.to_lowercase();
        let is_directive = level.contains('=') || level.contains(',');
        if !is_directive && !VALID_LOG_LEVELS.contains(&level.as_str()) {
            anyhow::bail!(
                "Invalid log level '{}'. Must be one of: {:?}",
                self.logging.level,
                VALID_LOG_LEVELS
            );
        }

        let format = self.logging.format.to_lowercase();
        if !VALID_LOG_FORMATS.contains(&format.as_str()) {
            anyhow::bail!(
                "Invalid log format '{}'. Must be one of: {:?}",
                self.logging.format,
                VALID_LOG_FORMATS
            );
        }

        let mut client_ids = HashSet::new();
        for client in &self.clients.registered {
            if client.client_id.trim().is_empty() {
                anyhow::bail!("Client ID cannot be empty");
            }
            if !client_ids.insert(client.client_id.as_str()) {
                anyhow::bail!("Duplicate client ID '{}'", client.client_id);
            }
        }

        for user in &self.users {
            if !user.email.contains('@') {
                anyhow::bail!("Seed user email '{}' is not a valid email", user.email);
            }
            if user.password.chars().count() < grantd_identity_local::MIN_PASSWORD_LENGTH {
                anyhow::bail!(
                    "Password for seed user '{}' must be at least {} characters",
                    user.email,
                    grantd_identity_local::MIN_PASSWORD_LENGTH
                );
            }
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from((self.server.host, self.server.port))
    }

    /// The filter string for tracing
    pub fn log_filter(&self) -> String {
        if self.logging.level.contains('=') || self.logging.level.contains(',') {
            self.logging.level.clone()
        } else {
            format!(
                "grantd_server={level},grantd_token_endpoint={level},grantd_identity_local={level},grantd_identity_session={level},tower_http={level},warn",
                level = self.logging.level.to_lowercase()
            )
        }
    }

    pub fn client_registry(&self) -> StaticClientRegistry {
        self.clients
            .registered
            .iter()
            .map(|c| RegisteredClient::new(c.client_id.clone(), c.client_secret.clone()))
            .collect()
    }
}

impl AuthConfig {
    pub fn algorithm(&self) -> Result<Algorithm> {
        let algorithm = Algorithm::from_str(&self.jwt_algorithm.to_uppercase())
            .with_context(|| format!("Unknown JWT algorithm '{}'", self.jwt_algorithm))?;
        match algorithm {
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Ok(algorithm),
            other => anyhow::bail!("JWT algorithm {:?} needs a key pair; use HS256, HS384 or HS512", other),
        }
    }

    pub fn session_config(&self) -> Result<SessionConfig> {
        Ok(SessionConfig {
            jwt_secret: self.jwt_secret.clone(),
            jwt_ttl: chrono::Duration::seconds(self.token_ttl_seconds),
            algorithm: self.algorithm()?,
        })
    }
}
