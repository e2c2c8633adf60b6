//! Registered OAuth2 clients.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The credentials a client is expected to present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredClient {
    pub client_id: String,
    pub client_secret: String,
}

impl RegisteredClient {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Compares a presented secret without short-circuiting on the first
    /// differing byte. An absent secret is compared as the empty string.
    pub fn secret_matches(&self, presented: Option<&str>) -> bool {
        let expected = self.client_secret.as_bytes();
        let presented = presented.unwrap_or("").as_bytes();

        let mut diff = expected.len() ^ presented.len();
        for (i, byte) in expected.iter().enumerate() {
            let other = presented.get(i).copied().unwrap_or(0);
            diff |= usize::from(byte ^ other);
        }
        diff == 0
    }
}

/// Looks up registered clients by id.
#[async_trait]
pub trait ClientRegistry: Send + Sync {
    async fn lookup(&self, client_id: &str) -> Option<RegisteredClient>;
}

/// A fixed set of clients, typically loaded from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticClientRegistry {
    clients: HashMap<String, RegisteredClient>,
}

impl StaticClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(mut self, client: RegisteredClient) -> Self {
        self.clients.insert(client.client_id.clone(), client);
        self
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

impl FromIterator<RegisteredClient> for StaticClientRegistry {
    fn from_iter<I: IntoIterator<Item = RegisteredClient>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |registry, client| registry.with_client(client))
    }
}

#[async_trait]
impl ClientRegistry for StaticClientRegistry {
    async fn lookup(&self, client_id: &str) -> Option<RegisteredClient> {
        self.clients.get(client_id).cloned()
    }
}
