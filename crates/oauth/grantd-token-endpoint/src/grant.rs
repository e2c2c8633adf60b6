//! Grant dispatch for the token endpoint.
//!
//! Checks run in a fixed order and the first failure ends the request:
//! grant type presence, client presence, client authentication, grant type
//! support, grant parameters, resource owner verification, account state.
//! Client authentication precedes the grant type check so unauthenticated
//! callers cannot discover which grants exist.

use std::str::FromStr;
use std::sync::Arc;

use grantd_identity_core::{CredentialVerifier, IdentityError, TokenIssuer};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::client::{ClientRegistry, RegisteredClient};
use crate::client_auth::ClientIdentity;
use crate::error::{ProtocolError, ProtocolResult};
use crate::form::FormParams;

pub const BEARER_TOKEN_TYPE: &str = "Bearer";

/// Grant kinds the endpoint understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantType {
    /// Resource owner password credentials (RFC 6749 §4.3).
    Password,
}

impl GrantType {
    pub fn as_str(self) -> &'static str {
        match self {
            GrantType::Password => "password",
        }
    }
}

impl FromStr for GrantType {
    type Err = ProtocolError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "password" => Ok(GrantType::Password),
            _ => Err(ProtocolError::unsupported_grant_type(
                "grant_type not supported",
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRequest {
    pub grant_type: Option<String>,
    pub client: ClientIdentity,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Accepted unvalidated and never echoed.
    pub scope: Option<String>,
}

impl TokenRequest {
    pub fn from_form(form: &FormParams, client: ClientIdentity) -> Self {
        let field = |name: &str| form.get(name).map(str::to_string);
        Self {
            grant_type: field("grant_type"),
            client,
            username: field("username"),
            password: field("password"),
            scope: field("scope"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// The token endpoint with its collaborators.
pub struct TokenEndpoint {
    clients: Arc<dyn ClientRegistry>,
    verifier: Arc<dyn CredentialVerifier>,
    issuer: Arc<dyn TokenIssuer>,
}

impl TokenEndpoint {
    pub fn new(
        clients: Arc<dyn ClientRegistry>,
        verifier: Arc<dyn CredentialVerifier>,
        issuer: Arc<dyn TokenIssuer>,
    ) -> Self {
        Self {
            clients,
            verifier,
            issuer,
        }
    }

    /// Runs a raw request through normalization, client resolution and dispatch.
    pub async fn handle(
        &self,
        authorization: Option<&str>,
        body: &[u8],
    ) -> ProtocolResult<TokenResponse> {
        let form = FormParams::from_bytes(body)?;
        let client = ClientIdentity::resolve(authorization, &form)?;
        self.token(TokenRequest::from_form(&form, client)).await
    }

    pub async fn token(&self, request: TokenRequest) -> ProtocolResult<TokenResponse> {
        let grant_type = present(&request.grant_type)
            .ok_or_else(|| ProtocolError::invalid_request("grant_type is required"))?;

        let client = self.authenticate_client(&request.client).await?;

        match grant_type.parse::<GrantType>()? {
            GrantType::Password => self.password_grant(&client, &request).await,
        }
    }

    async fn authenticate_client(&self, client: &ClientIdentity) -> ProtocolResult<RegisteredClient> {
        let failed = || ProtocolError::invalid_client("client authentication failed");

        let client_id = present(&client.id).ok_or_else(failed)?;

        match self.clients.lookup(client_id).await {
            Some(registered) if registered.secret_matches(client.secret.as_deref()) => {
                Ok(registered)
            }
            _ => {
                debug!(method = ?client.method, "client authentication failed");
                Err(failed())
            }
        }
    }

    async fn password_grant(
        &self,
        client: &RegisteredClient,
        request: &TokenRequest,
    ) -> ProtocolResult<TokenResponse> {
        let (Some(username), Some(password)) = (present(&request.username), present(&request.password))
        else {
            return Err(ProtocolError::invalid_request(
                "username and password are required for password grant",
            ));
        };

        let subject = self
            .verifier
            .verify(username, password)
            .await
            .map_err(|e| match e {
                IdentityError::InvalidCredentials => {
                    debug!(client_id = %client.client_id, "resource owner credentials rejected");
                    ProtocolError::invalid_grant()
                }
                other => {
                    error!(error = %other, "credential verification failed");
                    ProtocolError::server_error()
                }
            })?;

        if !subject.active {
            debug!(client_id = %client.client_id, "inactive resource owner");
            return Err(ProtocolError::invalid_grant());
        }

        let access_token = self.issuer.issue(&subject.id).await.map_err(|e| {
            error!(error = %e, "token issuance failed");
            ProtocolError::server_error()
        })?;

        info!(
            client_id = %client.client_id,
            subject_id = %subject.id,
            grant_type = GrantType::Password.as_str(),
            scope = request.scope.as_deref().unwrap_or(""),
            "issued access token"
        );

        Ok(TokenResponse {
            access_token,
            token_type: BEARER_TOKEN_TYPE,
            expires_in: self.issuer.lifetime_seconds(),
        })
    }
}
