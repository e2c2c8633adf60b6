//! OAuth2 token endpoint for the resource owner password grant.
//!
//! A request flows through [`FormParams`] (body normalization),
//! [`ClientIdentity`] (client credential resolution) and [`TokenEndpoint`]
//! (ordered validation and grant dispatch). Every failure is a
//! [`ProtocolError`], which renders itself as an RFC 6749 error response.
//!
//! Resource owners and tokens are handled by the collaborators from
//! `grantd-identity-core`; registered clients come from a [`ClientRegistry`].

mod client;
mod client_auth;
mod error;
mod form;
mod grant;
mod router;

pub use client::{ClientRegistry, RegisteredClient, StaticClientRegistry};
pub use client_auth::{ClientAuthMethod, ClientIdentity};
pub use error::{ErrorBody, ErrorCode, ProtocolError, ProtocolResult};
pub use form::FormParams;
pub use grant::{BEARER_TOKEN_TYPE, GrantType, TokenEndpoint, TokenRequest, TokenResponse};
pub use router::{TOKEN_PATH, token_router};

pub use grantd_identity_core::{CredentialVerifier, TokenIssuer};
