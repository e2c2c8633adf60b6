//! Resolves client credentials from exactly one channel.

use base64::{Engine, engine::general_purpose::STANDARD};

use crate::error::{ProtocolError, ProtocolResult};
use crate::form::FormParams;

const BASIC_PREFIX: &str = "Basic ";

/// Where the client credentials were read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientAuthMethod {
    /// `Authorization: Basic` header (`client_secret_basic`).
    Basic,
    /// `client_id`/`client_secret` form fields (`client_secret_post`).
    Post,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    pub id: Option<String>,
    pub secret: Option<String>,
    pub method: ClientAuthMethod,
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty()).map(str::to_string)
}

impl ClientIdentity {
    /// Resolves the client from the `Authorization` header or the form body.
    ///
    /// Supplying both is rejected even when they name the same client.
    pub fn resolve(authorization: Option<&str>, form: &FormParams) -> ProtocolResult<Self> {
        let basic = authorization.and_then(|value| value.strip_prefix(BASIC_PREFIX));
        let has_body_credentials = form.contains("client_id") || form.contains("client_secret");

        match basic {
            Some(_) if has_body_credentials => Err(ProtocolError::invalid_request(
                "multiple client authentication methods used",
            )),
            Some(encoded) => Self::from_basic(encoded),
            None if has_body_credentials => Ok(Self {
                id: non_blank(form.get("client_id")),
                secret: form.get("client_secret").map(str::to_string),
                method: ClientAuthMethod::Post,
            }),
            None => Ok(Self {
                id: None,
                secret: None,
                method: ClientAuthMethod::None,
            }),
        }
    }

    fn from_basic(encoded: &str) -> ProtocolResult<Self> {
        let malformed = || ProtocolError::invalid_client("malformed basic credentials");

        let decoded = STANDARD.decode(encoded.trim()).map_err(|_| malformed())?;
        let decoded = String::from_utf8(decoded).map_err(|_| malformed())?;

        let (id, secret) = decoded.split_once(':').unwrap_or((decoded.as_str(), ""));

        Ok(Self {
            id: non_blank(Some(id)),
            secret: Some(secret.to_string()),
            method: ClientAuthMethod::Basic,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn basic(credentials: &str) -> String {
        format!("Basic {}", STANDARD.encode(credentials))
    }

    #[test]
    fn test_basic_header() {
        let form = FormParams::parse("grant_type=password").unwrap();
        let client = ClientIdentity::resolve(Some(basic("todo-web:todo-secret").as_str()), &form).unwrap();

        assert_eq!(client.id.as_deref(), Some("todo-web"));
        assert_eq!(client.secret.as_deref(), Some("todo-secret"));
        assert_eq!(client.method, ClientAuthMethod::Basic);
    }

    #[test]
    fn test_basic_splits_on_first_colon() {
        let form = FormParams::default();
        let client = ClientIdentity::resolve(Some(basic("app:sec:ret").as_str()), &form).unwrap();
        assert_eq!(client.id.as_deref(), Some("app"));
        assert_eq!(client.secret.as_deref(), Some("sec:ret"));

        let client = ClientIdentity::resolve(Some(basic("app:").as_str()), &form).unwrap();
        assert_eq!(client.secret.as_deref(), Some(""));

        let client = ClientIdentity::resolve(Some(basic("app").as_str()), &form).unwrap();
        assert_eq!(client.id.as_deref(), Some("app"));
        assert_eq!(client.secret.as_deref(), Some(""));

        let client = ClientIdentity::resolve(Some(basic(":secret").as_str()), &form).unwrap();
        assert_eq!(client.id, None);
    }

    #[test]
    fn test_body_credentials() {
        let form = FormParams::parse("client_id=todo-web&client_secret=todo-secret").unwrap();
        let client = ClientIdentity::resolve(None, &form).unwrap();

        assert_eq!(client.id.as_deref(), Some("todo-web"));
        assert_eq!(client.secret.as_deref(), Some("todo-secret"));
        assert_eq!(client.method, ClientAuthMethod::Post);

        let form = FormParams::parse("client_secret=only").unwrap();
        let client = ClientIdentity::resolve(None, &form).unwrap();
        assert_eq!(client.id, None);
        assert_eq!(client.method, ClientAuthMethod::Post);
    }

    #[test]
    fn test_no_credentials() {
        let form = FormParams::parse("grant_type=password").unwrap();
        let client = ClientIdentity::resolve(None, &form).unwrap();
        assert_eq!(client.id, None);
        assert_eq!(client.secret, None);
        assert_eq!(client.method, ClientAuthMethod::None);

        // Other schemes are not client authentication.
        let client = ClientIdentity::resolve(Some("Bearer abc"), &form).unwrap();
        assert_eq!(client.method, ClientAuthMethod::None);
    }

    #[test]
    fn test_both_channels_rejected() {
        let header = basic("todo-web:todo-secret");

        for body in ["client_id=todo-web", "client_secret=todo-secret"] {
            let form = FormParams::parse(body).unwrap();
            let err = ClientIdentity::resolve(Some(header.as_str()), &form).unwrap_err();
            assert_eq!(err.code, ErrorCode::InvalidRequest);
        }
    }

    #[test]
    fn test_malformed_basic_rejected() {
        let form = FormParams::default();
        let err = ClientIdentity::resolve(Some("Basic !!!not-base64"), &form).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidClient);

        let invalid_utf8 = format!("Basic {}", STANDARD.encode([0xff, 0xfe, b':']));
        let err = ClientIdentity::resolve(Some(invalid_utf8.as_str()), &form).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidClient);
    }
}
