//! `application/x-www-form-urlencoded` body normalization.

use std::collections::HashMap;

use crate::error::{ProtocolError, ProtocolResult};

/// Decoded form parameters. Every stored value is non-blank and every key
/// occurred exactly once in the body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormParams {
    params: HashMap<String, String>,
}

impl FormParams {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn into_inner(self) -> HashMap<String, String> {
        self.params
    }

    /// Parses a raw request body.
    pub fn from_bytes(body: &[u8]) -> ProtocolResult<Self> {
        let body = std::str::from_utf8(body)
            .map_err(|_| ProtocolError::invalid_request("request body is not valid UTF-8"))?;
        Self::parse(body)
    }

    pub fn parse(body: &str) -> ProtocolResult<Self> {
        let mut params = HashMap::new();

        for segment in body.split('&') {
            if segment.is_empty() {
                continue;
            }
            // A parameter without a value cannot be expressed at the token endpoint.
            let Some((raw_key, raw_value)) = segment.split_once('=') else {
                continue;
            };

            let key = decode_component(raw_key)?;
            if key.is_empty() {
                continue;
            }
            let value = decode_component(raw_value)?;
            if value.trim().is_empty() {
                continue;
            }

            if params.contains_key(&key) {
                return Err(ProtocolError::invalid_request(format!(
                    "duplicate parameter: {key}"
                )));
            }
            params.insert(key, value);
        }

        Ok(Self { params })
    }
}

fn decode_component(raw: &str) -> ProtocolResult<String> {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let well_formed = bytes.get(i + 1).is_some_and(u8::is_ascii_hexdigit)
                && bytes.get(i + 2).is_some_and(u8::is_ascii_hexdigit);
            if !well_formed {
                return Err(ProtocolError::invalid_request(
                    "malformed percent-encoding in request body",
                ));
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .map_err(|_| ProtocolError::invalid_request("request body is not valid UTF-8"))
}
