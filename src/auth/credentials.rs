use axum::http::{header::AUTHORIZATION, HeaderMap};

use crate::error::{Error, Result};

/// Authorization schemes the service understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Bearer,
    ApiKey,
}

impl Scheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Bearer => "Bearer",
            Scheme::ApiKey => "ApiKey",
        }
    }
}

/// Pull the credential out of an `Authorization` value of the form `<scheme> <token>`.
pub fn extract_credential(header: Option<&str>, scheme: Scheme) -> Result<&str> {
    let value = match header {
        Some(v) if !v.trim().is_empty() => v,
        _ => return Err(Error::MissingCredential),
    };
    let (kind, token) = value.split_once(' ').ok_or(Error::MalformedCredential)?;
    if kind != scheme.as_str() {
        return Err(Error::MalformedCredential);
    }
    let token = token.trim();
    if token.is_empty() || token.contains(char::is_whitespace) {
        return Err(Error::MalformedCredential);
    }
    Ok(token)
}

pub fn from_headers(headers: &HeaderMap, scheme: Scheme) -> Result<&str> {
    let header = headers
        .get(AUTHORIZATION)
        .map(|v| v.to_str().map_err(|_| Error::MalformedCredential))
        .transpose()?;
    extract_credential(header, scheme)
}
