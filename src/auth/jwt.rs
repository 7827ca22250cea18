use std::time::Duration;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};

use super::credentials::{from_headers, Scheme};
use crate::{
    config::JwtConfig,
    error::{Error, Result},
};

/// Identity token payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user id, decimal
    pub iss: String,
    pub iat: usize,
    pub exp: usize,
}

/// HS256 signing material plus the issuer and default lifetime of identity tokens.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    default_ttl: Duration,
}

impl JwtKeys {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            default_ttl: Duration::from_secs(cfg.ttl_seconds),
        }
    }

    /// The requested lifetime when it is positive and no longer than the default.
    pub fn ttl_for(&self, requested_secs: Option<u64>) -> Duration {
        match requested_secs {
            Some(secs) if secs > 0 && secs <= self.default_ttl.as_secs() => {
                Duration::from_secs(secs)
            }
            _ => self.default_ttl,
        }
    }

    pub fn issue(&self, user_id: u64, ttl_secs: Option<u64>) -> Result<String> {
        let now = OffsetDateTime::now_utc();
        let ttl = self.ttl_for(ttl_secs);
        let exp = TimeDuration::try_from(ttl)
            .ok()
            .and_then(|ttl| now.checked_add(ttl))
            .ok_or_else(|| Error::Hashing(format!("token lifetime out of range: {}s", ttl.as_secs())))?;
        let claims = Claims {
            sub: user_id.to_string(),
            iss: self.issuer.clone(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
        };
        let token = self.sign(&claims)?;
        debug!(user_id, exp = claims.exp, "jwt signed");
        Ok(token)
    }

    fn sign(&self, claims: &Claims) -> Result<String> {
        encode(&Header::default(), claims, &self.encoding).map_err(|e| Error::Hashing(e.to_string()))
    }

    /// Verify `token` and return its subject claim.
    pub fn parse(&self, token: &str) -> Result<String> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature => Error::InvalidSignature,
                ErrorKind::ExpiredSignature => Error::Expired,
                ErrorKind::InvalidIssuer => Error::IssuerMismatch,
                _ => Error::MalformedCredential,
            }
        })?;
        debug!(sub = %data.claims.sub, "jwt verified");
        Ok(data.claims.sub)
    }

    pub fn user_id(&self, token: &str) -> Result<u64> {
        self.parse(token)?
            .parse::<u64>()
            .map_err(|_| Error::MalformedCredential)
    }
}

/// Authenticated caller, resolved from `Authorization: Bearer <jwt>`.
pub struct AuthUser(pub u64);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let token = from_headers(&parts.headers, Scheme::Bearer)?;
        match keys.user_id(token) {
            Ok(id) => Ok(AuthUser(id)),
            Err(e) => {
                warn!(error = %e, "rejected identity token");
                Err(e.into())
            }
        }
    }
}
