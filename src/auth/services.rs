use std::{sync::Arc, time::Duration};

use time::OffsetDateTime;
use tracing::{debug, info};

use super::{jwt::JwtKeys, refresh::generate_refresh_token, repo_types::RefreshToken};
use crate::{
    error::{Error, Result},
    store::Store,
};

/// Refresh-token lifecycle: issue at login, renew into identity tokens, revoke.
#[derive(Clone)]
pub struct RefreshTokenService {
    store: Arc<Store>,
    keys: JwtKeys,
    ttl: Duration,
}

impl RefreshTokenService {
    pub fn new(store: Arc<Store>, keys: JwtKeys, ttl: Duration) -> Self {
        Self { store, keys, ttl }
    }

    /// Store a fresh token for `user_id`. A user holds one token at a time;
    /// issuing again replaces the previous one.
    pub async fn issue_for(&self, user_id: u64) -> Result<RefreshToken> {
        let token = generate_refresh_token(user_id, self.ttl)?;
        let stored = token.clone();
        let replaced = self
            .store
            .mutate(move |doc| Ok(doc.refresh_tokens.insert(user_id, stored).is_some()))
            .await?;
        info!(user_id, replaced, "refresh token issued");
        Ok(token)
    }

    /// Trade a live refresh token for a new identity token with the default lifetime.
    pub async fn renew(&self, presented: &str) -> Result<String> {
        let doc = self.store.load().await?;
        let stored = doc
            .refresh_tokens
            .values()
            .find(|t| t.token == presented)
            .ok_or(Error::NotFound)?;
        if stored.is_expired_at(OffsetDateTime::now_utc()) {
            debug!(user_id = stored.owner_id, "refresh token expired");
            return Err(Error::Expired);
        }
        self.keys.issue(stored.owner_id, None)
    }

    /// Removing a token that is not stored is not an error.
    pub async fn revoke(&self, presented: &str) -> Result<()> {
        let presented = presented.to_owned();
        let removed = self
            .store
            .mutate(move |doc| {
                let before = doc.refresh_tokens.len();
                doc.refresh_tokens.retain(|_, t| t.token != presented);
                Ok(before - doc.refresh_tokens.len())
            })
            .await?;
        if removed > 0 {
            info!(removed, "refresh token revoked");
        } else {
            debug!("revoke of unknown refresh token");
        }
        Ok(())
    }
}
