use std::time::Duration;

use rand::{rngs::OsRng, RngCore};
use time::{Duration as TimeDuration, OffsetDateTime};

use super::repo_types::RefreshToken;
use crate::error::{Error, Result};

/// 60 days.
pub const DEFAULT_REFRESH_TTL: Duration = Duration::from_secs(5_184_000);

pub fn generate_refresh_token(owner_id: u64, ttl: Duration) -> Result<RefreshToken> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| Error::Hashing(format!("random source: {e}")))?;
    let expires_at = TimeDuration::try_from(ttl)
        .ok()
        .and_then(|ttl| OffsetDateTime::now_utc().checked_add(ttl))
        .ok_or_else(|| Error::Hashing(format!("refresh lifetime out of range: {}s", ttl.as_secs())))?;
    Ok(RefreshToken {
        owner_id,
        token: hex::encode(bytes),
        expires_at,
    })
}
