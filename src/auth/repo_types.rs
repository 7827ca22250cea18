use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Refresh token record, stored keyed by `owner_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshToken {
    pub owner_id: u64,
    pub token: String, // 32 random bytes, hex
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl RefreshToken {
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }
}
