use serde::{Deserialize, Serialize};

/// Chirp record in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chirp {
    pub id: u64,
    pub author_id: u64,
    pub body: String,
}
