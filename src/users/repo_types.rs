use serde::{Deserialize, Serialize};

/// User record in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub email: String,
    pub password_hash: String, // argon2 PHC string, never sent to clients
    pub is_upgraded: bool,     // Chirpy Red
}
