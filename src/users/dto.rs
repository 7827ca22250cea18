use serde::{Deserialize, Serialize};

use super::repo_types::User;

/// Request body for registration and profile updates.
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: u64,
    pub email: String,
    pub is_chirpy_red: bool,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            is_chirpy_red: u.is_upgraded,
        }
    }
}

/// Payment provider webhook body.
#[derive(Debug, Deserialize)]
pub struct PolkaWebhook {
    pub event: String,
    pub data: PolkaWebhookData,
}

#[derive(Debug, Deserialize)]
pub struct PolkaWebhookData {
    pub user_id: u64,
}
