use serde::Deserialize;

use super::services::SortOrder;

#[derive(Debug, Deserialize)]
pub struct CreateChirpRequest {
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub author_id: Option<u64>,
    #[serde(default)]
    pub sort: SortOrder,
}
