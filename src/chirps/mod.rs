mod dto;
pub mod handlers;
pub mod profanity;
pub mod repo_types;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::chirp_routes()
}
