use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{instrument, warn};

use super::{
    dto::{CreateChirpRequest, ListQuery},
    repo_types::Chirp,
};
use crate::{auth::jwt::AuthUser, error::Error, state::AppState};

pub fn chirp_routes() -> Router<AppState> {
    Router::new()
        .route("/chirps", get(list_chirps).post(create_chirp))
        .route("/chirps/:id", get(get_chirp).delete(delete_chirp))
}

#[instrument(skip(state, payload))]
pub async fn create_chirp(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateChirpRequest>,
) -> Result<(StatusCode, Json<Chirp>), (StatusCode, String)> {
    let chirp = state
        .chirps
        .create(user_id, &payload.body)
        .await
        .map_err(|e| {
            if matches!(e, Error::BodyTooLong) {
                warn!(user_id, len = payload.body.chars().count(), "chirp too long");
            }
            e
        })?;
    Ok((StatusCode::CREATED, Json(chirp)))
}

#[instrument(skip(state))]
pub async fn list_chirps(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Vec<Chirp>>, (StatusCode, String)> {
    let chirps = state.chirps.list(q.author_id, q.sort).await?;
    Ok(Json(chirps))
}

#[instrument(skip(state))]
pub async fn get_chirp(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Chirp>, (StatusCode, String)> {
    Ok(Json(state.chirps.get(id).await?))
}

#[instrument(skip(state))]
pub async fn delete_chirp(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<u64>,
) -> Result<StatusCode, (StatusCode, String)> {
    state.chirps.delete(user_id, id).await.map_err(|e| {
        if matches!(e, Error::Forbidden) {
            warn!(user_id, chirp_id = id, "delete by non-author");
        }
        e
    })?;
    Ok(StatusCode::NO_CONTENT)
}
