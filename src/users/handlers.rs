use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{request::Parts, StatusCode},
    routing::post,
    Json, Router,
};
use tracing::{debug, info, instrument, warn};

use super::dto::{CredentialsRequest, PolkaWebhook, PublicUser};
use crate::{
    auth::{
        credentials::{from_headers, Scheme},
        jwt::AuthUser,
    },
    state::AppState,
};

const UPGRADE_EVENT: &str = "user.upgraded";

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(create_user).put(update_user))
        .route("/polka/webhooks", post(polka_webhook))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<PublicUser>), (StatusCode, String)> {
    let user = state
        .users
        .create(&payload.email, &payload.password)
        .await
        .map_err(|e| {
            warn!(email = %payload.email, error = %e, "registration failed");
            e
        })?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Replace the caller's email and password. The upgrade flag is kept as is.
#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CredentialsRequest>,
) -> Result<Json<PublicUser>, (StatusCode, String)> {
    let user = state
        .users
        .update(user_id, &payload.email, &payload.password, None)
        .await?;
    Ok(Json(user.into()))
}

/// Payment provider caller, proven by `Authorization: ApiKey <POLKA_KEY>`.
/// Resolved from the headers, so it rejects before any body is read.
pub struct PolkaCaller;

#[async_trait]
impl FromRequestParts<AppState> for PolkaCaller {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let key = from_headers(&parts.headers, Scheme::ApiKey)?;
        if state.config.polka_key.is_empty() || key != state.config.polka_key {
            warn!("webhook with unknown api key");
            return Err((StatusCode::UNAUTHORIZED, "Unauthorized request".into()));
        }
        Ok(PolkaCaller)
    }
}

#[instrument(skip(state, _caller, payload))]
pub async fn polka_webhook(
    State(state): State<AppState>,
    _caller: PolkaCaller,
    Json(payload): Json<PolkaWebhook>,
) -> Result<StatusCode, (StatusCode, String)> {
    if payload.event != UPGRADE_EVENT {
        debug!(event = %payload.event, "ignoring webhook event");
        return Ok(StatusCode::NO_CONTENT);
    }

    state.users.upgrade(payload.data.user_id).await?;
    info!(user_id = payload.data.user_id, "upgrade webhook applied");
    Ok(StatusCode::NO_CONTENT)
}
