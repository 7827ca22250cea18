use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        credentials::{from_headers, Scheme},
        dto::{LoginRequest, LoginResponse, TokenResponse},
    },
    error::Error,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/revoke", post(revoke))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, (StatusCode, String)> {
    let user = match state
        .users
        .authenticate(&payload.email, &payload.password)
        .await
    {
        Ok(u) => u,
        Err(Error::NotFound | Error::Authentication) => {
            warn!(email = %payload.email, "login rejected");
            return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
        }
        Err(e) => return Err(e.into()),
    };

    let token = state.keys.issue(user.id, payload.expires_in_seconds)?;
    let refresh_token = state.sessions.issue_for(user.id).await?;

    info!(user_id = user.id, "user logged in");
    Ok(Json(LoginResponse {
        id: user.id,
        email: user.email,
        is_chirpy_red: user.is_upgraded,
        token,
        refresh_token: refresh_token.token,
    }))
}

#[instrument(skip(state, headers))]
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, (StatusCode, String)> {
    let presented = from_headers(&headers, Scheme::Bearer)?;
    let token = state.sessions.renew(presented).await.map_err(|e| match e {
        Error::NotFound | Error::Expired => {
            warn!(error = %e, "refresh rejected");
            (
                StatusCode::UNAUTHORIZED,
                "Token doesn't exist or expired".to_string(),
            )
        }
        other => other.into(),
    })?;
    Ok(Json(TokenResponse { token }))
}

#[instrument(skip(state, headers))]
pub async fn revoke(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, (StatusCode, String)> {
    let presented = from_headers(&headers, Scheme::Bearer)?;
    state.sessions.revoke(presented).await?;
    Ok(StatusCode::NO_CONTENT)
}
