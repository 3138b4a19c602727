use axum::{extract::State, routing::post, Json, Router};
use tracing::instrument;

use crate::{
    auth::{
        dto::{GoogleLoginRequest, LoginRequest, RegisterRequest, TokenResponse},
        services,
    },
    error::AppResult,
    extractors::ApiJson,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/google", post(google_login))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> AppResult<Json<TokenResponse>> {
    let token = services::register(&state, payload).await?;
    Ok(Json(TokenResponse { token }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let token = services::login(&state, payload).await?;
    Ok(Json(TokenResponse { token }))
}

#[instrument(skip(state, payload))]
pub async fn google_login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<GoogleLoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let token = services::google_login(&state, &payload.id_token).await?;
    Ok(Json(TokenResponse { token }))
}
