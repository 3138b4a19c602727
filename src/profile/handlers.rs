use axum::{extract::State, routing::get, Json, Router};
use tracing::instrument;

use super::{
    dto::{OkResponse, ProfileResponse, UpdateProfileRequest},
    services,
};
use crate::{auth::AuthUser, error::AppResult, extractors::ApiJson, state::AppState};

pub fn profile_routes() -> Router<AppState> {
    Router::new().route("/me/profile", get(get_profile).put(put_profile))
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<ProfileResponse>> {
    let profile = services::get_profile(&state.db, user_id).await?;
    Ok(Json(profile))
}

#[instrument(skip(state, payload))]
pub async fn put_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(payload): ApiJson<UpdateProfileRequest>,
) -> AppResult<Json<OkResponse>> {
    let changes = services::validate_update(payload)?;
    services::update_profile(&state.db, user_id, &changes).await?;
    Ok(Json(OkResponse { ok: true }))
}
