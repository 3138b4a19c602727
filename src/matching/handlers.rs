use axum::{extract::State, routing::post, Json, Router};
use time::OffsetDateTime;
use tracing::instrument;

use super::{
    dto::{FindRequest, FindResponse},
    services,
};
use crate::{auth::AuthUser, error::AppResult, extractors::ApiJson, state::AppState};

pub fn match_routes() -> Router<AppState> {
    Router::new().route("/match/find", post(find))
}

#[instrument(skip(state, payload))]
pub async fn find(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(payload): ApiJson<FindRequest>,
) -> AppResult<Json<FindResponse>> {
    let area = services::validate(payload, OffsetDateTime::now_utc())?;
    let resp = services::find_candidates(&state.db, user_id, &area).await?;
    Ok(Json(resp))
}
