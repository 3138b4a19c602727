//! Candidate search: request validation, the rating/distance score and the
//! placeholder time-slot suggestions.

use sqlx::PgPool;
use time::{format_description::well_known::Rfc3339, Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use super::{
    dto::{Candidate, FindRequest, FindResponse, Suggestion},
    repo,
};
use crate::{
    error::{AppError, AppResult},
    profile::repo_types::GeoPoint,
};

pub const MAX_RADIUS_KM: f64 = 100.0;
pub const DEFAULT_LIMIT: i64 = 50;
pub const MAX_LIMIT: i64 = 100;

const RATING_WEIGHT: f64 = 0.6;
const DISTANCE_WEIGHT: f64 = 0.4;
/// Rating points that cost as much as one unit of score.
const RATING_SCALE: f64 = 50.0;
const METERS_PER_KM: f64 = 1000.0;

/// Venue placeholder until courts are modelled.
const PLACEHOLDER_COURT_ID: i32 = 1;

/// A validated search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchArea {
    pub center: GeoPoint,
    pub radius_km: f64,
    pub format: String,
    pub window_start: OffsetDateTime,
    pub limit: i64,
}

/// Validates `req` completely; `now` stands in for a missing or unparseable window start.
pub fn validate(req: FindRequest, now: OffsetDateTime) -> AppResult<SearchArea> {
    if !(-90.0..=90.0).contains(&req.center_lat) {
        return Err(AppError::invalid("centerLat out of range"));
    }
    if !(-180.0..=180.0).contains(&req.center_lng) {
        return Err(AppError::invalid("centerLng out of range"));
    }
    if !(req.radius_km > 0.0 && req.radius_km <= MAX_RADIUS_KM) {
        return Err(AppError::invalid("radiusKm out of range (0,100]"));
    }
    let format = req.format.trim();
    if format.is_empty() {
        return Err(AppError::invalid("format required"));
    }

    let window_start = req
        .window_start
        .as_deref()
        .and_then(|s| OffsetDateTime::parse(s.trim(), &Rfc3339).ok())
        .unwrap_or(now);

    Ok(SearchArea {
        center: GeoPoint {
            lat: req.center_lat,
            lng: req.center_lng,
        },
        radius_km: req.radius_km,
        format: format.to_string(),
        window_start,
        limit: effective_limit(req.limit),
    })
}

/// Missing, non-positive or above `MAX_LIMIT` falls back to `DEFAULT_LIMIT`.
pub fn effective_limit(limit: Option<i64>) -> i64 {
    match limit {
        Some(l) if l > 0 && l <= MAX_LIMIT => l,
        _ => DEFAULT_LIMIT,
    }
}

/// Higher is better; 0 for an equally rated player at the same spot, negative otherwise.
pub fn score(my_elo: i32, their_elo: i32, meters: f64) -> f64 {
    let gap = (i64::from(their_elo) - i64::from(my_elo)).abs() as f64;
    let level = -gap / RATING_SCALE;
    let geo = -meters.max(0.0) / METERS_PER_KM;
    RATING_WEIGHT * level + DISTANCE_WEIGHT * geo
}

/// Two fixed one-hour slots after `window_start`; not derived from anyone's availability.
pub fn suggestions(window_start: OffsetDateTime) -> Vec<Suggestion> {
    let slot = |offset_hours: i64, message: &str| Suggestion {
        court_id: PLACEHOLDER_COURT_ID,
        start_at: window_start + Duration::hours(offset_hours),
        end_at: window_start + Duration::hours(offset_hours + 1),
        message: message.to_string(),
    };
    vec![
        slot(2, "How about a hit at the city park hard courts?"),
        slot(26, "Same time tomorrow works too."),
    ]
}

/// Candidates keep the datastore order (nearest first); the score is informational.
pub async fn find_candidates(
    db: &PgPool,
    requester: Uuid,
    area: &SearchArea,
) -> AppResult<FindResponse> {
    let my_elo = repo::fetch_rating(db, requester)
        .await
        .map_err(AppError::internal("fetch my elo failed"))?
        .ok_or_else(|| {
            tracing::error!(user_id = %requester, "requester has no profile");
            AppError::Internal("fetch my elo failed".into())
        })?;

    let rows = repo::nearby_candidates(db, requester, area)
        .await
        .map_err(AppError::internal("query failed"))?;

    let candidates: Vec<Candidate> = rows
        .into_iter()
        .map(|r| Candidate {
            user_id: r.user_id,
            elo: r.elo,
            meters: r.meters,
            score: score(my_elo, r.elo, r.meters),
        })
        .collect();
    debug!(user_id = %requester, found = candidates.len(), "candidates ranked");

    Ok(FindResponse {
        candidates,
        suggestions: suggestions(area.window_start),
    })
}
