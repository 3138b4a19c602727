use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindRequest {
    pub center_lat: f64,
    pub center_lng: f64,
    pub radius_km: f64,
    #[serde(default)]
    pub format: String,
    /// RFC 3339; absent or unparseable means "now".
    #[serde(default)]
    pub window_start: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub user_id: Uuid,
    pub elo: i32,
    pub meters: f64,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub court_id: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub start_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end_at: OffsetDateTime,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct FindResponse {
    pub candidates: Vec<Candidate>,
    pub suggestions: Vec<Suggestion>,
}
