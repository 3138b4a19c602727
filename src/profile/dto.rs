use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub handedness: String,
    pub level_est: f64,
    pub elo: i32,
    pub preferred_formats: Vec<String>,
    pub radius_km: i32,
    pub availability: Map<String, Value>,
    pub home_lat: Option<f64>,
    pub home_lng: Option<f64>,
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub handedness: Option<String>,
    pub level_est: Option<f64>,
    pub elo: Option<i64>,
    pub preferred_formats: Option<Vec<String>>,
    pub radius_km: Option<i64>,
    pub availability: Option<Map<String, Value>>,
    pub home_lat: Option<f64>,
    pub home_lng: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}
