use serde_json::{Map, Value};
use sqlx::FromRow;

use super::dto::ProfileResponse;

/// `tennis_profile` joined with the user's home location.
#[derive(Debug, Clone, FromRow)]
pub struct ProfileRow {
    pub handedness: String,
    pub level_est: f64,
    pub elo: i32,
    pub preferred_formats: Vec<String>,
    pub radius_km: i32,
    pub availability: Option<Value>,
    pub home_lat: Option<f64>,
    pub home_lng: Option<f64>,
}

impl From<ProfileRow> for ProfileResponse {
    fn from(r: ProfileRow) -> Self {
        let availability = match r.availability {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        Self {
            handedness: r.handedness,
            level_est: r.level_est,
            elo: r.elo,
            preferred_formats: r.preferred_formats,
            radius_km: r.radius_km,
            availability,
            home_lat: r.home_lat,
            home_lng: r.home_lng,
        }
    }
}

/// A validated profile update, ready to persist.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileChanges {
    pub handedness: Option<String>,
    pub level_est: Option<f64>,
    pub elo: Option<i32>,
    pub preferred_formats: Option<Vec<String>>,
    pub radius_km: Option<i32>,
    pub availability: Option<Value>,
    pub home: Option<GeoPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(availability: Option<Value>) -> ProfileRow {
        ProfileRow {
            handedness: "L".into(),
            level_est: 3.5,
            elo: 1200,
            preferred_formats: vec!["SINGLES".into()],
            radius_km: 15,
            availability,
            home_lat: Some(47.6),
            home_lng: Some(-122.3),
        }
    }

    #[test]
    fn availability_defaults_to_empty_map() {
        let resp = ProfileResponse::from(row(None));
        assert!(resp.availability.is_empty());

        let resp = ProfileResponse::from(row(Some(json!(["mon", "tue"]))));
        assert!(resp.availability.is_empty());

        let resp = ProfileResponse::from(row(Some(json!({ "sat": { "am": true } }))));
        assert_eq!(resp.availability["sat"]["am"], json!(true));
    }

    #[test]
    fn response_uses_client_field_names() {
        let json = serde_json::to_value(ProfileResponse::from(row(None))).unwrap();
        assert_eq!(json["levelEst"], json!(3.5));
        assert_eq!(json["preferredFormats"], json!(["SINGLES"]));
        assert_eq!(json["radiusKm"], json!(15));
        assert_eq!(json["homeLat"], json!(47.6));
        assert_eq!(json["homeLng"], json!(-122.3));
    }

    #[test]
    fn geo_point_bounds_are_inclusive() {
        assert!(GeoPoint { lat: 90.0, lng: 180.0 }.is_valid());
        assert!(GeoPoint { lat: -90.0, lng: -180.0 }.is_valid());
        assert!(!GeoPoint { lat: 90.0001, lng: 0.0 }.is_valid());
        assert!(!GeoPoint { lat: 0.0, lng: -180.0001 }.is_valid());
    }
}
