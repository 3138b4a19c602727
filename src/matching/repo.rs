use anyhow::Context;
use sqlx::{FromRow, PgPool};
use tracing::warn;
use uuid::Uuid;

use super::services::SearchArea;
use crate::profile::repo::HOME_LABEL;

#[derive(Debug, Clone, FromRow)]
pub struct CandidateRow {
    pub user_id: Uuid,
    pub elo: i32,
    pub meters: f64,
}

pub async fn fetch_rating(db: &PgPool, user_id: Uuid) -> anyhow::Result<Option<i32>> {
    let elo = sqlx::query_scalar::<_, i32>(
        r#"SELECT elo FROM tennis_profile WHERE user_id = $1"#,
    )
    .bind(user_id)
    .fetch_optional(db)
    .await
    .context("fetch rating")?;
    Ok(elo)
}

/// Other users whose home lies within the search radius (geodesic) and who
/// play `format`, nearest first. Rows that fail to decode are skipped.
pub async fn nearby_candidates(
    db: &PgPool,
    requester: Uuid,
    area: &SearchArea,
) -> anyhow::Result<Vec<CandidateRow>> {
    let rows = sqlx::query(
        r#"
        SELECT u.user_id, tp.elo,
               ST_Distance(ul.geom, ST_SetSRID(ST_MakePoint($1, $2), 4326)::geography) AS meters
          FROM app_user u
          JOIN tennis_profile tp ON tp.user_id = u.user_id
          JOIN user_locations ul ON ul.user_id = u.user_id AND ul.label = $3
         WHERE u.user_id <> $4
           AND ST_DWithin(ul.geom, ST_SetSRID(ST_MakePoint($1, $2), 4326)::geography, $5 * 1000.0)
           AND $6 = ANY(tp.preferred_formats)
         ORDER BY meters ASC
         LIMIT $7
        "#,
    )
    .bind(area.center.lng)
    .bind(area.center.lat)
    .bind(HOME_LABEL)
    .bind(requester)
    .bind(area.radius_km)
    .bind(&area.format)
    .bind(area.limit)
    .fetch_all(db)
    .await
    .context("query candidates")?;

    let candidates = rows
        .iter()
        .filter_map(|row| match CandidateRow::from_row(row) {
            Ok(c) => Some(c),
            Err(e) => {
                warn!(error = %e, "dropping undecodable candidate row");
                None
            }
        })
        .collect();
    Ok(candidates)
}
