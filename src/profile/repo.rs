use anyhow::Context;
use sqlx::{PgConnection, PgExecutor};
use uuid::Uuid;

use super::repo_types::{GeoPoint, ProfileChanges, ProfileRow};

pub const HOME_LABEL: &str = "home";

/// Insert the default profile row for a freshly created user.
pub async fn create_empty<'e>(db: impl PgExecutor<'e>, user_id: Uuid) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO tennis_profile (user_id)
        VALUES ($1)
        ON CONFLICT (user_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .execute(db)
    .await
    .context("insert empty profile")?;
    Ok(())
}

pub async fn fetch<'e>(db: impl PgExecutor<'e>, user_id: Uuid) -> anyhow::Result<Option<ProfileRow>> {
    let row = sqlx::query_as::<_, ProfileRow>(
        r#"
        SELECT tp.handedness, tp.level_est, tp.elo, tp.preferred_formats, tp.radius_km,
               tp.availability,
               ST_Y(ul.geom::geometry) AS home_lat,
               ST_X(ul.geom::geometry) AS home_lng
          FROM tennis_profile tp
          LEFT JOIN user_locations ul
                 ON ul.user_id = tp.user_id
                AND ul.label = $2
         WHERE tp.user_id = $1
        "#,
    )
    .bind(user_id)
    .bind(HOME_LABEL)
    .fetch_optional(db)
    .await
    .context("fetch profile")?;
    Ok(row)
}

/// Apply the non-empty fields of `changes`. Returns false when the profile row is missing.
pub async fn update(
    conn: &mut PgConnection,
    user_id: Uuid,
    changes: &ProfileChanges,
) -> anyhow::Result<bool> {
    let res = sqlx::query(
        r#"
        UPDATE tennis_profile
           SET handedness        = COALESCE($2, handedness),
               level_est         = COALESCE($3, level_est),
               elo               = COALESCE($4, elo),
               preferred_formats = COALESCE($5, preferred_formats),
               radius_km         = COALESCE($6, radius_km),
               availability      = COALESCE($7, availability),
               updated_at        = now()
         WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .bind(changes.handedness.as_deref())
    .bind(changes.level_est)
    .bind(changes.elo)
    .bind(changes.preferred_formats.clone())
    .bind(changes.radius_km)
    .bind(changes.availability.clone())
    .execute(&mut *conn)
    .await
    .context("update profile")?;
    Ok(res.rows_affected() > 0)
}

/// Insert or overwrite the labelled location of a user.
pub async fn upsert_location(
    conn: &mut PgConnection,
    user_id: Uuid,
    label: &str,
    point: GeoPoint,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO user_locations (user_id, label, geom)
        VALUES ($1, $2, ST_SetSRID(ST_MakePoint($3, $4), 4326)::geography)
        ON CONFLICT (user_id, label)
        DO UPDATE SET geom = EXCLUDED.geom, updated_at = now()
        "#,
    )
    .bind(user_id)
    .bind(label)
    .bind(point.lng)
    .bind(point.lat)
    .execute(&mut *conn)
    .await
    .context("upsert location")?;
    Ok(())
}
