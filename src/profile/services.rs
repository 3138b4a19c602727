use anyhow::Context;
use serde_json::Value;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::{
    dto::{ProfileResponse, UpdateProfileRequest},
    repo::{self, HOME_LABEL},
    repo_types::{GeoPoint, ProfileChanges},
};
use crate::error::{AppError, AppResult};

pub async fn get_profile(db: &PgPool, user_id: Uuid) -> AppResult<ProfileResponse> {
    repo::fetch(db, user_id)
        .await
        .map_err(AppError::internal("fetch profile failed"))?
        .map(ProfileResponse::from)
        .ok_or_else(|| AppError::NotFound("profile not found".into()))
}

/// Checks every field of an update. Nothing is written unless this succeeds.
pub fn validate_update(req: UpdateProfileRequest) -> AppResult<ProfileChanges> {
    let handedness = match req.handedness {
        Some(h) if !matches!(h.as_str(), "" | "L" | "R") => {
            return Err(AppError::invalid("handedness must be R or L"));
        }
        other => other,
    };

    if let Some(level) = req.level_est {
        if !level.is_finite() || level < 0.0 {
            return Err(AppError::invalid("levelEst must be >= 0"));
        }
    }

    let elo = req
        .elo
        .map(|elo| {
            i32::try_from(elo)
                .ok()
                .filter(|e| *e >= 0)
                .ok_or_else(|| AppError::invalid("elo must be >= 0"))
        })
        .transpose()?;

    let radius_km = req
        .radius_km
        .map(|r| {
            i32::try_from(r)
                .ok()
                .filter(|r| *r >= 0)
                .ok_or_else(|| AppError::invalid("radius must be >= 0"))
        })
        .transpose()?;

    let preferred_formats = req
        .preferred_formats
        .map(|formats| {
            formats
                .into_iter()
                .map(|f| {
                    let f = f.trim().to_string();
                    if f.is_empty() {
                        Err(AppError::invalid("preferredFormats entries must be non-empty"))
                    } else {
                        Ok(f)
                    }
                })
                .collect::<AppResult<Vec<_>>>()
        })
        .transpose()?;

    let home = match (req.home_lat, req.home_lng) {
        (Some(lat), Some(lng)) => {
            let point = GeoPoint { lat, lng };
            if !point.is_valid() {
                return Err(AppError::invalid("invalid home location"));
            }
            Some(point)
        }
        _ => None,
    };

    Ok(ProfileChanges {
        handedness,
        level_est: req.level_est,
        elo,
        preferred_formats,
        radius_km,
        availability: req.availability.map(Value::Object),
        home,
    })
}

async fn persist(db: &PgPool, user_id: Uuid, changes: &ProfileChanges) -> anyhow::Result<bool> {
    let mut tx = db.begin().await.context("begin tx")?;
    if !repo::update(&mut tx, user_id, changes).await? {
        return Ok(false);
    }
    if let Some(home) = changes.home {
        repo::upsert_location(&mut tx, user_id, HOME_LABEL, home).await?;
    }
    tx.commit().await.context("commit tx")?;
    Ok(true)
}

/// Persists the profile fields and, when given, overwrites the home location in one transaction.
pub async fn update_profile(
    db: &PgPool,
    user_id: Uuid,
    changes: &ProfileChanges,
) -> AppResult<()> {
    let found = persist(db, user_id, changes)
        .await
        .map_err(AppError::internal("update profile failed"))?;
    if !found {
        return Err(AppError::NotFound("profile not found".into()));
    }
    info!(user_id = %user_id, home = changes.home.is_some(), "profile updated");
    Ok(())
}
