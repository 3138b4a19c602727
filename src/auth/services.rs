use anyhow::Context;
use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{LoginRequest, RegisterRequest},
        jwt::JwtKeys,
        password::{hash_password, verify_password, OAUTH_PASSWORD_SENTINEL},
        repo_types::User,
    },
    db::is_unique_violation,
    error::{AppError, AppResult},
    profile,
    state::AppState,
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Creates the user and its empty profile atomically.
async fn create_user_with_profile(
    db: &PgPool,
    email: &str,
    password_hash: &str,
) -> anyhow::Result<User> {
    let mut tx = db.begin().await.context("begin tx")?;
    let user = User::create(&mut *tx, email, password_hash).await?;
    profile::repo::create_empty(&mut *tx, user.id).await?;
    tx.commit().await.context("commit tx")?;
    Ok(user)
}

fn issue_token(state: &AppState, user_id: Uuid) -> AppResult<String> {
    JwtKeys::from_ref(state)
        .sign(user_id)
        .map_err(AppError::internal("failed to sign token"))
}

pub async fn register(state: &AppState, req: RegisterRequest) -> AppResult<String> {
    let email = normalize_email(&req.email);
    if email.is_empty() || req.password.is_empty() {
        return Err(AppError::invalid("email/password required"));
    }
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::invalid("invalid email"));
    }

    let password = req.password;
    let hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(AppError::internal("failed to hash password"))?
        .map_err(AppError::internal("failed to hash password"))?;

    let user = create_user_with_profile(&state.db, &email, &hash)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                warn!(email = %email, "email already registered");
                AppError::Conflict("email already in use".into())
            } else {
                AppError::internal("create user failed")(e)
            }
        })?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    issue_token(state, user.id)
}

pub async fn login(state: &AppState, req: LoginRequest) -> AppResult<String> {
    let email = normalize_email(&req.email);
    // Missing credentials are indistinguishable from wrong ones.
    if email.is_empty() || req.password.is_empty() {
        return Err(AppError::unauthorized("invalid credentials"));
    }

    let user = User::find_by_email(&state.db, &email)
        .await
        .map_err(AppError::internal("db error"))?
        .ok_or_else(|| {
            warn!(email = %email, "login unknown email");
            AppError::unauthorized("invalid credentials")
        })?;

    let password = req.password;
    let stored = user.password_hash.clone();
    let ok = tokio::task::spawn_blocking(move || verify_password(&password, &stored))
        .await
        .map_err(AppError::internal("verify password failed"))?
        .map_err(AppError::internal("verify password failed"))?;

    if !ok {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(AppError::unauthorized("invalid credentials"));
    }

    info!(user_id = %user.id, "user logged in");
    issue_token(state, user.id)
}

pub async fn google_login(state: &AppState, id_token: &str) -> AppResult<String> {
    let id_token = id_token.trim();
    if id_token.is_empty() {
        return Err(AppError::invalid("idToken required"));
    }
    let client_id = state.config.google_client_id.as_deref().ok_or_else(|| {
        tracing::error!("GOOGLE_CLIENT_ID is not set");
        AppError::Internal("google sign-in is not configured".into())
    })?;

    let verified = state
        .id_tokens
        .verify(id_token, client_id)
        .await
        .map_err(|e| {
            warn!(error = %e, "google id token rejected");
            AppError::unauthorized("invalid id_token")
        })?;
    let email = verified
        .email
        .as_deref()
        .map(normalize_email)
        .ok_or_else(|| AppError::unauthorized("email not present"))?;

    let existing = User::find_by_email(&state.db, &email)
        .await
        .map_err(AppError::internal("db error"))?;
    let user = match existing {
        Some(user) => user,
        None => match create_user_with_profile(&state.db, &email, OAUTH_PASSWORD_SENTINEL).await {
            Ok(user) => {
                info!(user_id = %user.id, sub = %verified.subject, "user created via google");
                user
            }
            // Lost a race with a concurrent sign-in for the same email.
            Err(e) if is_unique_violation(&e) => User::find_by_email(&state.db, &email)
                .await
                .map_err(AppError::internal("db error"))?
                .ok_or_else(|| AppError::Internal("create user failed".into()))?,
            Err(e) => return Err(AppError::internal("create user failed")(e)),
        },
    };

    issue_token(state, user.id)
}
