use crate::auth::repo_types::User;
use sqlx::PgExecutor;

impl User {
    /// Find a user by email.
    pub async fn find_by_email<'e>(
        db: impl PgExecutor<'e>,
        email: &str,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT user_id AS id, email, password_hash, created_at
            FROM app_user
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Insert a new user. Fails with a unique violation when the email is taken.
    pub async fn create<'e>(
        db: impl PgExecutor<'e>,
        email: &str,
        password_hash: &str,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO app_user (email, password_hash)
            VALUES ($1, $2)
            RETURNING user_id AS id, email, password_hash, created_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(db)
        .await?;
        Ok(user)
    }
}
