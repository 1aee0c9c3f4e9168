/// User repository - database operations for user records
use crate::models::User;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

/// Create a new user. The caller provides the already-hashed password.
pub async fn create_user(
    pool: &PgPool,
    username: &str,
    email: &str,
    password_hash: &str,
) -> Result<User, sqlx::Error> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, username, email, password_hash, created_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, username, email, password_hash, created_at
        "#,
    )
    .bind(id)
    .bind(username)
    .bind(email.to_lowercase())
    .bind(password_hash)
    .bind(now)
    .fetch_one(pool)
    .await
}

/// Find a user by email
pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, email, password_hash, created_at
        FROM users
        WHERE email = $1
        "#,
    )
    .bind(email.to_lowercase())
    .fetch_optional(pool)
    .await
}

/// Find a user by ID
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, email, password_hash, created_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}
