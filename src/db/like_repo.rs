/// Like repository
use crate::models::Like;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

/// Insert a like. A duplicate (user, post) pair violates the unique
/// constraint and surfaces as a database error for the caller to map.
pub async fn create_like(pool: &PgPool, post_id: Uuid, user_id: Uuid) -> Result<Like, sqlx::Error> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query_as::<_, Like>(
        r#"
        INSERT INTO likes (id, user_id, post_id, created_at)
        VALUES ($1, $2, $3, $4)
        RETURNING id, user_id, post_id, created_at
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(post_id)
    .bind(now)
    .fetch_one(pool)
    .await
}

/// Delete a user's like on a post. Returns the number of rows removed.
pub async fn delete_like(pool: &PgPool, post_id: Uuid, user_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM likes WHERE post_id = $1 AND user_id = $2")
        .bind(post_id)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

pub async fn find_by_post_and_user(
    pool: &PgPool,
    post_id: Uuid,
    user_id: Uuid,
) -> Result<Option<Like>, sqlx::Error> {
    sqlx::query_as::<_, Like>(
        r#"
        SELECT id, user_id, post_id, created_at
        FROM likes
        WHERE post_id = $1 AND user_id = $2
        "#,
    )
    .bind(post_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub async fn count_by_post(pool: &PgPool, post_id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM likes WHERE post_id = $1")
        .bind(post_id)
        .fetch_one(pool)
        .await
}

/// Usernames of everyone who liked the post, most recent first.
pub async fn likers_by_post(pool: &PgPool, post_id: Uuid) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        r#"
        SELECT u.username
        FROM likes l
        JOIN users u ON u.id = l.user_id
        WHERE l.post_id = $1
        ORDER BY l.created_at DESC
        "#,
    )
    .bind(post_id)
    .fetch_all(pool)
    .await
}
