/// Comment repository
use crate::models::Comment;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

pub async fn create_comment(
    pool: &PgPool,
    post_id: Uuid,
    user_id: Uuid,
    content: &str,
) -> Result<Comment, sqlx::Error> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query_as::<_, Comment>(
        r#"
        INSERT INTO comments (id, content, created_at, user_id, post_id)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, content, created_at, user_id, post_id
        "#,
    )
    .bind(id)
    .bind(content)
    .bind(now)
    .bind(user_id)
    .bind(post_id)
    .fetch_one(pool)
    .await
}

pub async fn list_by_post(pool: &PgPool, post_id: Uuid) -> Result<Vec<Comment>, sqlx::Error> {
    sqlx::query_as::<_, Comment>(
        r#"
        SELECT id, content, created_at, user_id, post_id
        FROM comments
        WHERE post_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(post_id)
    .fetch_all(pool)
    .await
}
