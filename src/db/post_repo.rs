/// Post repository - database operations for posts, including slug lookups,
/// pagination, substring search, and ownership-scoped mutations.
use crate::models::Post;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

const POST_COLUMNS: &str =
    "id, title, content, slug, is_published, created_at, updated_at, author_id";

/// Insert a new post with an already-generated slug.
pub async fn create_post(
    pool: &PgPool,
    author_id: Uuid,
    title: &str,
    content: &str,
    slug: &str,
) -> Result<Post, sqlx::Error> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query_as::<_, Post>(
        r#"
        INSERT INTO posts (id, title, content, slug, is_published, created_at, author_id)
        VALUES ($1, $2, $3, $4, FALSE, $5, $6)
        RETURNING id, title, content, slug, is_published, created_at, updated_at, author_id
        "#,
    )
    .bind(id)
    .bind(title)
    .bind(content)
    .bind(slug)
    .bind(now)
    .bind(author_id)
    .fetch_one(pool)
    .await
}

/// Check whether a slug is already taken.
pub async fn slug_exists(pool: &PgPool, slug: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM posts WHERE slug = $1)")
        .bind(slug)
        .fetch_one(pool)
        .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Post>, sqlx::Error> {
    sqlx::query_as::<_, Post>(&format!(
        "SELECT {POST_COLUMNS} FROM posts WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn find_by_slug(pool: &PgPool, slug: &str) -> Result<Option<Post>, sqlx::Error> {
    sqlx::query_as::<_, Post>(&format!(
        "SELECT {POST_COLUMNS} FROM posts WHERE slug = $1"
    ))
    .bind(slug)
    .fetch_optional(pool)
    .await
}

pub async fn count_posts(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM posts")
        .fetch_one(pool)
        .await
}

pub async fn list_posts(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<Post>, sqlx::Error> {
    sqlx::query_as::<_, Post>(&format!(
        r#"
        SELECT {POST_COLUMNS}
        FROM posts
        ORDER BY created_at DESC
        LIMIT $1 OFFSET $2
        "#
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

/// Count posts whose title or content contains the term, case-insensitively.
pub async fn count_search(pool: &PgPool, term: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM posts
        WHERE title ILIKE '%' || $1 || '%' OR content ILIKE '%' || $1 || '%'
        "#,
    )
    .bind(term)
    .fetch_one(pool)
    .await
}

pub async fn search_posts(
    pool: &PgPool,
    term: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<Post>, sqlx::Error> {
    sqlx::query_as::<_, Post>(&format!(
        r#"
        SELECT {POST_COLUMNS}
        FROM posts
        WHERE title ILIKE '%' || $1 || '%' OR content ILIKE '%' || $1 || '%'
        ORDER BY created_at DESC
        LIMIT $2 OFFSET $3
        "#
    ))
    .bind(term)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub async fn list_by_author(pool: &PgPool, author_id: Uuid) -> Result<Vec<Post>, sqlx::Error> {
    sqlx::query_as::<_, Post>(&format!(
        r#"
        SELECT {POST_COLUMNS}
        FROM posts
        WHERE author_id = $1
        ORDER BY created_at DESC
        "#
    ))
    .bind(author_id)
    .fetch_all(pool)
    .await
}

/// Update title and content, but only when the author matches. Returns the
/// number of affected rows; 0 covers both a missing post and a non-owner.
pub async fn update_post(
    pool: &PgPool,
    id: Uuid,
    author_id: Uuid,
    title: &str,
    content: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE posts
        SET title = $1, content = $2, updated_at = $3
        WHERE id = $4 AND author_id = $5
        "#,
    )
    .bind(title)
    .bind(content)
    .bind(Utc::now())
    .bind(id)
    .bind(author_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Flip the publish flag under the same ownership rule as `update_post`.
pub async fn publish_post(pool: &PgPool, id: Uuid, author_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE posts
        SET is_published = TRUE, updated_at = $1
        WHERE id = $2 AND author_id = $3
        "#,
    )
    .bind(Utc::now())
    .bind(id)
    .bind(author_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Delete a post owned by the author; comments and likes go with it via the
/// schema's cascade rules.
pub async fn delete_post(pool: &PgPool, id: Uuid, author_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM posts WHERE id = $1 AND author_id = $2")
        .bind(id)
        .bind(author_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
