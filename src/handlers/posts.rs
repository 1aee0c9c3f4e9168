use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::db::{self, post_repo};
use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::models::Post;
use crate::services::slug;

const DEFAULT_LIMIT: i64 = 10;
const MAX_LIMIT: i64 = 100;
const MIN_SEARCH_LEN: usize = 3;

// ============================================
// Request/Response Structs
// ============================================

#[derive(Debug, Deserialize)]
pub struct ListPostsQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(length(min = 1))]
    pub title: String,

    pub content: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePostRequest {
    #[validate(length(min = 1))]
    pub title: String,

    pub content: String,
}

/// Paged list envelope. Clients depend on the list key being `item`,
/// singular.
#[derive(Debug, Serialize)]
pub struct PostListResponse {
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    #[serde(rename = "item")]
    pub items: Vec<Post>,
}

fn clamp_page(query: &ListPostsQuery) -> (i64, i64) {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = query.offset.unwrap_or(0).max(0);
    (limit, offset)
}

// ============================================
// Handler Functions
// ============================================

/// GET /posts/?limit&offset&search
pub async fn list_posts(
    pool: web::Data<PgPool>,
    _user: AuthUser,
    query: web::Query<ListPostsQuery>,
) -> Result<HttpResponse, AppError> {
    let (limit, offset) = clamp_page(&query);

    let search = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let (total, items) = match search {
        Some(term) => {
            if term.chars().count() < MIN_SEARCH_LEN {
                return Err(AppError::Validation(format!(
                    "search term must be at least {MIN_SEARCH_LEN} characters"
                )));
            }

            let total = post_repo::count_search(&pool, term).await?;
            if total == 0 {
                return Err(AppError::NotFound("no matching posts".to_string()));
            }

            let items = post_repo::search_posts(&pool, term, limit, offset).await?;
            (total, items)
        }
        None => {
            let total = post_repo::count_posts(&pool).await?;
            let items = post_repo::list_posts(&pool, limit, offset).await?;
            (total, items)
        }
    };

    Ok(HttpResponse::Ok().json(PostListResponse {
        total,
        limit,
        offset,
        items,
    }))
}

/// POST /posts/
pub async fn create_post(
    pool: web::Data<PgPool>,
    user: AuthUser,
    req: web::Json<CreatePostRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate()?;

    // Slug generation happens here, once, right before the first insert.
    let slug = slug::generate_unique_slug(&pool, &req.title).await?;

    match post_repo::create_post(&pool, user.id, &req.title, &req.content, &slug).await {
        Ok(post) => {
            tracing::info!(post_id = %post.id, slug = %post.slug, "post created");
            Ok(HttpResponse::Created().json(post))
        }
        // Two creations can race past the uniqueness check; the constraint
        // decides the loser.
        Err(e) if db::is_unique_violation(&e) => {
            Err(AppError::Conflict("slug already taken".to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /posts/{slug}
pub async fn get_post(
    pool: web::Data<PgPool>,
    _user: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let slug = path.into_inner();

    let post = post_repo::find_by_slug(&pool, &slug)
        .await?
        .ok_or_else(|| AppError::NotFound("post not found".to_string()))?;

    Ok(HttpResponse::Ok().json(post))
}

/// A non-UUID path segment can match no post, so it reports the same way a
/// missing one does.
pub(crate) fn parse_post_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound("post not found".to_string()))
}

/// PUT /posts/{id}
pub async fn update_post(
    pool: web::Data<PgPool>,
    user: AuthUser,
    path: web::Path<String>,
    req: web::Json<UpdatePostRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate()?;
    let post_id = parse_post_id(&path.into_inner())?;

    // Absence and ownership mismatch are indistinguishable on purpose.
    let affected = post_repo::update_post(&pool, post_id, user.id, &req.title, &req.content).await?;
    if affected == 0 {
        return Err(AppError::NotFound("post not found".to_string()));
    }

    Ok(HttpResponse::NoContent().finish())
}

/// PATCH /posts/{id}
///
/// Accepts the full update payload but applies only the publish flag; the
/// title/content fields are deliberately ignored.
pub async fn publish_post(
    pool: web::Data<PgPool>,
    user: AuthUser,
    path: web::Path<String>,
    _req: web::Json<UpdatePostRequest>,
) -> Result<HttpResponse, AppError> {
    let post_id = parse_post_id(&path.into_inner())?;

    let affected = post_repo::publish_post(&pool, post_id, user.id).await?;
    if affected == 0 {
        return Err(AppError::NotFound("post not found".to_string()));
    }

    Ok(HttpResponse::NoContent().finish())
}

/// DELETE /posts/{id}
pub async fn delete_post(
    pool: web::Data<PgPool>,
    user: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let post_id = parse_post_id(&path.into_inner())?;

    let affected = post_repo::delete_post(&pool, post_id, user.id).await?;
    if affected == 0 {
        return Err(AppError::NotFound("post not found".to_string()));
    }

    tracing::info!(post_id = %post_id, "post deleted");

    Ok(HttpResponse::NoContent().finish())
}
