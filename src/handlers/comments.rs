use actix_web::{web, HttpResponse};
use serde::Deserialize;
use sqlx::PgPool;
use validator::Validate;

use crate::db::{self, comment_repo};
use crate::error::AppError;
use crate::handlers::posts::parse_post_id;
use crate::middleware::AuthUser;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, max = 5000))]
    pub content: String,
}

/// POST /posts/{post_id}/comments
///
/// There is no handler-level existence check on the post; the schema's
/// foreign key rejects orphan comments and that rejection reads as 404.
pub async fn add_comment(
    pool: web::Data<PgPool>,
    user: AuthUser,
    path: web::Path<String>,
    req: web::Json<CreateCommentRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate()?;
    let post_id = parse_post_id(&path.into_inner())?;

    match comment_repo::create_comment(&pool, post_id, user.id, &req.content).await {
        Ok(comment) => {
            tracing::debug!(comment_id = %comment.id, post_id = %post_id, "comment added");
            Ok(HttpResponse::Created().finish())
        }
        Err(e) if db::is_foreign_key_violation(&e) => {
            Err(AppError::NotFound("post not found".to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /posts/{post_id}/comments
pub async fn list_comments(
    pool: web::Data<PgPool>,
    _user: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let post_id = parse_post_id(&path.into_inner())?;
    let comments = comment_repo::list_by_post(&pool, post_id).await?;
    Ok(HttpResponse::Ok().json(comments))
}
