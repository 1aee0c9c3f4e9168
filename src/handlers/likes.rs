use actix_web::{web, HttpResponse};
use serde::Serialize;
use sqlx::PgPool;

use crate::db::{self, like_repo, post_repo};
use crate::error::AppError;
use crate::handlers::posts::parse_post_id;
use crate::middleware::AuthUser;

#[derive(Debug, Serialize)]
pub struct ToggleLikeResponse {
    pub msg: &'static str,
}

#[derive(Debug, Serialize)]
pub struct LikeCountResponse {
    pub total_likes: i64,
    pub likers: Vec<String>,
}

/// POST /posts/{post_id}/like
///
/// Creates the like when absent, removes it when present.
pub async fn toggle_like(
    pool: web::Data<PgPool>,
    user: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let post_id = parse_post_id(&path.into_inner())?;

    post_repo::find_by_id(&pool, post_id)
        .await?
        .ok_or_else(|| AppError::NotFound("post not found".to_string()))?;

    if like_repo::find_by_post_and_user(&pool, post_id, user.id)
        .await?
        .is_some()
    {
        like_repo::delete_like(&pool, post_id, user.id).await?;
        return Ok(HttpResponse::Ok().json(ToggleLikeResponse { msg: "unliked" }));
    }

    match like_repo::create_like(&pool, post_id, user.id).await {
        Ok(_) => Ok(HttpResponse::Ok().json(ToggleLikeResponse { msg: "liked" })),
        // Two concurrent toggles can both observe "absent"; the unique
        // constraint on (user, post) settles it.
        Err(e) if db::is_unique_violation(&e) => {
            Err(AppError::Conflict("already liked".to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /posts/{post_id}/likes-count
pub async fn likes_count(
    pool: web::Data<PgPool>,
    _user: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let post_id = parse_post_id(&path.into_inner())?;

    let (total_likes, likers) = tokio::try_join!(
        like_repo::count_by_post(&pool, post_id),
        like_repo::likers_by_post(&pool, post_id)
    )?;

    Ok(HttpResponse::Ok().json(LikeCountResponse {
        total_likes,
        likers,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_response_messages() {
        let liked = serde_json::to_value(ToggleLikeResponse { msg: "liked" }).unwrap();
        assert_eq!(liked["msg"], "liked");

        let unliked = serde_json::to_value(ToggleLikeResponse { msg: "unliked" }).unwrap();
        assert_eq!(unliked["msg"], "unliked");
    }

    #[test]
    fn test_like_count_shape() {
        let response = LikeCountResponse {
            total_likes: 2,
            likers: vec!["u1".to_string(), "u2".to_string()],
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["total_likes"], 2);
        assert_eq!(json["likers"].as_array().unwrap().len(), 2);
    }
}
