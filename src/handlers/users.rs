use actix_web::{web, HttpResponse};
use serde::Deserialize;
use sqlx::PgPool;
use validator::Validate;

use crate::db::{self, post_repo, user_repo};
use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::models::UserResponse;
use crate::security::password;

/// Registration payload. The field names are part of the wire format.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[serde(rename = "userName")]
    #[validate(length(min = 3, max = 50))]
    pub username: String,

    #[serde(rename = "Email")]
    #[validate(email)]
    pub email: String,

    #[serde(rename = "Password")]
    #[validate(length(min = 8))]
    pub password: String,
}

/// POST /users/
pub async fn create_user(
    pool: web::Data<PgPool>,
    req: web::Json<CreateUserRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate()?;

    let password_hash = password::hash_password(&req.password)?;

    match user_repo::create_user(&pool, &req.username, &req.email, &password_hash).await {
        Ok(user) => {
            tracing::info!(user_id = %user.id, "user registered");
            Ok(HttpResponse::Created().finish())
        }
        Err(e) if db::is_unique_violation(&e) => Err(AppError::Conflict(
            "username or email already taken".to_string(),
        )),
        Err(e) => Err(e.into()),
    }
}

/// GET /users/get
pub async fn get_user(
    pool: web::Data<PgPool>,
    user: AuthUser,
) -> Result<HttpResponse, AppError> {
    let user = user_repo::find_by_id(&pool, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("user not found".to_string()))?;

    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

/// GET /users/posts
pub async fn get_user_posts(
    pool: web::Data<PgPool>,
    user: AuthUser,
) -> Result<HttpResponse, AppError> {
    let user = user_repo::find_by_id(&pool, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("user not found".to_string()))?;

    let posts = post_repo::list_by_author(&pool, user.id).await?;

    Ok(HttpResponse::Ok().json(posts))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(username: &str, email: &str, password: &str) -> CreateUserRequest {
        CreateUserRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_register_payload_field_aliases() {
        let req: CreateUserRequest = serde_json::from_str(
            r#"{"userName":"newuser","Email":"new@example.com","Password":"newpassword"}"#,
        )
        .unwrap();
        assert_eq!(req.username, "newuser");
        assert_eq!(req.email, "new@example.com");
        assert_eq!(req.password, "newpassword");
    }

    #[test]
    fn test_valid_request_passes_validation() {
        assert!(request("newuser", "new@example.com", "newpassword")
            .validate()
            .is_ok());
    }

    #[test]
    fn test_invalid_email_rejected() {
        assert!(request("newuser", "not-an-email", "newpassword")
            .validate()
            .is_err());
    }

    #[test]
    fn test_short_username_rejected() {
        assert!(request("ab", "new@example.com", "newpassword")
            .validate()
            .is_err());
    }

    #[test]
    fn test_short_password_rejected() {
        assert!(request("newuser", "new@example.com", "short")
            .validate()
            .is_err());
    }
}
