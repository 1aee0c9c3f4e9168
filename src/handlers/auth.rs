use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;

use crate::db::user_repo;
use crate::error::AppError;
use crate::security::{jwt::JwtService, password};

/// OAuth2-style password form; the `username` field carries the email.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

/// POST /auth/token
///
/// A missing user and a wrong password both answer "invalid credentials".
pub async fn login_access_token(
    pool: web::Data<PgPool>,
    jwt: web::Data<Arc<JwtService>>,
    form: web::Form<LoginForm>,
) -> Result<HttpResponse, AppError> {
    let user = user_repo::find_by_email(&pool, &form.username)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    password::verify_password(&form.password, &user.password_hash)
        .map_err(|_| AppError::InvalidCredentials)?;

    let token = jwt.issue(&user.email, user.id)?;

    tracing::debug!(user_id = %user.id, "login succeeded");

    Ok(HttpResponse::Ok().json(TokenResponse {
        access_token: token,
        token_type: "bearer".to_string(),
    }))
}
