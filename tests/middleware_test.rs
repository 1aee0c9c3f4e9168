//! Middleware behaviour against a full actix App: token resolution on
//! protected routes and per-route quota enforcement. No database is needed
//! for these paths.

use actix_web::{http::StatusCode, test, web, App, HttpResponse};
use std::sync::Arc;
use uuid::Uuid;

use blog_service::config::RateLimitConfig;
use blog_service::middleware::{
    rate_limit::ROUTE_POSTS, AuthUser, JwtAuthMiddleware, RateLimitMiddleware, RateLimiter,
};
use blog_service::security::jwt::JwtService;

async fn whoami(user: AuthUser) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "id": user.id,
        "email": user.email,
    }))
}

fn jwt_service() -> Arc<JwtService> {
    Arc::new(JwtService::new("test-secret", 1800))
}

#[actix_web::test]
async fn missing_token_is_unauthorized() {
    let app = test::init_service(
        App::new().service(
            web::resource("/whoami")
                .wrap(JwtAuthMiddleware::new(jwt_service()))
                .route(web::get().to(whoami)),
        ),
    )
    .await;

    let req = test::TestRequest::get().uri("/whoami").to_request();
    let status = match test::try_call_service(&app, req).await {
        Ok(resp) => resp.status(),
        Err(e) => e.as_response_error().status_code(),
    };
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn malformed_token_is_unauthorized() {
    let app = test::init_service(
        App::new().service(
            web::resource("/whoami")
                .wrap(JwtAuthMiddleware::new(jwt_service()))
                .route(web::get().to(whoami)),
        ),
    )
    .await;

    for header in [
        "Bearer not.a.token",
        "Basic dXNlcjpwYXNz",
        "Bearer ",
    ] {
        let req = test::TestRequest::get()
            .uri("/whoami")
            .insert_header(("Authorization", header))
            .to_request();
        let status = match test::try_call_service(&app, req).await {
            Ok(resp) => resp.status(),
            Err(e) => e.as_response_error().status_code(),
        };
        assert_eq!(status, StatusCode::UNAUTHORIZED, "header: {header}");
    }
}

#[actix_web::test]
async fn valid_token_resolves_identity() {
    let jwt = jwt_service();
    let user_id = Uuid::new_v4();
    let token = jwt.issue("test@example.com", user_id).unwrap();

    let app = test::init_service(
        App::new().service(
            web::resource("/whoami")
                .wrap(JwtAuthMiddleware::new(jwt.clone()))
                .route(web::get().to(whoami)),
        ),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/whoami")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["email"], "test@example.com");
    assert_eq!(body["id"], user_id.to_string());
}

#[actix_web::test]
async fn expired_token_is_unauthorized() {
    let expired_issuer = JwtService::new("test-secret", -60);
    let token = expired_issuer
        .issue("test@example.com", Uuid::new_v4())
        .unwrap();

    let app = test::init_service(
        App::new().service(
            web::resource("/whoami")
                .wrap(JwtAuthMiddleware::new(jwt_service()))
                .route(web::get().to(whoami)),
        ),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/whoami")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .to_request();
    let status = match test::try_call_service(&app, req).await {
        Ok(resp) => resp.status(),
        Err(e) => e.as_response_error().status_code(),
    };
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn quota_exhaustion_returns_throttled() {
    let limiter = Arc::new(RateLimiter::new(RateLimitConfig {
        auth_requests_per_minute: 10,
        requests_per_minute: 2,
    }));

    let app = test::init_service(
        App::new().service(
            web::resource("/limited")
                .wrap(RateLimitMiddleware::new(limiter, ROUTE_POSTS))
                .route(web::get().to(|| async { HttpResponse::Ok().finish() })),
        ),
    )
    .await;

    let peer = "1.2.3.4:40000".parse().unwrap();
    for _ in 0..2 {
        let req = test::TestRequest::get()
            .uri("/limited")
            .peer_addr(peer)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    // Only the excess request is rejected.
    let req = test::TestRequest::get()
        .uri("/limited")
        .peer_addr(peer)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(resp.headers().contains_key("Retry-After"));

    // Another client still has its own quota.
    let req = test::TestRequest::get()
        .uri("/limited")
        .peer_addr("5.6.7.8:40000".parse().unwrap())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn throttle_applies_before_authentication() {
    let limiter = Arc::new(RateLimiter::new(RateLimitConfig {
        auth_requests_per_minute: 10,
        requests_per_minute: 2,
    }));

    let app = test::init_service(
        App::new().service(
            web::resource("/whoami")
                .wrap(JwtAuthMiddleware::new(jwt_service()))
                .wrap(RateLimitMiddleware::new(limiter, ROUTE_POSTS))
                .route(web::get().to(whoami)),
        ),
    )
    .await;

    let peer = "1.2.3.4:40000".parse().unwrap();

    // Within quota the request reaches authentication and fails there.
    for _ in 0..2 {
        let req = test::TestRequest::get()
            .uri("/whoami")
            .peer_addr(peer)
            .to_request();
        let status = match test::try_call_service(&app, req).await {
            Ok(resp) => resp.status(),
            Err(e) => e.as_response_error().status_code(),
        };
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    // Past the quota the limiter answers first; the gateway never runs.
    let req = test::TestRequest::get()
        .uri("/whoami")
        .peer_addr(peer)
        .to_request();
    let status = match test::try_call_service(&app, req).await {
        Ok(resp) => resp.status(),
        Err(e) => e.as_response_error().status_code(),
    };
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}
