use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::io;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use blog_service::{
    config::Config,
    db::{create_pool, run_migrations},
    handlers,
    middleware::{
        rate_limit::{ROUTE_AUTH_TOKEN, ROUTE_POSTS, ROUTE_USERS, ROUTE_USERS_REGISTER},
        JwtAuthMiddleware, RateLimitMiddleware, RateLimiter,
    },
    security::jwt::JwtService,
};

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().expect("Failed to load configuration");

    tracing::info!("Starting blog-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.app.env);

    // Create database connection pool
    let db_pool = create_pool(&config.database.url, config.database.max_connections)
        .await
        .expect("Failed to create database pool");

    tracing::info!(
        "Database pool created with {} max connections",
        config.database.max_connections
    );

    // Run migrations in non-production unless explicitly skipped
    let run_migrations_env = std::env::var("RUN_MIGRATIONS").unwrap_or_else(|_| "true".into());
    if !config.is_production() && run_migrations_env != "false" {
        tracing::info!("Running database migrations...");
        run_migrations(&db_pool)
            .await
            .expect("Failed to run database migrations");
        tracing::info!("Database migrations completed");
    } else {
        tracing::info!(
            "Skipping database migrations (RUN_MIGRATIONS={})",
            run_migrations_env
        );
    }

    // Token service and rate limiter are built from explicit configuration;
    // neither holds process-global state.
    let jwt_service = Arc::new(JwtService::new(
        &config.jwt.secret,
        config.jwt.access_token_ttl_secs,
    ));
    let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));
    tracing::info!(
        "Rate limiter initialized: {}/min auth, {}/min default",
        config.rate_limit.auth_requests_per_minute,
        config.rate_limit.requests_per_minute
    );

    let server_config = config.clone();
    let bind_address = format!("{}:{}", config.app.host, config.app.port);

    tracing::info!("Starting HTTP server at {}", bind_address);

    let server = HttpServer::new(move || {
        let jwt_service = jwt_service.clone();
        let rate_limiter = rate_limiter.clone();

        // Build CORS configuration from allowed_origins
        let mut cors = Cors::default();
        for origin in server_config.cors.allowed_origins.split(',') {
            let origin = origin.trim();
            if origin == "*" {
                cors = cors.allow_any_origin();
            } else if !origin.is_empty() {
                cors = cors.allowed_origin(origin);
            }
        }
        cors = cors
            .allow_any_method()
            .allow_any_header()
            .max_age(server_config.cors.max_age as usize);

        App::new()
            .app_data(web::Data::new(db_pool.clone()))
            .app_data(web::Data::new(jwt_service.clone()))
            .wrap(cors)
            .wrap(Logger::default())
            .wrap(tracing_actix_web::TracingLogger::default())
            .route("/", web::get().to(handlers::health_check))
            .service(
                web::scope("/auth")
                    .wrap(RateLimitMiddleware::new(rate_limiter.clone(), ROUTE_AUTH_TOKEN))
                    .route("/token", web::post().to(handlers::login_access_token)),
            )
            // Registration is unauthenticated and on the strict quota. It must
            // be registered before the authenticated /users scope.
            .service(
                web::resource("/users/")
                    .wrap(RateLimitMiddleware::new(
                        rate_limiter.clone(),
                        ROUTE_USERS_REGISTER,
                    ))
                    .route(web::post().to(handlers::create_user)),
            )
            .service(
                web::scope("/users")
                    // The rate limiter is wrapped last so it runs before
                    // authentication: a throttled request never reaches the
                    // token check.
                    .wrap(JwtAuthMiddleware::new(jwt_service.clone()))
                    .wrap(RateLimitMiddleware::new(rate_limiter.clone(), ROUTE_USERS))
                    .route("/get", web::get().to(handlers::get_user))
                    .route("/posts", web::get().to(handlers::get_user_posts)),
            )
            // The like toggle carries no rate limit, only authentication.
            .service(
                web::resource("/posts/{post_id}/like")
                    .wrap(JwtAuthMiddleware::new(jwt_service.clone()))
                    .route(web::post().to(handlers::toggle_like)),
            )
            .service(
                web::scope("/posts")
                    .wrap(JwtAuthMiddleware::new(jwt_service.clone()))
                    .wrap(RateLimitMiddleware::new(rate_limiter.clone(), ROUTE_POSTS))
                    .service(
                        web::resource("/")
                            .route(web::get().to(handlers::list_posts))
                            .route(web::post().to(handlers::create_post)),
                    )
                    .service(
                        web::resource("/{post_id}/comments")
                            .route(web::post().to(handlers::add_comment))
                            .route(web::get().to(handlers::list_comments)),
                    )
                    .route(
                        "/{post_id}/likes-count",
                        web::get().to(handlers::likes_count),
                    )
                    .service(
                        web::resource("/{slug}")
                            .route(web::get().to(handlers::get_post))
                            .route(web::put().to(handlers::update_post))
                            .route(web::patch().to(handlers::publish_post))
                            .route(web::delete().to(handlers::delete_post)),
                    ),
            )
    })
    .bind(&bind_address)?
    .run();

    server.await
}
