use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub rate_limit: RateLimitConfig,
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_app_env")]
    pub env: String,

    #[serde(default = "default_app_host")]
    pub host: String,

    #[serde(default = "default_app_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    #[serde(default = "default_db_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,

    /// Access token lifetime in seconds.
    #[serde(default = "default_jwt_access_ttl")]
    pub access_token_ttl_secs: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Quota for login and registration routes.
    #[serde(default = "default_auth_requests_per_minute")]
    pub auth_requests_per_minute: u32,

    /// Quota for every other routed endpoint.
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            auth_requests_per_minute: default_auth_requests_per_minute(),
            requests_per_minute: default_requests_per_minute(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    /// Comma-separated list of allowed origins, or "*" to allow any.
    pub allowed_origins: String,

    #[serde(default = "default_cors_max_age")]
    pub max_age: u64,
}

// Default value functions
fn default_app_env() -> String {
    "development".to_string()
}

fn default_app_host() -> String {
    "0.0.0.0".to_string()
}

fn default_app_port() -> u16 {
    8080
}

fn default_db_max_connections() -> u32 {
    20
}

fn default_jwt_access_ttl() -> i64 {
    1800 // 30 minutes
}

fn default_auth_requests_per_minute() -> u32 {
    10
}

fn default_requests_per_minute() -> u32 {
    30
}

fn default_cors_max_age() -> u64 {
    3600
}

impl Config {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenv::dotenv().ok();

        let app = AppConfig {
            env: env::var("APP_ENV").unwrap_or_else(|_| default_app_env()),
            host: env::var("APP_HOST").unwrap_or_else(|_| default_app_host()),
            port: env::var("APP_PORT")
                .unwrap_or_else(|_| default_app_port().to_string())
                .parse()
                .unwrap_or(default_app_port()),
        };

        let database = DatabaseConfig {
            url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| default_db_max_connections().to_string())
                .parse()
                .unwrap_or(default_db_max_connections()),
        };

        let jwt = JwtConfig {
            secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            access_token_ttl_secs: env::var("JWT_ACCESS_TOKEN_TTL_SECS")
                .unwrap_or_else(|_| default_jwt_access_ttl().to_string())
                .parse()
                .unwrap_or(default_jwt_access_ttl()),
        };

        let rate_limit = RateLimitConfig {
            auth_requests_per_minute: env::var("RATE_LIMIT_AUTH_REQUESTS_PER_MINUTE")
                .unwrap_or_else(|_| default_auth_requests_per_minute().to_string())
                .parse()
                .unwrap_or(default_auth_requests_per_minute()),
            requests_per_minute: env::var("RATE_LIMIT_REQUESTS_PER_MINUTE")
                .unwrap_or_else(|_| default_requests_per_minute().to_string())
                .parse()
                .unwrap_or(default_requests_per_minute()),
        };

        let cors = CorsConfig {
            allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            max_age: env::var("CORS_MAX_AGE")
                .unwrap_or_else(|_| default_cors_max_age().to_string())
                .parse()
                .unwrap_or(default_cors_max_age()),
        };

        Ok(Config {
            app,
            database,
            jwt,
            rate_limit,
            cors,
        })
    }

    pub fn is_production(&self) -> bool {
        self.app.env == "production"
    }
}
