pub mod jwt_auth;
pub mod rate_limit;

pub use jwt_auth::{AuthUser, JwtAuthMiddleware};
pub use rate_limit::{RateLimitMiddleware, RateLimiter};
