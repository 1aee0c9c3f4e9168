/// Per-route request rate limiting.
///
/// The counting itself is delegated to `governor`; this module wires a keyed
/// limiter per route so that a quota is consumed per client + route pair. The
/// quotas come from configuration and are passed in at construction.
use actix_web::{
    body::{BoxBody, MessageBody},
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    error::ResponseError,
    Error,
};
use dashmap::DashMap;
use futures::future::LocalBoxFuture;
use governor::{
    clock::DefaultClock, state::keyed::DefaultKeyedStateStore, Quota,
    RateLimiter as KeyedRateLimiter,
};
use std::num::NonZeroU32;
use std::rc::Rc;
use std::sync::Arc;

use crate::config::RateLimitConfig;
use crate::error::AppError;

/// Route keys used when wiring middleware onto scopes. Login and registration
/// run on the stricter quota.
pub const ROUTE_AUTH_TOKEN: &str = "auth:token";
pub const ROUTE_USERS_REGISTER: &str = "users:register";
pub const ROUTE_USERS: &str = "users";
pub const ROUTE_POSTS: &str = "posts";

type ClientLimiter = KeyedRateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Shared counter keyed by client + route. One keyed governor limiter per
/// route, created lazily with that route's quota.
pub struct RateLimiter {
    config: RateLimitConfig,
    limiters: DashMap<&'static str, Arc<ClientLimiter>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            limiters: DashMap::new(),
        }
    }

    fn quota_for(&self, route_key: &str) -> u32 {
        match route_key {
            ROUTE_AUTH_TOKEN | ROUTE_USERS_REGISTER => self.config.auth_requests_per_minute,
            _ => self.config.requests_per_minute,
        }
    }

    /// Consume one unit of the client's quota for the route. Returns
    /// `Throttled` once the per-minute quota is exhausted; the window is
    /// governor's concern.
    pub fn check_and_consume(
        &self,
        client_key: &str,
        route_key: &'static str,
    ) -> Result<(), AppError> {
        let limiter = self
            .limiters
            .entry(route_key)
            .or_insert_with(|| {
                let per_minute =
                    NonZeroU32::new(self.quota_for(route_key)).unwrap_or(NonZeroU32::MIN);
                Arc::new(KeyedRateLimiter::keyed(Quota::per_minute(per_minute)))
            })
            .clone();

        limiter
            .check_key(&client_key.to_string())
            .map_err(|_| AppError::Throttled)
    }
}

/// Rate limiting middleware for a single route scope. Rejects with 429 before
/// the request reaches authentication or the handler.
#[derive(Clone)]
pub struct RateLimitMiddleware {
    limiter: Arc<RateLimiter>,
    route_key: &'static str,
}

impl RateLimitMiddleware {
    pub fn new(limiter: Arc<RateLimiter>, route_key: &'static str) -> Self {
        Self { limiter, route_key }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimitMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type InitError = ();
    type Transform = RateLimitMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(RateLimitMiddlewareService {
            service: Rc::new(service),
            limiter: self.limiter.clone(),
            route_key: self.route_key,
        }))
    }
}

pub struct RateLimitMiddlewareService<S> {
    service: Rc<S>,
    limiter: Arc<RateLimiter>,
    route_key: &'static str,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let limiter = self.limiter.clone();
        let route_key = self.route_key;

        // Call connection_info() once and drop the borrow before anything
        // else touches request extensions.
        let client_key = {
            let conn_info = req.connection_info();
            conn_info
                .realip_remote_addr()
                .and_then(|addr| addr.split(':').next())
                .unwrap_or("unknown")
                .to_string()
        };

        Box::pin(async move {
            match limiter.check_and_consume(&client_key, route_key) {
                Ok(()) => {
                    let res = service.call(req).await?;
                    Ok(res.map_into_boxed_body())
                }
                Err(e) => {
                    tracing::warn!(client = %client_key, route = route_key, "request throttled");
                    Ok(req.into_response(e.error_response().map_into_boxed_body()))
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(auth: u32, default: u32) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            auth_requests_per_minute: auth,
            requests_per_minute: default,
        })
    }

    #[test]
    fn test_quota_consumed_per_client_and_route() {
        let limiter = limiter(10, 2);

        assert!(limiter.check_and_consume("1.2.3.4", ROUTE_POSTS).is_ok());
        assert!(limiter.check_and_consume("1.2.3.4", ROUTE_POSTS).is_ok());
        assert!(limiter.check_and_consume("1.2.3.4", ROUTE_POSTS).is_err());

        // A different client on the same route is unaffected.
        assert!(limiter.check_and_consume("5.6.7.8", ROUTE_POSTS).is_ok());
        // The same client on a different route is unaffected.
        assert!(limiter.check_and_consume("1.2.3.4", ROUTE_USERS).is_ok());
    }

    #[test]
    fn test_auth_routes_use_strict_quota() {
        let limiter = limiter(1, 30);

        assert!(limiter.check_and_consume("1.2.3.4", ROUTE_AUTH_TOKEN).is_ok());
        assert!(limiter
            .check_and_consume("1.2.3.4", ROUTE_AUTH_TOKEN)
            .is_err());

        // Registration counts separately but on the same strict quota.
        assert!(limiter
            .check_and_consume("1.2.3.4", ROUTE_USERS_REGISTER)
            .is_ok());
        assert!(limiter
            .check_and_consume("1.2.3.4", ROUTE_USERS_REGISTER)
            .is_err());
    }

    #[test]
    fn test_excess_maps_to_throttled() {
        let limiter = limiter(10, 1);
        limiter.check_and_consume("1.2.3.4", ROUTE_POSTS).unwrap();
        let err = limiter
            .check_and_consume("1.2.3.4", ROUTE_POSTS)
            .unwrap_err();
        assert!(matches!(err, AppError::Throttled));
    }
}
