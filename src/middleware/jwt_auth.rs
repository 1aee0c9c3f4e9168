/// Bearer token authentication middleware.
/// Verifies the `Authorization: Bearer` token and adds the resolved identity
/// to request extensions.
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    Error, FromRequest, HttpMessage, HttpRequest,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use std::rc::Rc;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::AppError;
use crate::security::jwt::JwtService;

/// Identity resolved from a verified token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

/// JWT authentication middleware factory. The token service is injected at
/// construction; the middleware holds no global key state.
#[derive(Clone)]
pub struct JwtAuthMiddleware {
    jwt: Arc<JwtService>,
}

impl JwtAuthMiddleware {
    pub fn new(jwt: Arc<JwtService>) -> Self {
        Self { jwt }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtAuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtAuthMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(JwtAuthMiddlewareService {
            service: Rc::new(service),
            jwt: self.jwt.clone(),
        }))
    }
}

pub struct JwtAuthMiddlewareService<S> {
    service: Rc<S>,
    jwt: Arc<JwtService>,
}

impl<S, B> Service<ServiceRequest> for JwtAuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let jwt = self.jwt.clone();

        Box::pin(async move {
            // Extract all immutable data first; extensions_mut() below needs
            // no other borrows to be live.
            let auth_header = match req.headers().get("Authorization") {
                Some(header) => match header.to_str() {
                    Ok(h) => h.to_string(),
                    Err(_) => {
                        return Err(AppError::Unauthorized.into());
                    }
                },
                None => {
                    return Err(AppError::Unauthorized.into());
                }
            };

            let token = match auth_header.strip_prefix("Bearer ") {
                Some(t) => t,
                None => {
                    return Err(AppError::Unauthorized.into());
                }
            };

            let claims = match jwt.verify(token) {
                Ok(claims) => claims,
                Err(e) => {
                    tracing::debug!("token verification failed: {}", e);
                    return Err(AppError::Unauthorized.into());
                }
            };

            req.extensions_mut().insert(AuthUser {
                id: claims.id,
                email: claims.sub,
            });

            let res = service.call(req).await?;
            Ok(res)
        })
    }
}

impl FromRequest for AuthUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        match req.extensions().get::<AuthUser>().cloned() {
            Some(user) => ready(Ok(user)),
            None => ready(Err(AppError::Unauthorized.into())),
        }
    }
}
