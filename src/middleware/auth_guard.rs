/// Authentication guard middleware
///
/// Validates the access credential carried by a request and injects its
/// claims into request extensions for use by route handlers. The credential
/// may arrive in the `access_token` cookie or an `Authorization: Bearer`
/// header; the cookie wins when both are present.
///
/// Every denial, whatever its cause, produces the same 401 body. The actual
/// reason (absent, unverifiable, revoked) is only logged.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::auth::{validate_access_token, RevocationRegistry};
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};
use crate::routes::auth::ACCESS_TOKEN_COOKIE;

/// Guard for routes that require authentication.
pub struct AuthGuard {
    jwt_config: JwtSettings,
    revocations: RevocationRegistry,
}

impl AuthGuard {
    pub fn new(jwt_config: JwtSettings, revocations: RevocationRegistry) -> Self {
        Self {
            jwt_config,
            revocations,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthGuardService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(AuthGuardService {
            service: Rc::new(service),
            jwt_config: self.jwt_config.clone(),
            revocations: self.revocations.clone(),
        }))
    }
}

pub struct AuthGuardService<S> {
    service: Rc<S>,
    jwt_config: JwtSettings,
    revocations: RevocationRegistry,
}

impl<S, B> Service<ServiceRequest> for AuthGuardService<S>
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
        let token = req
            .cookie(ACCESS_TOKEN_COOKIE)
            .map(|c| c.value().to_string())
            .or_else(|| bearer_token(&req));

        let jwt_config = self.jwt_config.clone();
        let revocations = self.revocations.clone();
        let service = self.service.clone();

        Box::pin(async move {
            let token = match token {
                Some(token) => token,
                None => {
                    tracing::warn!("Request carried no access credential");
                    return Err(AppError::Auth(AuthError::MissingToken).into());
                }
            };

            let claims = match validate_access_token(&token, &jwt_config) {
                Ok(claims) => claims,
                Err(e) => {
                    tracing::warn!("Access credential rejected: {}", e);
                    return Err(AppError::Auth(AuthError::TokenInvalid).into());
                }
            };

            // A credential that verifies cryptographically may still carry a
            // live tombstone (logout, detected reuse).
            if revocations.is_revoked(&token).await {
                tracing::warn!(user_id = %claims.sub, "Revoked access credential presented");
                return Err(AppError::Auth(AuthError::TokenInvalid).into());
            }

            req.extensions_mut().insert(claims.clone());

            tracing::debug!(
                user_id = %claims.sub,
                email = %claims.email,
                "Access credential accepted"
            );

            service.call(req).await
        })
    }
}

/// Extract a bearer token from the Authorization header.
fn bearer_token(req: &ServiceRequest) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|token| token.to_string())
}
