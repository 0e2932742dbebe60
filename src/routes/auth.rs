/// Authentication Routes
///
/// Handles registration, password login, federated signin, refresh credential
/// rotation, logout, and current user information.
///
/// Issued credentials travel both ways at once: in the JSON body for
/// programmatic callers and as HttpOnly cookies for browsers. Rotation reads
/// the refresh credential from its cookie only.

use actix_web::{
    cookie::{time::Duration, Cookie, SameSite},
    web, HttpRequest, HttpResponse,
};
use serde::{Deserialize, Serialize};

use crate::auth::{Claims, RotationCoordinator, TokenPair};
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError, ErrorContext};
use crate::users::UserDirectory;

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

/// User registration request
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// User login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Federated signin request carrying an identity asserted by an upstream
/// provider (the provider handshake itself happens elsewhere).
#[derive(Deserialize)]
pub struct FederatedRequest {
    pub email: String,
    pub name: String,
}

/// Authentication response with access and refresh tokens
#[derive(Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// User information response
#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    pub is_admin: bool,
}

/// POST /auth/register
///
/// Register a new user with email, password, and name.
/// Establishes a session and returns both credentials on success.
///
/// # Errors
/// - 400: Validation errors (invalid email/password/name)
/// - 409: Email already registered (duplicate)
/// - 503: Session record could not be written
pub async fn register(
    form: web::Json<RegisterRequest>,
    directory: web::Data<UserDirectory>,
    coordinator: web::Data<RotationCoordinator>,
    jwt_config: web::Data<JwtSettings>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_registration");

    let user = directory.register(&form.email, &form.password, &form.name)?;
    let pair = coordinator
        .establish(&user.id, &user.name, &user.email, user.is_admin)
        .await?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user.id,
        "User registered successfully"
    );

    Ok(granted(HttpResponse::Created(), pair, jwt_config.get_ref()))
}

/// POST /auth/login
///
/// Authenticate with email and password. Establishes a fresh session,
/// unconditionally replacing any previous one for the same account.
///
/// # Errors
/// - 400: Validation error (invalid email format)
/// - 401: Invalid credentials (email not found or wrong password)
/// - 503: Session record could not be written
///
/// # Security Notes
/// - Uses the same error for "not found" and "wrong password"
/// - Prevents user enumeration attacks
pub async fn login(
    form: web::Json<LoginRequest>,
    directory: web::Data<UserDirectory>,
    coordinator: web::Data<RotationCoordinator>,
    jwt_config: web::Data<JwtSettings>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_login");

    let user = directory.verify_credentials(&form.email, &form.password)?;
    let pair = coordinator
        .establish(&user.id, &user.name, &user.email, user.is_admin)
        .await?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user.id,
        "User logged in successfully"
    );

    Ok(granted(HttpResponse::Ok(), pair, jwt_config.get_ref()))
}

/// POST /auth/federated
///
/// Sign in with an identity asserted by an upstream provider, creating the
/// account on first contact. Session establishment is identical to login.
pub async fn federated_signin(
    form: web::Json<FederatedRequest>,
    directory: web::Data<UserDirectory>,
    coordinator: web::Data<RotationCoordinator>,
    jwt_config: web::Data<JwtSettings>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("federated_signin");

    let user = directory.find_or_create_federated(&form.email, &form.name)?;
    let pair = coordinator
        .establish(&user.id, &user.name, &user.email, user.is_admin)
        .await?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user.id,
        "Federated signin completed"
    );

    Ok(granted(HttpResponse::Ok(), pair, jwt_config.get_ref()))
}

/// POST /auth/refresh
///
/// Exchange the refresh credential in the `refresh_token` cookie for a new
/// pair. The presented credential must be the current one for its principal;
/// a superseded credential invalidates the whole session line.
///
/// # Errors
/// - 401: Cookie absent, credential unverifiable, or credential superseded.
///   The three are indistinguishable in the response.
/// - 503: The session store could not confirm the rotation
pub async fn refresh(
    req: HttpRequest,
    coordinator: web::Data<RotationCoordinator>,
    jwt_config: web::Data<JwtSettings>,
) -> Result<HttpResponse, AppError> {
    let presented = req
        .cookie(REFRESH_TOKEN_COOKIE)
        .ok_or(AppError::Auth(AuthError::MissingToken))?;

    let pair = coordinator.rotate(presented.value()).await?;

    Ok(granted(HttpResponse::Ok(), pair, jwt_config.get_ref()))
}

/// POST /auth/logout
///
/// Revoke whatever credentials the request carries, clear the session
/// record, and expire both cookies. Always answers 200: an expired or
/// garbled credential needs no revocation, and a store outage here is
/// logged rather than surfaced.
pub async fn logout(
    req: HttpRequest,
    coordinator: web::Data<RotationCoordinator>,
) -> Result<HttpResponse, AppError> {
    let access = req
        .cookie(ACCESS_TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .or_else(|| bearer_token(&req));
    let refresh = req.cookie(REFRESH_TOKEN_COOKIE).map(|c| c.value().to_string());

    coordinator
        .terminate(access.as_deref(), refresh.as_deref())
        .await;

    Ok(HttpResponse::Ok()
        .cookie(expired_cookie(ACCESS_TOKEN_COOKIE))
        .cookie(expired_cookie(REFRESH_TOKEN_COOKIE))
        .json(serde_json::json!({ "message": "Signed out" })))
}

/// GET /api/me
///
/// Current authenticated user, read from the claims the guard injected.
///
/// # Errors
/// - 401: Missing, invalid, or revoked token (handled by middleware)
pub async fn get_current_user(claims: web::ReqData<Claims>) -> Result<HttpResponse, AppError> {
    let user_id = claims.user_id()?;

    Ok(HttpResponse::Ok().json(UserResponse {
        id: user_id.to_string(),
        email: claims.email.clone(),
        name: claims.name.clone(),
        is_admin: claims.admin,
    }))
}

/// Build the success response for a freshly issued pair: tokens in the JSON
/// body and in HttpOnly cookies whose lifetimes follow the token expiries.
fn granted(
    mut builder: actix_web::HttpResponseBuilder,
    pair: TokenPair,
    jwt_config: &JwtSettings,
) -> HttpResponse {
    builder
        .cookie(credential_cookie(
            ACCESS_TOKEN_COOKIE,
            &pair.access,
            jwt_config.access_token_expiry,
        ))
        .cookie(credential_cookie(
            REFRESH_TOKEN_COOKIE,
            &pair.refresh,
            jwt_config.refresh_token_expiry,
        ))
        .json(AuthResponse {
            access_token: pair.access,
            refresh_token: pair.refresh,
            token_type: "Bearer".to_string(),
            expires_in: jwt_config.access_token_expiry,
        })
}

fn credential_cookie(name: &'static str, value: &str, max_age_seconds: i64) -> Cookie<'static> {
    Cookie::build(name, value.to_string())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .max_age(Duration::seconds(max_age_seconds))
        .finish()
}

fn expired_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build(name, "")
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .max_age(Duration::ZERO)
        .finish()
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|token| token.to_string())
}
