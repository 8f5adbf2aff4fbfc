//! Authentication middleware
//!
//! Extractors that resolve either a Bearer access token (mobile client) or
//! the session cookie (web portal) to the same authenticated principal.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::{
    extract::CookieJar,
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::jwt::{get_user_id_from_claims, role_from_str};
use crate::auth::{verify_token, AuthService};
use crate::models::UserRole;

/// Name of the session cookie set by the login endpoint
pub const SESSION_COOKIE: &str = "gramloan_session";

/// Authenticated user resolved from a token or session cookie
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub username: String,
    pub role: UserRole,
    pub jti: String,
}

/// Error response for authentication failures
#[derive(Debug, Serialize)]
struct AuthRejection {
    error: AuthRejectionDetails,
}

#[derive(Debug, Serialize)]
struct AuthRejectionDetails {
    code: String,
    message: String,
}

impl AuthRejection {
    fn new(code: &str, message: &str) -> Self {
        Self {
            error: AuthRejectionDetails {
                code: code.to_string(),
                message: message.to_string(),
            },
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, Json(self)).into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_service = Arc::<AuthService>::from_ref(state);

        // Bearer token takes precedence when both are present
        if let Ok(TypedHeader(Authorization(bearer))) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state).await
        {
            return from_bearer(&auth_service, bearer.token()).await;
        }

        let jar = CookieJar::from_headers(&parts.headers);
        if let Some(cookie) = jar.get(SESSION_COOKIE) {
            return from_session_cookie(&auth_service, cookie.value()).await;
        }

        Err(AuthRejection::new(
            "MISSING_CREDENTIALS",
            "Bearer token or session cookie required",
        )
        .into_response())
    }
}

async fn from_bearer(
    auth_service: &AuthService,
    token: &str,
) -> Result<AuthenticatedUser, Response> {
    let claims = verify_token(token, auth_service.jwt_secret()).map_err(|e| {
        let (code, message) = if e.to_string().contains("expired") {
            ("TOKEN_EXPIRED", "Token has expired")
        } else {
            ("INVALID_TOKEN", "Invalid token")
        };
        AuthRejection::new(code, message).into_response()
    })?;

    if claims.token_type != "access" {
        return Err(
            AuthRejection::new("INVALID_TOKEN_TYPE", "Expected access token").into_response(),
        );
    }

    let user_id = get_user_id_from_claims(&claims).map_err(|_| {
        AuthRejection::new("INVALID_TOKEN", "Invalid user ID in token").into_response()
    })?;

    let role = role_from_str(&claims.role)
        .ok_or_else(|| AuthRejection::new("INVALID_TOKEN", "Invalid role in token").into_response())?;

    // Reject revoked sessions even when the JWT itself is still valid
    auth_service.verify_session(&claims.jti).await.map_err(|_| {
        AuthRejection::new("SESSION_REVOKED", "Session has been revoked").into_response()
    })?;

    Ok(AuthenticatedUser {
        user_id,
        username: claims.username,
        role,
        jti: claims.jti,
    })
}

async fn from_session_cookie(
    auth_service: &AuthService,
    token: &str,
) -> Result<AuthenticatedUser, Response> {
    let (user, jti) = auth_service.resolve_session_token(token).await.map_err(|_| {
        AuthRejection::new("INVALID_SESSION", "Session is invalid or expired").into_response()
    })?;

    Ok(AuthenticatedUser {
        user_id: user.id,
        username: user.username,
        role: user.role,
        jti,
    })
}

/// Extractor that additionally requires the admin role
pub struct AdminUser(pub AuthenticatedUser);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;

        if !matches!(user.role, UserRole::Admin) {
            let body = AuthRejection::new("FORBIDDEN", "Admin access required");
            return Err((StatusCode::FORBIDDEN, Json(body)).into_response());
        }

        Ok(AdminUser(user))
    }
}

/// Extractor that requires admin or supervisor role
pub struct StaffUser(pub AuthenticatedUser);

#[async_trait]
impl<S> FromRequestParts<S> for StaffUser
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;

        if !matches!(user.role, UserRole::Admin | UserRole::Supervisor) {
            let body = AuthRejection::new("FORBIDDEN", "Supervisor access required");
            return Err((StatusCode::FORBIDDEN, Json(body)).into_response());
        }

        Ok(StaffUser(user))
    }
}
