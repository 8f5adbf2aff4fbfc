//! Authentication HTTP handlers

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use validator::Validate;

use super::AuthenticatedUser;
use crate::middleware::SESSION_COOKIE;
use crate::error::ApiError;
use crate::models::{
    AuthTokensResponse, LoginRequest, RefreshTokenRequest, RegisterRequest, UserResponse,
};
use crate::state::AppState;

/// POST /api/auth/register - Provision a user
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    req.validate()?;

    let user = state.auth_service.register(req).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// POST /api/auth/login - Verify credentials, issue tokens and set the
/// session cookie for the web portal
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<AuthTokensResponse>), ApiError> {
    req.validate()?;

    let ip_address = headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.split(',').next().unwrap_or(s).trim().to_string());
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());

    let tokens = state
        .auth_service
        .login(&req.username, &req.password, ip_address, user_agent)
        .await?;

    let cookie = Cookie::build((SESSION_COOKIE, tokens.session_token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();

    Ok((jar.add(cookie), Json(tokens)))
}

/// POST /api/auth/refresh - Rotate the refresh token
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(req): Json<RefreshTokenRequest>,
) -> Result<Json<AuthTokensResponse>, ApiError> {
    let tokens = state.auth_service.refresh_tokens(&req.refresh_token).await?;
    Ok(Json(tokens))
}

/// POST /api/auth/logout - Revoke the current session and clear the cookie
pub async fn logout(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    jar: CookieJar,
) -> Result<(CookieJar, StatusCode), ApiError> {
    state.auth_service.revoke_session(&user.jti).await?;
    Ok((
        jar.remove(Cookie::from(SESSION_COOKIE)),
        StatusCode::NO_CONTENT,
    ))
}

/// GET /api/auth/me - Current authenticated user
pub async fn get_current_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.auth_service.get_user_by_id(user.user_id).await?;
    Ok(Json(user.into()))
}
