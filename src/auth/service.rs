//! Authentication service
//!
//! Core business logic for username/password authentication, serving both
//! the bearer-token flow (mobile client) and the session-cookie flow (web
//! portal). Both resolve to the same authenticated principal.

use chrono::{Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{page_offset, AuthSession, AuthTokensResponse, RegisterRequest, User, UserRole};

use super::jwt::{generate_access_token, generate_refresh_token, verify_token, JwtError};

/// Auth service errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account is deactivated")]
    AccountDeactivated,

    #[error("Email or username already exists")]
    DuplicateUser,

    #[error("User not found")]
    UserNotFound,

    #[error("Session not found or revoked")]
    SessionNotFound,

    #[error("Token error: {0}")]
    TokenError(String),

    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    #[error("Password hashing failed: {0}")]
    HashingError(String),
}

impl From<sqlx::Error> for AuthError {
    fn from(e: sqlx::Error) -> Self {
        AuthError::DatabaseError(e.to_string())
    }
}

impl From<JwtError> for AuthError {
    fn from(e: JwtError) -> Self {
        AuthError::TokenError(e.to_string())
    }
}

impl From<AuthError> for crate::error::ApiError {
    fn from(e: AuthError) -> Self {
        use crate::error::ApiError;
        match e {
            AuthError::InvalidCredentials
            | AuthError::SessionNotFound
            | AuthError::InvalidRefreshToken => ApiError::Unauthorized(e.to_string()),
            AuthError::AccountDeactivated => ApiError::Forbidden(e.to_string()),
            AuthError::DuplicateUser => ApiError::Conflict(e.to_string()),
            AuthError::UserNotFound => ApiError::NotFound(e.to_string()),
            AuthError::TokenError(msg) => ApiError::Unauthorized(msg),
            AuthError::HashingError(msg) => ApiError::InternalError(msg),
            AuthError::DatabaseError(msg) => ApiError::DatabaseError(msg),
        }
    }
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db_pool: PgPool,
    jwt_secret: String,
    access_token_ttl_seconds: i64,
    refresh_token_ttl_days: i64,
}

impl AuthService {
    /// Create a new AuthService
    pub fn new(
        db_pool: PgPool,
        jwt_secret: String,
        access_token_ttl_seconds: i64,
        refresh_token_ttl_days: i64,
    ) -> Self {
        Self {
            db_pool,
            jwt_secret,
            access_token_ttl_seconds,
            refresh_token_ttl_days,
        }
    }

    /// JWT signing secret, for the middleware extractor
    pub fn jwt_secret(&self) -> &str {
        &self.jwt_secret
    }

    /// Register a new user
    pub async fn register(&self, request: RegisterRequest) -> Result<User, AuthError> {
        let existing: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM users WHERE email = $1 OR username = $2")
                .bind(&request.email)
                .bind(&request.username)
                .fetch_optional(&self.db_pool)
                .await?;

        if existing.is_some() {
            return Err(AuthError::DuplicateUser);
        }

        let password_hash = bcrypt::hash(&request.password, bcrypt::DEFAULT_COST)
            .map_err(|e| AuthError::HashingError(e.to_string()))?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, username, password_hash, name, role, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, TRUE, $7, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&request.email)
        .bind(&request.username)
        .bind(&password_hash)
        .bind(&request.name)
        .bind(request.role.unwrap_or(UserRole::Collector))
        .bind(Utc::now())
        .fetch_one(&self.db_pool)
        .await?;

        Ok(user)
    }

    /// Verify username/password and issue tokens plus a session
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> Result<AuthTokensResponse, AuthError> {
        let user: User = sqlx::query_as("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !user.is_active {
            return Err(AuthError::AccountDeactivated);
        }

        let password_valid = bcrypt::verify(password, &user.password_hash)
            .map_err(|e| AuthError::HashingError(e.to_string()))?;
        if !password_valid {
            return Err(AuthError::InvalidCredentials);
        }

        self.issue_tokens(&user, ip_address, user_agent).await
    }

    /// Exchange a valid refresh token for a fresh token set (rotation)
    pub async fn refresh_tokens(&self, refresh_token: &str) -> Result<AuthTokensResponse, AuthError> {
        let claims = verify_token(refresh_token, &self.jwt_secret)
            .map_err(|_| AuthError::InvalidRefreshToken)?;

        if claims.token_type != "refresh" {
            return Err(AuthError::InvalidRefreshToken);
        }

        let session = self.find_active_session(&claims.jti).await?;

        // The stored hash must match the presented token
        if session.refresh_token_hash != hash_token(refresh_token) {
            return Err(AuthError::InvalidRefreshToken);
        }

        let user = self.get_user_by_id(session.user_id).await?;
        if !user.is_active {
            return Err(AuthError::AccountDeactivated);
        }

        // Rotate: revoke the old session before issuing a new one
        self.revoke_session(&claims.jti).await?;
        self.issue_tokens(&user, session.ip_address, session.user_agent)
            .await
    }

    /// Check a session is live (used on every authenticated request)
    pub async fn verify_session(&self, jti: &str) -> Result<(), AuthError> {
        self.find_active_session(jti).await.map(|_| ())
    }

    /// Resolve an opaque session-cookie token to its user and session
    pub async fn resolve_session_token(&self, token: &str) -> Result<(User, String), AuthError> {
        let session: AuthSession = sqlx::query_as(
            r#"
            SELECT * FROM auth_sessions
            WHERE session_token_hash = $1 AND NOT revoked AND expires_at > $2
            "#,
        )
        .bind(hash_token(token))
        .bind(Utc::now())
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or(AuthError::SessionNotFound)?;

        let user = self.get_user_by_id(session.user_id).await?;
        if !user.is_active {
            return Err(AuthError::AccountDeactivated);
        }

        Ok((user, session.jti))
    }

    /// Revoke a single session by its JWT ID
    pub async fn revoke_session(&self, jti: &str) -> Result<(), AuthError> {
        sqlx::query(
            "UPDATE auth_sessions SET revoked = TRUE, revoked_at = $1 WHERE jti = $2",
        )
        .bind(Utc::now())
        .bind(jti)
        .execute(&self.db_pool)
        .await?;

        Ok(())
    }

    /// Revoke all sessions for a user; returns the number revoked
    pub async fn revoke_all_sessions(&self, user_id: Uuid) -> Result<u64, AuthError> {
        let result = sqlx::query(
            "UPDATE auth_sessions SET revoked = TRUE, revoked_at = $1 WHERE user_id = $2 AND NOT revoked",
        )
        .bind(Utc::now())
        .bind(user_id)
        .execute(&self.db_pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Fetch a user by ID
    pub async fn get_user_by_id(&self, user_id: Uuid) -> Result<User, AuthError> {
        sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Provision a collector account (admin operation)
    pub async fn create_collector(
        &self,
        request: crate::models::CreateCollectorRequest,
    ) -> Result<User, AuthError> {
        let existing: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM users WHERE email = $1 OR username = $2")
                .bind(&request.email)
                .bind(&request.username)
                .fetch_optional(&self.db_pool)
                .await?;
        if existing.is_some() {
            return Err(AuthError::DuplicateUser);
        }

        let password_hash = bcrypt::hash(&request.password, bcrypt::DEFAULT_COST)
            .map_err(|e| AuthError::HashingError(e.to_string()))?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (
                id, email, username, password_hash, name, phone,
                assigned_area, role, is_active, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'COLLECTOR', $8, $9, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&request.email)
        .bind(&request.username)
        .bind(&password_hash)
        .bind(&request.name)
        .bind(&request.phone)
        .bind(&request.assigned_area)
        .bind(request.is_active.unwrap_or(true))
        .bind(Utc::now())
        .fetch_one(&self.db_pool)
        .await?;

        Ok(user)
    }

    /// List collector accounts, newest first
    pub async fn list_collectors(
        &self,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<User>, i64), AuthError> {
        let offset = page_offset(page, limit);

        let collectors = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users WHERE role = 'COLLECTOR'
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db_pool)
        .await?;

        let (total,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM users WHERE role = 'COLLECTOR'")
                .fetch_one(&self.db_pool)
                .await?;

        Ok((collectors, total))
    }

    /// Partially update a collector profile. Password changes go through
    /// a separate flow and are not accepted here.
    pub async fn update_collector(
        &self,
        id: Uuid,
        request: crate::models::UpdateCollectorRequest,
    ) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                username = COALESCE($4, username),
                phone = COALESCE($5, phone),
                assigned_area = COALESCE($6, assigned_area),
                is_active = COALESCE($7, is_active),
                updated_at = $8
            WHERE id = $1 AND role = 'COLLECTOR'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.name)
        .bind(&request.email)
        .bind(&request.username)
        .bind(&request.phone)
        .bind(&request.assigned_area)
        .bind(request.is_active)
        .bind(Utc::now())
        .fetch_optional(&self.db_pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => AuthError::DuplicateUser,
            _ => AuthError::DatabaseError(e.to_string()),
        })?;

        Ok(user)
    }

    /// Deactivate a collector and revoke their sessions
    pub async fn deactivate_collector(&self, id: Uuid) -> Result<bool, AuthError> {
        let result = sqlx::query(
            "UPDATE users SET is_active = FALSE, updated_at = $1 WHERE id = $2 AND role = 'COLLECTOR'",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&self.db_pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        self.revoke_all_sessions(id).await?;
        Ok(true)
    }

    async fn find_active_session(&self, jti: &str) -> Result<AuthSession, AuthError> {
        sqlx::query_as::<_, AuthSession>(
            "SELECT * FROM auth_sessions WHERE jti = $1 AND NOT revoked AND expires_at > $2",
        )
        .bind(jti)
        .bind(Utc::now())
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or(AuthError::SessionNotFound)
    }

    async fn issue_tokens(
        &self,
        user: &User,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> Result<AuthTokensResponse, AuthError> {
        let jti = Uuid::new_v4().to_string();

        let access_token =
            generate_access_token(user, &jti, &self.jwt_secret, self.access_token_ttl_seconds)?;
        let refresh_token =
            generate_refresh_token(user, &jti, &self.jwt_secret, self.refresh_token_ttl_days)?;
        let session_token = generate_opaque_token();

        let expires_at = Utc::now() + Duration::days(self.refresh_token_ttl_days);

        sqlx::query(
            r#"
            INSERT INTO auth_sessions (
                id, user_id, jti, refresh_token_hash, session_token_hash,
                ip_address, user_agent, expires_at, revoked, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, FALSE, $9)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user.id)
        .bind(&jti)
        .bind(hash_token(&refresh_token))
        .bind(hash_token(&session_token))
        .bind(ip_address)
        .bind(user_agent)
        .bind(expires_at)
        .bind(Utc::now())
        .execute(&self.db_pool)
        .await?;

        Ok(AuthTokensResponse {
            access_token,
            refresh_token,
            session_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_ttl_seconds,
            user: user.clone().into(),
        })
    }
}

/// SHA-256 hex digest for token storage; raw tokens never hit the database
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Generate an opaque session token (not a JWT)
fn generate_opaque_token() -> String {
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut rng = rand::thread_rng();
    (0..48)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_token_is_stable_and_hex() {
        let a = hash_token("some-token");
        let b = hash_token("some-token");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_hash_token_differs_by_input() {
        assert_ne!(hash_token("token-a"), hash_token("token-b"));
    }

    #[test]
    fn test_opaque_token_shape() {
        let token = generate_opaque_token();
        assert_eq!(token.len(), 48);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
