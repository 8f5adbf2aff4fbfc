//! JWT token generation and validation
//!
//! Handles creation and verification of access and refresh tokens.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{User, UserRole};

/// JWT-related errors
#[derive(Error, Debug)]
pub enum JwtError {
    #[error("Token encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Token decoding failed: {0}")]
    DecodingFailed(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

/// JWT claims for access and refresh tokens
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Username
    pub username: String,
    /// User role
    pub role: String,
    /// JWT ID (for revocation)
    pub jti: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
    /// Token type (access or refresh)
    pub token_type: String,
}

/// Token type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// Generate an access token for a user
pub fn generate_access_token(
    user: &User,
    jti: &str,
    secret: &str,
    ttl_seconds: i64,
) -> Result<String, JwtError> {
    generate_token(user, jti, secret, ttl_seconds, TokenType::Access)
}

/// Generate a refresh token for a user
pub fn generate_refresh_token(
    user: &User,
    jti: &str,
    secret: &str,
    ttl_days: i64,
) -> Result<String, JwtError> {
    let ttl_seconds = ttl_days * 24 * 60 * 60;
    generate_token(user, jti, secret, ttl_seconds, TokenType::Refresh)
}

fn generate_token(
    user: &User,
    jti: &str,
    secret: &str,
    ttl_seconds: i64,
    token_type: TokenType,
) -> Result<String, JwtError> {
    let now = Utc::now();
    let exp = now + Duration::seconds(ttl_seconds);

    let claims = Claims {
        sub: user.id.to_string(),
        username: user.username.clone(),
        role: role_str(user.role).to_string(),
        jti: jti.to_string(),
        iat: now.timestamp(),
        exp: exp.timestamp(),
        token_type: token_type.as_str().to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| JwtError::EncodingFailed(e.to_string()))
}

/// Verify and decode a JWT token
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        if e.to_string().contains("ExpiredSignature") {
            JwtError::TokenExpired
        } else {
            JwtError::DecodingFailed(e.to_string())
        }
    })?;

    Ok(token_data.claims)
}

/// Extract user ID from claims
pub fn get_user_id_from_claims(claims: &Claims) -> Result<Uuid, JwtError> {
    Uuid::parse_str(&claims.sub).map_err(|e| JwtError::InvalidToken(e.to_string()))
}

pub fn role_str(role: UserRole) -> &'static str {
    match role {
        UserRole::Admin => "admin",
        UserRole::Supervisor => "supervisor",
        UserRole::Collector => "collector",
    }
}

pub fn role_from_str(s: &str) -> Option<UserRole> {
    match s {
        "admin" => Some(UserRole::Admin),
        "supervisor" => Some(UserRole::Supervisor),
        "collector" => Some(UserRole::Collector),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn create_test_user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "asha@example.com".to_string(),
            username: "asha".to_string(),
            password_hash: "x".to_string(),
            name: "Asha".to_string(),
            phone: None,
            assigned_area: Some("Ramapuram".to_string()),
            role: UserRole::Collector,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_generate_access_token() {
        let user = create_test_user();
        let jti = Uuid::new_v4().to_string();
        let secret = "test-secret-key";

        let token = generate_access_token(&user, &jti, secret, 900).unwrap();
        assert!(!token.is_empty());

        let claims = verify_token(&token, secret).unwrap();
        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.username, user.username);
        assert_eq!(claims.role, "collector");
        assert_eq!(claims.token_type, "access");
    }

    #[test]
    fn test_generate_refresh_token() {
        let user = create_test_user();
        let jti = Uuid::new_v4().to_string();
        let secret = "test-secret-key";

        let token = generate_refresh_token(&user, &jti, secret, 7).unwrap();
        assert!(!token.is_empty());

        let claims = verify_token(&token, secret).unwrap();
        assert_eq!(claims.token_type, "refresh");
    }

    #[test]
    fn test_invalid_token() {
        let secret = "test-secret-key";
        let result = verify_token("invalid.token.here", secret);
        assert!(result.is_err());
    }

    #[test]
    fn test_wrong_secret() {
        let user = create_test_user();
        let jti = Uuid::new_v4().to_string();

        let token = generate_access_token(&user, &jti, "secret1", 900).unwrap();
        let result = verify_token(&token, "secret2");
        assert!(result.is_err());
    }

    #[test]
    fn test_role_round_trip() {
        for role in [UserRole::Admin, UserRole::Supervisor, UserRole::Collector] {
            assert_eq!(role_from_str(role_str(role)), Some(role));
        }
        assert_eq!(role_from_str("oracle"), None);
    }
}
