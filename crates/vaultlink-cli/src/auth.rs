//! Bearer token authentication

use crate::error::{ApiError, ErrorCode};
use crate::state::UserSession;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (principal)
    pub sub: String,
    /// Expiration time
    pub exp: i64,
    /// Issued at
    pub iat: Option<i64>,
    /// Issuer
    pub iss: Option<String>,
    /// Space-separated scopes
    #[serde(default)]
    pub scope: String,
    /// Name
    pub name: Option<String>,
}

/// Validate an HS256 token and extract claims
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, ApiError> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    decode::<Claims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!("Token validation failed: {}", e);
            ApiError::new(ErrorCode::InvalidToken, "Invalid or expired token")
        })
}

/// Convert claims to a user session
pub fn claims_to_session(claims: Claims) -> Result<UserSession, ApiError> {
    if claims.sub.trim().is_empty() {
        return Err(ApiError::new(ErrorCode::InvalidToken, "Token has no subject"));
    }
    let scopes = claims.scope.split_whitespace().map(str::to_string).collect();

    Ok(UserSession {
        principal: claims.sub,
        display_name: claims.name,
        scopes,
        expires_at: DateTime::from_timestamp(claims.exp, 0)
            .unwrap_or_else(|| Utc::now() + Duration::hours(1)),
    })
}

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("bearer "))
}

/// Session used when authentication is disabled
pub fn dev_session() -> UserSession {
    UserSession {
        principal: "dev-user".to_string(),
        display_name: Some("Development User".to_string()),
        scopes: vec!["files:*".to_string()],
        expires_at: Utc::now() + Duration::days(365),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn claims(sub: &str, exp: DateTime<Utc>) -> Claims {
        Claims {
            sub: sub.to_string(),
            exp: exp.timestamp(),
            iat: Some(Utc::now().timestamp()),
            iss: None,
            scope: "files:read files:write".to_string(),
            name: Some("Alice".to_string()),
        }
    }

    fn sign(claims: &Claims, secret: &str) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_validate_token() {
        let token = sign(&claims("alice", Utc::now() + Duration::hours(1)), "s3cret");
        let session = claims_to_session(validate_token(&token, "s3cret").unwrap()).unwrap();

        assert_eq!(session.principal, "alice");
        assert!(session.can_read());
        assert!(session.can_write());
    }

    #[test]
    fn test_expired_token() {
        let token = sign(&claims("alice", Utc::now() - Duration::hours(1)), "s3cret");
        let err = validate_token(&token, "s3cret").unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::InvalidToken);
    }

    #[test]
    fn test_wrong_secret() {
        let token = sign(&claims("alice", Utc::now() + Duration::hours(1)), "s3cret");
        assert!(validate_token(&token, "other").is_err());
    }

    #[test]
    fn test_empty_subject_rejected() {
        let c = claims("  ", Utc::now() + Duration::hours(1));
        assert!(claims_to_session(c).is_err());
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc123"), Some("abc123"));
        assert_eq!(extract_bearer_token("bearer abc123"), Some("abc123"));
        assert_eq!(extract_bearer_token("Basic xyz"), None);
    }
}
