/// JWT Claims structure
///
/// Payload embedded identically in both credentials of a pair: the
/// principal's identity plus the standard registered claims (RFC 7519).

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (principal ID as UUID string)
    pub sub: String,
    /// Display name
    pub name: String,
    /// Contact identifier
    pub email: String,
    /// Role flag
    pub admin: bool,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Issuer
    pub iss: String,
    /// Token ID. Two pairs minted for the same principal in the same second
    /// must still be distinct strings; session matching is exact equality.
    pub jti: String,
}

impl Claims {
    pub fn new(
        user_id: Uuid,
        name: String,
        email: String,
        admin: bool,
        expiry_seconds: i64,
        issuer: String,
    ) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: user_id.to_string(),
            name,
            email,
            admin,
            exp: now + expiry_seconds,
            iat: now,
            iss: issuer,
            jti: Uuid::new_v4().to_string(),
        }
    }

    /// Extract the principal ID from the claims.
    ///
    /// # Errors
    /// Returns error if the subject is not a valid UUID
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| AppError::Internal("Invalid principal ID in token".to_string()))
    }

    /// Seconds until expiry, clamped at zero for already-expired claims.
    pub fn remaining_validity(&self) -> i64 {
        let now = chrono::Utc::now().timestamp();
        (self.exp - now).max(0)
    }

    pub fn is_expired(&self) -> bool {
        let now = chrono::Utc::now().timestamp();
        self.exp < now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_claims(expiry_seconds: i64) -> Claims {
        Claims::new(
            Uuid::new_v4(),
            "Test User".to_string(),
            "test@example.com".to_string(),
            false,
            expiry_seconds,
            "test".to_string(),
        )
    }

    #[test]
    fn test_claims_creation() {
        let user_id = Uuid::new_v4();
        let claims = Claims::new(
            user_id,
            "Test User".to_string(),
            "test@example.com".to_string(),
            false,
            3600,
            "test".to_string(),
        );

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.email, "test@example.com");
        assert_eq!(claims.name, "Test User");
        assert!(!claims.admin);
        assert_eq!(claims.iss, "test");
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_user_id_extraction() {
        let user_id = Uuid::new_v4();
        let claims = Claims::new(
            user_id,
            "Test User".to_string(),
            "test@example.com".to_string(),
            false,
            3600,
            "test".to_string(),
        );

        assert_eq!(claims.user_id().unwrap(), user_id);
    }

    #[test]
    fn test_invalid_user_id() {
        let mut claims = sample_claims(3600);
        claims.sub = "invalid-uuid".to_string();

        assert!(claims.user_id().is_err());
    }

    #[test]
    fn test_token_ids_are_unique() {
        let a = sample_claims(3600);
        let b = sample_claims(3600);

        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn test_remaining_validity_clamps_at_zero() {
        let live = sample_claims(3600);
        assert!(live.remaining_validity() > 3590);

        let expired = sample_claims(-10);
        assert!(expired.is_expired());
        assert_eq!(expired.remaining_validity(), 0);
    }
}
