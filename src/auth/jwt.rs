/// Credential pair issuance and verification.
///
/// A pair is two HS256-signed tokens minted from the same identity claims:
/// a short-lived access credential and a long-lived refresh credential,
/// signed with distinct secrets so neither can stand in for the other.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::auth::claims::Claims;
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};

/// A freshly issued access + refresh credential pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Issue a new credential pair for a principal.
///
/// Both tokens embed the same identity; only expiry, secret, and token ID
/// differ.
///
/// # Errors
/// Returns error if signing fails
pub fn issue_pair(
    user_id: &Uuid,
    name: &str,
    email: &str,
    admin: bool,
    config: &JwtSettings,
) -> Result<TokenPair, AppError> {
    let access_claims = Claims::new(
        *user_id,
        name.to_string(),
        email.to_string(),
        admin,
        config.access_token_expiry,
        config.issuer.clone(),
    );
    let refresh_claims = Claims::new(
        *user_id,
        name.to_string(),
        email.to_string(),
        admin,
        config.refresh_token_expiry,
        config.issuer.clone(),
    );

    let access = sign(&access_claims, &config.access_secret)?;
    let refresh = sign(&refresh_claims, &config.refresh_secret)?;

    Ok(TokenPair { access, refresh })
}

fn sign(claims: &Claims, secret: &str) -> Result<String, AppError> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

/// Validate an access credential and extract its claims.
///
/// # Errors
/// Fails with `TokenInvalid` on bad signature, encoding, issuer, or expiry.
pub fn validate_access_token(token: &str, config: &JwtSettings) -> Result<Claims, AppError> {
    validate(token, &config.access_secret, &config.issuer)
}

/// Validate a refresh credential and extract its claims.
///
/// # Errors
/// Fails with `TokenInvalid` on bad signature, encoding, issuer, or expiry.
pub fn validate_refresh_token(token: &str, config: &JwtSettings) -> Result<Claims, AppError> {
    validate(token, &config.refresh_secret, &config.issuer)
}

fn validate(token: &str, secret: &str, issuer: &str) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[issuer]);
    // Expiry is exact; no clock-skew grace.
    validation.leeway = 0;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::warn!("Token validation error: {}", e);
        AppError::Auth(AuthError::TokenInvalid)
    })
}

/// Deterministic fingerprint of a raw credential (SHA-256 hex).
///
/// Revocation entries are keyed by this so the raw token is never persisted.
pub fn fingerprint(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_test_config() -> JwtSettings {
        JwtSettings {
            access_secret: "access-test-secret-at-least-32-characters".to_string(),
            refresh_secret: "refresh-test-secret-at-least-32-characters".to_string(),
            access_token_expiry: 900,
            refresh_token_expiry: 604800,
            issuer: "test".to_string(),
        }
    }

    #[test]
    fn test_issue_and_validate_pair() {
        let config = get_test_config();
        let user_id = Uuid::new_v4();

        let pair = issue_pair(&user_id, "Jane", "jane@example.com", false, &config)
            .expect("Failed to issue pair");

        let access_claims =
            validate_access_token(&pair.access, &config).expect("Failed to validate access");
        let refresh_claims =
            validate_refresh_token(&pair.refresh, &config).expect("Failed to validate refresh");

        assert_eq!(access_claims.sub, user_id.to_string());
        assert_eq!(refresh_claims.sub, user_id.to_string());
        assert_eq!(access_claims.email, "jane@example.com");
        assert_eq!(refresh_claims.email, "jane@example.com");
        assert_eq!(access_claims.iss, "test");

        // Different expiries and token IDs make the two strings distinct.
        assert_ne!(pair.access, pair.refresh);
        assert!(refresh_claims.exp > access_claims.exp);
    }

    #[test]
    fn test_pairs_for_same_principal_are_distinct() {
        let config = get_test_config();
        let user_id = Uuid::new_v4();

        let first = issue_pair(&user_id, "Jane", "jane@example.com", false, &config).unwrap();
        let second = issue_pair(&user_id, "Jane", "jane@example.com", false, &config).unwrap();

        assert_ne!(first.refresh, second.refresh);
        assert_ne!(first.access, second.access);
    }

    #[test]
    fn test_secrets_are_not_interchangeable() {
        let config = get_test_config();
        let user_id = Uuid::new_v4();

        let pair = issue_pair(&user_id, "Jane", "jane@example.com", false, &config).unwrap();

        assert!(validate_refresh_token(&pair.access, &config).is_err());
        assert!(validate_access_token(&pair.refresh, &config).is_err());
    }

    #[test]
    fn test_invalid_token() {
        let config = get_test_config();
        let result = validate_access_token("invalid.token.here", &config);

        assert!(result.is_err());
    }

    #[test]
    fn test_tampered_token() {
        let config = get_test_config();
        let user_id = Uuid::new_v4();

        let pair = issue_pair(&user_id, "Jane", "jane@example.com", false, &config).unwrap();

        let tampered = format!("{}X", pair.access);
        let result = validate_access_token(&tampered, &config);

        assert!(result.is_err());
    }

    #[test]
    fn test_wrong_issuer() {
        let mut config = get_test_config();
        let user_id = Uuid::new_v4();

        let pair = issue_pair(&user_id, "Jane", "jane@example.com", false, &config).unwrap();

        config.issuer = "wrong-issuer".to_string();
        let result = validate_access_token(&pair.access, &config);

        assert!(result.is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let config = get_test_config();
        let claims = Claims::new(
            Uuid::new_v4(),
            "Jane".to_string(),
            "jane@example.com".to_string(),
            false,
            -10,
            config.issuer.clone(),
        );
        let token = sign(&claims, &config.access_secret).unwrap();

        let result = validate_access_token(&token, &config);

        assert!(matches!(
            result,
            Err(AppError::Auth(AuthError::TokenInvalid))
        ));
    }

    #[test]
    fn test_fingerprint_is_stable_hex() {
        let fp1 = fingerprint("some-token");
        let fp2 = fingerprint("some-token");
        let other = fingerprint("another-token");

        assert_eq!(fp1, fp2);
        assert_ne!(fp1, other);
        assert_eq!(fp1.len(), 64);
        assert!(fp1.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
