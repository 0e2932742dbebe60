/// User directory
///
/// In-process account registry backing signup, password login, and federated
/// signin. Passwords are hashed with bcrypt; accounts created through a
/// federated provider carry no password hash at all.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{AppError, AuthError, DirectoryError, ValidationError};
use crate::validators::{is_valid_email, is_valid_name};

const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 128;

#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub password_hash: Option<String>,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

/// Accounts keyed by normalized email.
pub struct UserDirectory {
    users: RwLock<HashMap<String, User>>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
        }
    }

    /// Create a password-backed account.
    ///
    /// # Errors
    /// - Validation errors for email, name, or password strength
    /// - `DuplicateEmail` when the address is already registered
    pub fn register(&self, email: &str, password: &str, name: &str) -> Result<User, AppError> {
        let email = is_valid_email(email)?;
        let name = is_valid_name(name)?;
        validate_password_strength(password)?;

        let password_hash = hash(password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        let user = User {
            id: Uuid::new_v4(),
            email: email.clone(),
            name,
            password_hash: Some(password_hash),
            is_admin: false,
            created_at: Utc::now(),
        };

        let mut users = self.write_locked()?;
        if users.contains_key(&email) {
            return Err(AppError::Directory(DirectoryError::DuplicateEmail(email)));
        }
        users.insert(email, user.clone());

        Ok(user)
    }

    /// Verify a password login.
    ///
    /// Unknown address, account without a password (federated signin only),
    /// and wrong password all produce the same error.
    pub fn verify_credentials(&self, email: &str, password: &str) -> Result<User, AppError> {
        let email = is_valid_email(email)?;

        let user = {
            let users = self.read_locked()?;
            users.get(&email).cloned()
        };
        let user = user.ok_or(AppError::Auth(AuthError::InvalidCredentials))?;

        let password_hash = user
            .password_hash
            .as_deref()
            .ok_or(AppError::Auth(AuthError::InvalidCredentials))?;

        let password_valid = verify(password, password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;
        if !password_valid {
            return Err(AppError::Auth(AuthError::InvalidCredentials));
        }

        Ok(user)
    }

    /// Look up or create the account for an identity asserted by an upstream
    /// provider. An existing account (password-backed or not) is reused as-is.
    pub fn find_or_create_federated(&self, email: &str, name: &str) -> Result<User, AppError> {
        let email = is_valid_email(email)?;
        let name = is_valid_name(name)?;

        let mut users = self.write_locked()?;
        if let Some(existing) = users.get(&email) {
            return Ok(existing.clone());
        }

        let user = User {
            id: Uuid::new_v4(),
            email: email.clone(),
            name,
            password_hash: None,
            is_admin: false,
            created_at: Utc::now(),
        };
        users.insert(email, user.clone());

        Ok(user)
    }

    fn read_locked(&self) -> Result<RwLockReadGuard<'_, HashMap<String, User>>, AppError> {
        self.users
            .read()
            .map_err(|_| AppError::Internal("user directory lock poisoned".to_string()))
    }

    fn write_locked(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, User>>, AppError> {
        self.users
            .write()
            .map_err(|_| AppError::Internal("user directory lock poisoned".to_string()))
    }
}

impl Default for UserDirectory {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate password strength requirements
///
/// Requirements:
/// - Minimum 8 characters
/// - Maximum 128 characters
/// - At least one digit
/// - At least one lowercase letter
/// - At least one uppercase letter
fn validate_password_strength(password: &str) -> Result<(), AppError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AppError::Validation(ValidationError::TooShort(
            "password".to_string(),
            MIN_PASSWORD_LENGTH,
        )));
    }

    // Check maximum length (bcrypt limitation and DoS prevention)
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(AppError::Validation(ValidationError::TooLong(
            "password".to_string(),
            MAX_PASSWORD_LENGTH,
        )));
    }

    let has_digit = password.chars().any(|c| c.is_numeric());
    let has_lowercase = password.chars().any(|c| c.is_lowercase());
    let has_uppercase = password.chars().any(|c| c.is_uppercase());

    if !has_digit || !has_lowercase || !has_uppercase {
        return Err(AppError::Validation(ValidationError::InvalidFormat(
            "password must contain at least one digit, one lowercase letter, and one uppercase letter"
                .to_string(),
        )));
    }

    Ok(())
}
