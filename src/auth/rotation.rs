/// Rotation coordinator.
///
/// Server-side state machine for the refresh credential lifecycle:
///
///   RECEIVED -> VERIFIED -> {MATCHED | MISMATCH} -> {ROTATED | REJECTED}
///
/// A presented refresh credential must be cryptographically valid AND equal
/// (by exact string comparison) to the principal's current session record.
/// Anything else is treated as reuse of a superseded credential: the whole
/// session line is invalidated, not just the one request. "No record at
/// all" counts as reuse too.

use uuid::Uuid;

use crate::auth::claims::Claims;
use crate::auth::jwt::{issue_pair, validate_access_token, validate_refresh_token, TokenPair};
use crate::auth::revocation::RevocationRegistry;
use crate::auth::session::SessionStore;
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};

#[derive(Clone)]
pub struct RotationCoordinator {
    sessions: SessionStore,
    revocations: RevocationRegistry,
    jwt: JwtSettings,
}

impl RotationCoordinator {
    pub fn new(sessions: SessionStore, revocations: RevocationRegistry, jwt: JwtSettings) -> Self {
        Self {
            sessions,
            revocations,
            jwt,
        }
    }

    /// Mint a pair and make its refresh credential current
    /// (login/signup/federated signin).
    ///
    /// # Errors
    /// Fails if signing fails or the session write cannot be confirmed. No
    /// pair is ever returned without a durable session record behind it.
    pub async fn establish(
        &self,
        user_id: &Uuid,
        name: &str,
        email: &str,
        admin: bool,
    ) -> Result<TokenPair, AppError> {
        let pair = issue_pair(user_id, name, email, admin, &self.jwt)?;
        self.sessions
            .set_current(user_id, &pair.refresh, self.jwt.refresh_token_expiry)
            .await?;
        Ok(pair)
    }

    /// Exchange the presented refresh credential for a new pair.
    ///
    /// # Errors
    /// - `TokenInvalid` when verification fails (RECEIVED/VERIFIED exits)
    /// - `SessionMismatch` when the credential is superseded or raced out;
    ///   the principal's session is cleared before this surfaces
    /// - `Store` when the backing store cannot confirm a required write;
    ///   rotation is never claimed successful on a best-effort basis
    pub async fn rotate(&self, presented: &str) -> Result<TokenPair, AppError> {
        let claims = validate_refresh_token(presented, &self.jwt)?;
        let principal = claims.user_id()?;

        match self.sessions.get_current(&principal).await? {
            Some(ref current) if current == presented => {}
            _ => return self.flag_reuse(&principal, presented, &claims).await,
        }

        // MATCHED. The presented credential leaves circulation whether or
        // not the swap below wins.
        self.revocations
            .revoke(presented, claims.remaining_validity())
            .await?;

        let pair = issue_pair(&principal, &claims.name, &claims.email, claims.admin, &self.jwt)?;

        let swapped = self
            .sessions
            .swap_current(
                &principal,
                presented,
                &pair.refresh,
                self.jwt.refresh_token_expiry,
            )
            .await?;
        if !swapped {
            // A concurrent rotation advanced the session between our read
            // and our swap; this attempt is a reuse after all.
            return self.flag_reuse(&principal, presented, &claims).await;
        }

        tracing::info!(user_id = %principal, "Refresh credential rotated");
        Ok(pair)
    }

    /// MISMATCH exit: invalidate the session line and tombstone the
    /// presented credential.
    async fn flag_reuse(
        &self,
        principal: &Uuid,
        presented: &str,
        claims: &Claims,
    ) -> Result<TokenPair, AppError> {
        self.sessions.clear(principal).await?;
        self.revocations
            .revoke(presented, claims.remaining_validity())
            .await?;

        tracing::warn!(
            user_id = %principal,
            "Superseded refresh credential presented, session line invalidated"
        );
        Err(AppError::Auth(AuthError::SessionMismatch))
    }

    /// Logout. Best-effort: a credential that no longer verifies needs no
    /// tombstone, and a store outage here must not fail the logout, so every
    /// failure is logged and suppressed. The caller cannot tell "already
    /// expired" from "explicitly logged out".
    pub async fn terminate(&self, access_token: Option<&str>, refresh_token: Option<&str>) {
        if let Some(token) = refresh_token {
            if let Ok(claims) = validate_refresh_token(token, &self.jwt) {
                if let Ok(principal) = claims.user_id() {
                    if let Err(e) = self.sessions.clear(&principal).await {
                        tracing::warn!(error = %e, "Logout could not clear session record");
                    }
                }
                if let Err(e) = self
                    .revocations
                    .revoke(token, claims.remaining_validity())
                    .await
                {
                    tracing::warn!(error = %e, "Logout could not revoke refresh credential");
                }
            } else {
                tracing::debug!("Logout presented a refresh credential that no longer verifies");
            }
        }

        if let Some(token) = access_token {
            if let Ok(claims) = validate_access_token(token, &self.jwt) {
                if let Err(e) = self
                    .revocations
                    .revoke(token, claims.remaining_validity())
                    .await
                {
                    tracing::warn!(error = %e, "Logout could not revoke access credential");
                }
            } else {
                tracing::debug!("Logout presented an access credential that no longer verifies");
            }
        }
    }
}
