//! Refresh token lifecycle: issuance, expiry, rotation, revocation.
//!
//! Refresh tokens are opaque UUID strings with a 24 hour TTL, one active per
//! user. Rotation compares the IP and device fingerprint captured at issuance
//! against the rotating request; a mismatch on both-present values is treated
//! as possible token theft and refuses to touch the stored record, so the
//! legitimate holder is not locked out by a single bad request.

use tracing::{info, warn};
use uuid::Uuid;

use crate::db::{Database, RefreshToken, User};
use crate::jwt::Clock;

/// Refresh token lifetime: 24 hours.
pub const REFRESH_TOKEN_DURATION_SECS: u64 = 24 * 60 * 60;

/// Errors from refresh token operations.
#[derive(Debug)]
pub enum RefreshTokenError {
    /// No record exists for the supplied token value
    NotFound,
    /// Past the expiry timestamp; the record has been deleted
    Expired,
    /// IP or device fingerprint mismatch during rotation
    SuspiciousActivity,
    /// Store failure, distinct from any invalid-token condition
    Store(sqlx::Error),
}

impl std::fmt::Display for RefreshTokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefreshTokenError::NotFound => write!(f, "Refresh token not found"),
            RefreshTokenError::Expired => {
                write!(f, "Refresh token has expired. Please log in again")
            }
            RefreshTokenError::SuspiciousActivity => {
                write!(f, "Suspicious activity detected. Please log in again")
            }
            RefreshTokenError::Store(e) => write!(f, "Refresh token store error: {}", e),
        }
    }
}

impl std::error::Error for RefreshTokenError {}

impl From<sqlx::Error> for RefreshTokenError {
    fn from(e: sqlx::Error) -> Self {
        RefreshTokenError::Store(e)
    }
}

/// True when both sides carry a value and the values differ. A missing side
/// is never an anomaly; fingerprints are a weak signal, not a boundary.
fn fingerprint_mismatch(stored: Option<&str>, supplied: Option<&str>) -> bool {
    matches!((stored, supplied), (Some(a), Some(b)) if a != b)
}

#[derive(Clone)]
pub struct RefreshTokenManager {
    db: Database,
    clock: Clock,
}

impl RefreshTokenManager {
    pub fn new(db: Database, clock: Clock) -> Self {
        Self { db, clock }
    }

    /// Issue a refresh token for the user, replacing any existing one.
    pub async fn create(
        &self,
        user: &User,
        ip_address: Option<&str>,
        device_info: Option<&str>,
    ) -> Result<RefreshToken, RefreshTokenError> {
        let token = Uuid::new_v4().to_string();
        let expires_at = (self.clock.now() + REFRESH_TOKEN_DURATION_SECS) as i64;

        let id = self
            .db
            .refresh_tokens()
            .replace_for_user(user.id, &token, expires_at, ip_address, device_info)
            .await?;

        info!(user_id = user.id, "Issued refresh token");

        Ok(RefreshToken {
            id,
            token,
            user_id: user.id,
            expires_at,
            ip_address: ip_address.map(str::to_string),
            device_info: device_info.map(str::to_string),
        })
    }

    /// Check the token against the clock. An expired record is deleted on
    /// the spot; the caller must re-authenticate, never retry.
    pub async fn verify_expiration(
        &self,
        token: &RefreshToken,
    ) -> Result<(), RefreshTokenError> {
        if token.expires_at <= self.clock.now() as i64 {
            self.db.refresh_tokens().delete_by_token(&token.token).await?;
            info!(user_id = token.user_id, "Deleted expired refresh token");
            return Err(RefreshTokenError::Expired);
        }
        Ok(())
    }

    /// Rotate a refresh token: retire the current record and issue a fresh
    /// one for the same user with a renewed TTL.
    ///
    /// If the stored record and the request both carry an IP or device
    /// fingerprint and they differ, rotation fails with `SuspiciousActivity`
    /// and the stored record is left untouched. Stored values survive a
    /// rotation that supplies none.
    pub async fn rotate(
        &self,
        token: &str,
        ip_address: Option<&str>,
        device_info: Option<&str>,
    ) -> Result<RefreshToken, RefreshTokenError> {
        let stored = self
            .find_by_token(token)
            .await?
            .ok_or(RefreshTokenError::NotFound)?;

        if fingerprint_mismatch(stored.ip_address.as_deref(), ip_address)
            || fingerprint_mismatch(stored.device_info.as_deref(), device_info)
        {
            warn!(
                user_id = stored.user_id,
                stored_ip = stored.ip_address.as_deref().unwrap_or("-"),
                request_ip = ip_address.unwrap_or("-"),
                "Refresh token rotation refused: fingerprint mismatch"
            );
            return Err(RefreshTokenError::SuspiciousActivity);
        }

        let new_ip = ip_address.or(stored.ip_address.as_deref());
        let new_device = device_info.or(stored.device_info.as_deref());
        let new_token = Uuid::new_v4().to_string();
        let expires_at = (self.clock.now() + REFRESH_TOKEN_DURATION_SECS) as i64;

        let id = self
            .db
            .refresh_tokens()
            .replace_for_user(stored.user_id, &new_token, expires_at, new_ip, new_device)
            .await?;

        info!(user_id = stored.user_id, "Rotated refresh token");

        Ok(RefreshToken {
            id,
            token: new_token,
            user_id: stored.user_id,
            expires_at,
            ip_address: new_ip.map(str::to_string),
            device_info: new_device.map(str::to_string),
        })
    }

    /// Look up a token record by its token value. No side effects.
    pub async fn find_by_token(
        &self,
        token: &str,
    ) -> Result<Option<RefreshToken>, RefreshTokenError> {
        Ok(self.db.refresh_tokens().get_by_token(token).await?)
    }

    /// Revoke a token. Returns true if a record existed; deleting an absent
    /// token is not an error, so logout is idempotent.
    pub async fn delete_by_token(&self, token: &str) -> Result<bool, RefreshTokenError> {
        Ok(self.db.refresh_tokens().delete_by_token(token).await?)
    }
}
