//! Refresh token storage.
//!
//! One row per user at most; the schema enforces this with a UNIQUE
//! constraint on user_id, and [`RefreshTokenStore::replace_for_user`] runs
//! the delete-then-insert pair inside a single transaction so two
//! concurrent logins for the same user cannot leave two rows or none.

use sqlx::sqlite::SqlitePool;

/// A persisted refresh token record.
#[derive(Debug, Clone)]
pub struct RefreshToken {
    pub id: i64,
    /// Opaque random token string, unique across all users
    pub token: String,
    pub user_id: i64,
    /// Expiry (Unix timestamp)
    pub expires_at: i64,
    /// Client IP captured at issuance
    pub ip_address: Option<String>,
    /// Device fingerprint captured at issuance
    pub device_info: Option<String>,
}

#[derive(sqlx::FromRow)]
struct RefreshTokenRow {
    id: i64,
    token: String,
    user_id: i64,
    expires_at: i64,
    ip_address: Option<String>,
    device_info: Option<String>,
}

impl From<RefreshTokenRow> for RefreshToken {
    fn from(row: RefreshTokenRow) -> Self {
        Self {
            id: row.id,
            token: row.token,
            user_id: row.user_id,
            expires_at: row.expires_at,
            ip_address: row.ip_address,
            device_info: row.device_info,
        }
    }
}

#[derive(Clone)]
pub struct RefreshTokenStore {
    pool: SqlitePool,
}

impl RefreshTokenStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Atomically replace the user's refresh token (if any) with a new one.
    /// Returns the new row ID.
    pub async fn replace_for_user(
        &self,
        user_id: i64,
        token: &str,
        expires_at: i64,
        ip_address: Option<&str>,
        device_info: Option<&str>,
    ) -> Result<i64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM refresh_tokens WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query(
            "INSERT INTO refresh_tokens (token, user_id, expires_at, ip_address, device_info) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(token)
        .bind(user_id)
        .bind(expires_at)
        .bind(ip_address)
        .bind(device_info)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(result.last_insert_rowid())
    }

    /// Get a refresh token record by its token value.
    pub async fn get_by_token(&self, token: &str) -> Result<Option<RefreshToken>, sqlx::Error> {
        let row: Option<RefreshTokenRow> = sqlx::query_as(
            "SELECT id, token, user_id, expires_at, ip_address, device_info \
             FROM refresh_tokens WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(RefreshToken::from))
    }

    /// Get the active refresh token for a user, if any.
    pub async fn get_by_user(&self, user_id: i64) -> Result<Option<RefreshToken>, sqlx::Error> {
        let row: Option<RefreshTokenRow> = sqlx::query_as(
            "SELECT id, token, user_id, expires_at, ip_address, device_info \
             FROM refresh_tokens WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(RefreshToken::from))
    }

    /// Delete a refresh token by its token value. Returns true if a row existed.
    pub async fn delete_by_token(&self, token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
