mod refresh_token;
mod user;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

pub use refresh_token::{RefreshToken, RefreshTokenStore};
pub use user::{User, UserStore};

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open or create a database at the given path.
    /// Use ":memory:" for an in-memory database.
    pub async fn open(path: &str) -> Result<Self, sqlx::Error> {
        let in_memory = path == ":memory:";
        let options = if in_memory {
            SqliteConnectOptions::new().in_memory(true)
        } else {
            SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
        }
        .foreign_keys(true);

        // An in-memory database exists per connection, so the pool must not
        // grow past one or later connections would see an empty schema.
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 5 })
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Get the current schema version.
    async fn get_version(&self) -> Result<i32, sqlx::Error> {
        let result: Option<(i32,)> = sqlx::query_as("SELECT version FROM schema_version LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(result.map(|r| r.0).unwrap_or(0))
    }

    /// Set the schema version within a transaction.
    async fn set_version(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        version: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM schema_version")
            .execute(&mut **tx)
            .await?;
        sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
            .bind(version)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Run database migrations.
    async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::query("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)")
            .execute(&self.pool)
            .await?;

        let version = self.get_version().await?;

        if version < 1 {
            self.migrate_v1().await?;
        }

        Ok(())
    }

    /// Execute a list of queries in a transaction, then set the version.
    async fn run_migration(
        &self,
        version: i32,
        queries: &[&'static str],
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        for query in queries {
            sqlx::query(*query).execute(&mut *tx).await?;
        }
        Self::set_version(&mut tx, version).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn migrate_v1(&self) -> Result<(), sqlx::Error> {
        self.run_migration(
            1,
            &[
                // Users table. Authorities are stored as a space-separated
                // list of role names.
                "CREATE TABLE users (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    email TEXT UNIQUE NOT NULL COLLATE NOCASE,
                    username TEXT UNIQUE NOT NULL COLLATE NOCASE,
                    password_hash TEXT NOT NULL,
                    authorities TEXT NOT NULL DEFAULT 'ROLE_USER',
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                "CREATE INDEX idx_users_email ON users(email)",
                // Refresh tokens table. The UNIQUE constraint on user_id
                // enforces at most one active refresh token per user; the
                // one on token makes lookup by token value unambiguous.
                "CREATE TABLE refresh_tokens (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    token TEXT UNIQUE NOT NULL,
                    user_id INTEGER UNIQUE NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    expires_at INTEGER NOT NULL,
                    ip_address TEXT,
                    device_info TEXT,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                "CREATE INDEX idx_refresh_tokens_token ON refresh_tokens(token)",
            ],
        )
        .await
    }

    /// Get the user store.
    pub fn users(&self) -> UserStore {
        UserStore::new(self.pool.clone())
    }

    /// Get the refresh token store.
    pub fn refresh_tokens(&self) -> RefreshTokenStore {
        RefreshTokenStore::new(self.pool.clone())
    }

    /// Get the underlying connection pool (for tests that need raw SQL access).
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_get_user() {
        let db = Database::open(":memory:").await.unwrap();

        let id = db
            .users()
            .create("alice@example.com", "alice", "hash", &["ROLE_USER".into()])
            .await
            .unwrap();

        let user = db
            .users()
            .get_by_email("alice@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.username, "alice");
        assert_eq!(user.authorities, vec!["ROLE_USER".to_string()]);

        let user = db.users().get_by_id(id).await.unwrap().unwrap();
        assert_eq!(user.email, "alice@example.com");
    }

    #[tokio::test]
    async fn test_exists_by_email() {
        let db = Database::open(":memory:").await.unwrap();

        assert!(!db.users().exists_by_email("alice@example.com").await.unwrap());

        db.users()
            .create("alice@example.com", "alice", "hash", &["ROLE_USER".into()])
            .await
            .unwrap();

        assert!(db.users().exists_by_email("alice@example.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_email_fails() {
        let db = Database::open(":memory:").await.unwrap();

        db.users()
            .create("alice@example.com", "alice", "hash", &["ROLE_USER".into()])
            .await
            .unwrap();
        let result = db
            .users()
            .create("alice@example.com", "alice2", "hash", &["ROLE_USER".into()])
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_multiple_authorities_round_trip() {
        let db = Database::open(":memory:").await.unwrap();

        let id = db
            .users()
            .create(
                "root@example.com",
                "root",
                "hash",
                &["ROLE_USER".into(), "ROLE_ADMIN".into()],
            )
            .await
            .unwrap();

        let user = db.users().get_by_id(id).await.unwrap().unwrap();
        assert_eq!(
            user.authorities,
            vec!["ROLE_USER".to_string(), "ROLE_ADMIN".to_string()]
        );
    }

    #[tokio::test]
    async fn test_replace_for_user_keeps_single_row() {
        let db = Database::open(":memory:").await.unwrap();
        let user_id = db
            .users()
            .create("alice@example.com", "alice", "hash", &["ROLE_USER".into()])
            .await
            .unwrap();

        db.refresh_tokens()
            .replace_for_user(user_id, "token-1", 100, Some("1.1.1.1"), Some("A"))
            .await
            .unwrap();
        db.refresh_tokens()
            .replace_for_user(user_id, "token-2", 200, Some("1.1.1.1"), Some("A"))
            .await
            .unwrap();

        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM refresh_tokens WHERE user_id = ?")
                .bind(user_id)
                .fetch_one(db.pool())
                .await
                .unwrap();
        assert_eq!(count.0, 1);

        assert!(db.refresh_tokens().get_by_token("token-1").await.unwrap().is_none());
        assert!(db.refresh_tokens().get_by_token("token-2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_deleting_user_cascades_to_refresh_token() {
        let db = Database::open(":memory:").await.unwrap();
        let user_id = db
            .users()
            .create("alice@example.com", "alice", "hash", &["ROLE_USER".into()])
            .await
            .unwrap();

        db.refresh_tokens()
            .replace_for_user(user_id, "token-1", 100, None, None)
            .await
            .unwrap();

        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id)
            .execute(db.pool())
            .await
            .unwrap();

        assert!(db.refresh_tokens().get_by_token("token-1").await.unwrap().is_none());
    }
}
