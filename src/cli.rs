//! CLI argument parsing, validation, and startup helpers.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use clap::Parser;
use tracing::{error, info};

use crate::db::Database;

/// Minimum length of the decoded signing key, in bytes.
const MIN_JWT_SECRET_BYTES: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "chatline", about = "Chat backend with JWT authentication")]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, default_value = "chatline.db")]
    pub database: String,

    /// Path to file containing the base64-encoded JWT secret.
    /// Prefer using the JWT_SECRET env var instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load the JWT secret from the environment variable or a file, then decode
/// the base64 wrapper into raw key material.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>) -> Option<Vec<u8>> {
    let secret = if let Ok(secret) = std::env::var("JWT_SECRET") {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var("JWT_SECRET") };
        secret
    } else if let Some(path) = jwt_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read JWT secret file");
                return None;
            }
        }
    } else {
        error!(
            "JWT secret is required. Set JWT_SECRET environment variable (recommended) or use --jwt-secret-file"
        );
        return None;
    };

    let key = match BASE64.decode(secret.trim()) {
        Ok(key) => key,
        Err(e) => {
            error!(error = %e, "JWT secret is not valid base64");
            return None;
        }
    };

    if key.len() < MIN_JWT_SECRET_BYTES {
        error!(
            "Decoded JWT secret is shorter than {} bytes. Use a longer secret",
            MIN_JWT_SECRET_BYTES
        );
        return None;
    }

    Some(key)
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret_file(name: &str, content: &str) -> std::path::PathBuf {
        let path =
            std::env::temp_dir().join(format!("chatline-{}-{}", name, std::process::id()));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_jwt_secret_decodes_base64() {
        let path = secret_file("secret", &BASE64.encode([7u8; 48]));

        let key = load_jwt_secret(path.to_str()).unwrap();
        assert_eq!(key, vec![7u8; 48]);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_jwt_secret_rejects_short_key() {
        let path = secret_file("short", &BASE64.encode([7u8; 16]));

        assert!(load_jwt_secret(path.to_str()).is_none());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_jwt_secret_rejects_invalid_base64() {
        let path = secret_file("badb64", "not base64 at all!!!");

        assert!(load_jwt_secret(path.to_str()).is_none());
        std::fs::remove_file(&path).ok();
    }
}
