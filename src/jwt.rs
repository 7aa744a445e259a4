//! JWT access token generation and validation.
//!
//! Access tokens are short-lived (5 minutes), stateless, and verified purely
//! by signature and time window. Refresh credentials are opaque database
//! records managed by [`crate::auth::RefreshTokenManager`], not JWTs.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::db::User;

/// Access token lifetime: 5 minutes.
pub const ACCESS_TOKEN_DURATION_SECS: u64 = 5 * 60;

/// Issuer claim stamped into every access token.
pub const TOKEN_ISSUER: &str = "chat_online_be";

/// Audience claim expected by the frontend client.
pub const TOKEN_AUDIENCE: &str = "chat_online_fe";

/// Source of "now" for claim timestamps and refresh expiry decisions.
/// Injectable so tests can pin time.
#[derive(Clone)]
pub struct Clock(Arc<dyn Fn() -> u64 + Send + Sync>);

impl Clock {
    /// Wall clock, in Unix seconds.
    pub fn system() -> Self {
        Clock(Arc::new(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs()
        }))
    }

    /// Clock frozen at a fixed instant.
    pub fn fixed(now: u64) -> Self {
        Clock(Arc::new(move || now))
    }

    pub fn now(&self) -> u64 {
        (self.0)()
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::system()
    }
}

impl std::fmt::Debug for Clock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Clock").field(&self.now()).finish()
    }
}

/// JWT claims carried by access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (user email)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Unique token id
    pub jti: String,
    /// Issuer
    pub iss: String,
    /// Audience
    pub aud: String,
    /// Not valid before (Unix timestamp)
    pub nbf: u64,
    /// Database user id
    pub user_id: i64,
    /// Display name
    pub user_name: String,
    /// Granted authority names
    pub authorities: Vec<String>,
}

/// Errors from encoding or decoding access tokens.
#[derive(Debug)]
pub enum TokenError {
    /// Structurally invalid token, bad signature, or premature use
    Malformed,
    /// Past the expiry claim
    Expired,
    /// Unexpected algorithm, issuer, or audience
    Unsupported,
    /// Error signing the token
    Encoding(jsonwebtoken::errors::Error),
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenError::Malformed => write!(f, "Malformed JWT token"),
            TokenError::Expired => write!(f, "JWT token has expired"),
            TokenError::Unsupported => write!(f, "Unsupported JWT token"),
            TokenError::Encoding(e) => write!(f, "Failed to sign token: {}", e),
        }
    }
}

impl std::error::Error for TokenError {}

/// Signing key provider plus the access token codec built on it.
///
/// Holds the symmetric key material decoded from the configured secret.
/// There is no rotation support; changing the secret invalidates every
/// outstanding access token.
#[derive(Clone)]
pub struct JwtConfig {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    clock: Clock,
}

impl JwtConfig {
    /// Create a new JWT configuration with the given raw secret bytes.
    pub fn new(secret: &[u8]) -> Self {
        Self::with_clock(secret, Clock::system())
    }

    /// Create a configuration with an explicit clock (for tests).
    pub fn with_clock(secret: &[u8], clock: Clock) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            clock,
        }
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Issue a signed access token for the user.
    pub fn issue(&self, user: &User) -> Result<String, TokenError> {
        let now = self.clock.now();

        let claims = AccessClaims {
            sub: user.email.clone(),
            iat: now,
            exp: now + ACCESS_TOKEN_DURATION_SECS,
            jti: uuid::Uuid::new_v4().to_string(),
            iss: TOKEN_ISSUER.to_string(),
            aud: TOKEN_AUDIENCE.to_string(),
            nbf: now,
            user_id: user.id,
            user_name: user.username.clone(),
            authorities: user.authorities.clone(),
        };

        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(TokenError::Encoding)
    }

    /// Parse and verify a token, returning its claims.
    /// No clock-skew leeway: exp and nbf are compared strictly.
    pub fn decode(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_nbf = true;
        validation.set_issuer(&[TOKEN_ISSUER]);
        validation.set_audience(&[TOKEN_AUDIENCE]);

        jsonwebtoken::decode::<AccessClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                jsonwebtoken::errors::ErrorKind::InvalidAlgorithm
                | jsonwebtoken::errors::ErrorKind::InvalidAlgorithmName
                | jsonwebtoken::errors::ErrorKind::InvalidIssuer
                | jsonwebtoken::errors::ErrorKind::InvalidAudience => TokenError::Unsupported,
                _ => TokenError::Malformed,
            })
    }

    /// Parse and verify a token, returning the subject claim.
    pub fn subject_of(&self, token: &str) -> Result<String, TokenError> {
        self.decode(token).map(|claims| claims.sub)
    }

    /// True iff the token's subject matches the user's email and the token
    /// has not expired. Pure function of the token and the current time.
    pub fn is_valid(&self, token: &str, user: &User) -> bool {
        match self.decode(token) {
            Ok(claims) => claims.sub == user.email && claims.exp > self.clock.now(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user() -> User {
        User {
            id: 7,
            email: "alice@example.com".to_string(),
            username: "alice".to_string(),
            password_hash: "irrelevant".to_string(),
            authorities: vec!["ROLE_USER".to_string()],
        }
    }

    fn claims_for(user: &User, iat: u64, exp: u64) -> AccessClaims {
        AccessClaims {
            sub: user.email.clone(),
            iat,
            exp,
            jti: uuid::Uuid::new_v4().to_string(),
            iss: TOKEN_ISSUER.to_string(),
            aud: TOKEN_AUDIENCE.to_string(),
            nbf: iat,
            user_id: user.id,
            user_name: user.username.clone(),
            authorities: user.authorities.clone(),
        }
    }

    #[test]
    fn test_issue_and_decode_round_trip() {
        let config = JwtConfig::new(b"test-secret-key-for-testing-12345");
        let user = test_user();

        let token = config.issue(&user).unwrap();
        let claims = config.decode(&token).unwrap();

        assert_eq!(claims.sub, "alice@example.com");
        assert_eq!(claims.iss, TOKEN_ISSUER);
        assert_eq!(claims.aud, TOKEN_AUDIENCE);
        assert_eq!(claims.user_id, 7);
        assert_eq!(claims.user_name, "alice");
        assert_eq!(claims.authorities, vec!["ROLE_USER".to_string()]);
        assert_eq!(claims.exp, claims.iat + ACCESS_TOKEN_DURATION_SECS);
        assert_eq!(claims.nbf, claims.iat);
    }

    #[test]
    fn test_subject_of_matches_email() {
        let config = JwtConfig::new(b"test-secret-key-for-testing-12345");
        let user = test_user();

        let token = config.issue(&user).unwrap();
        assert_eq!(config.subject_of(&token).unwrap(), user.email);
    }

    #[test]
    fn test_expired_token_rejected() {
        let secret = b"test-secret-key-for-testing-12345";
        let config = JwtConfig::new(secret);
        let now = Clock::system().now();

        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims_for(&test_user(), now - 400, now - 100),
            &EncodingKey::from_secret(secret),
        )
        .unwrap();

        assert!(matches!(config.subject_of(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn test_garbage_token_is_malformed() {
        let config = JwtConfig::new(b"test-secret-key-for-testing-12345");
        assert!(matches!(
            config.subject_of("not-a-jwt"),
            Err(TokenError::Malformed)
        ));
    }

    #[test]
    fn test_wrong_secret_is_malformed() {
        let config1 = JwtConfig::new(b"secret-one-secret-one-secret-one1");
        let config2 = JwtConfig::new(b"secret-two-secret-two-secret-two2");
        let token = config1.issue(&test_user()).unwrap();

        assert!(matches!(
            config2.subject_of(&token),
            Err(TokenError::Malformed)
        ));
    }

    #[test]
    fn test_unexpected_algorithm_is_unsupported() {
        let secret = b"test-secret-key-for-testing-12345";
        let config = JwtConfig::new(secret);
        let now = Clock::system().now();

        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS384),
            &claims_for(&test_user(), now, now + 300),
            &EncodingKey::from_secret(secret),
        )
        .unwrap();

        assert!(matches!(
            config.subject_of(&token),
            Err(TokenError::Unsupported)
        ));
    }

    #[test]
    fn test_wrong_issuer_is_unsupported() {
        let secret = b"test-secret-key-for-testing-12345";
        let config = JwtConfig::new(secret);
        let now = Clock::system().now();

        let mut claims = claims_for(&test_user(), now, now + 300);
        claims.iss = "someone_else".to_string();

        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret),
        )
        .unwrap();

        assert!(matches!(
            config.subject_of(&token),
            Err(TokenError::Unsupported)
        ));
    }

    #[test]
    fn test_is_valid_for_owner_only() {
        let config = JwtConfig::new(b"test-secret-key-for-testing-12345");
        let alice = test_user();
        let bob = User {
            id: 8,
            email: "bob@example.com".to_string(),
            username: "bob".to_string(),
            password_hash: "irrelevant".to_string(),
            authorities: vec!["ROLE_USER".to_string()],
        };

        let token = config.issue(&alice).unwrap();
        assert!(config.is_valid(&token, &alice));
        assert!(!config.is_valid(&token, &bob));
    }

    #[test]
    fn test_is_valid_false_for_expired() {
        let secret = b"test-secret-key-for-testing-12345";
        let config = JwtConfig::new(secret);
        let now = Clock::system().now();

        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims_for(&test_user(), now - 400, now - 100),
            &EncodingKey::from_secret(secret),
        )
        .unwrap();

        assert!(!config.is_valid(&token, &test_user()));
    }
}
