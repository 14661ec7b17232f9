//! Bearer-token authentication gate.
//!
//! Every transport must present a signed token before it is admitted to
//! the connection registry; verification failure terminates the attempt
//! before any registry mutation. The check is one-shot at connection
//! establishment, not re-verified per message.

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use pairchat_proto::user::UserId;

/// Claims carried in a `PairChat` bearer token (HS256).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// The authenticated user's ID.
    pub sub: String,
    /// Issued-at, seconds since the UNIX epoch.
    pub iat: i64,
    /// Expiry, seconds since the UNIX epoch.
    pub exp: i64,
}

/// Why a connection attempt was rejected before admission.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No credential arrived within the authentication window.
    #[error("no credential presented within the authentication window")]
    DeadlineExpired,

    /// The transport closed before presenting a credential.
    #[error("connection closed before authentication")]
    ConnectionClosed,

    /// The first frame was not a credential.
    #[error("expected a credential as the first frame")]
    CredentialExpected,

    /// The token failed signature or expiry verification.
    #[error("invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    /// The token verified but names a user the directory does not know.
    #[error("unknown user id {0}")]
    UnknownUser(UserId),
}

/// Issues a signed token for `user_id`, valid for `ttl_secs` seconds.
///
/// Login lives with the account collaborator; this is exposed for that
/// collaborator and for tests.
///
/// # Errors
///
/// Returns a [`jsonwebtoken`] error if signing fails.
pub fn issue_token(
    secret: &[u8],
    user_id: &str,
    ttl_secs: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now,
        exp: now + ttl_secs,
    };
    jsonwebtoken::encode(
        &Header::default(), // HS256
        &claims,
        &EncodingKey::from_secret(secret),
    )
}

/// Verifies a token's signature and expiry and returns its claims.
///
/// # Errors
///
/// Returns [`AuthError::InvalidToken`] for a bad signature, malformed
/// token, or expired claims.
pub fn verify_token(secret: &[u8], token: &str) -> Result<Claims, AuthError> {
    let validation = Validation::new(jsonwebtoken::Algorithm::HS256);
    let data = jsonwebtoken::decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation)?;
    Ok(data.claims)
}
