use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// Identity fields embedded in an access token.
///
/// Everything a handler needs to act on behalf of the caller without a
/// store round-trip; no secrets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessSubject {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
}

/// Claims carried by a short-lived access token.
///
/// Stateless: never persisted server-side, validity is purely signature +
/// expiry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessClaims {
    /// Subject (user id)
    pub sub: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl AccessClaims {
    pub(crate) fn new(subject: &AccessSubject, ttl: Duration) -> (Self, DateTime<Utc>) {
        let now = Utc::now();
        let expires_at = now + ttl;

        let claims = Self {
            sub: subject.id.clone(),
            username: subject.username.clone(),
            email: subject.email.clone(),
            full_name: subject.full_name.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        (claims, expires_at)
    }
}

/// Claims carried by a long-lived refresh token.
///
/// Identity only; the rest of the session state lives server-side as the
/// user's current refresh token. The `jti` makes every issued token unique
/// even when two are minted for the same user within the same second, so
/// rotation always produces a token distinguishable from the one it
/// replaces.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefreshClaims {
    /// Subject (user id)
    pub sub: String,
    /// Unique token identifier
    pub jti: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl RefreshClaims {
    pub(crate) fn new(subject_id: &str, ttl: Duration) -> (Self, DateTime<Utc>) {
        let now = Utc::now();
        let expires_at = now + ttl;

        let claims = Self {
            sub: subject_id.to_string(),
            jti: uuid::Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        (claims, expires_at)
    }
}
