use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use jsonwebtoken::decode;
use jsonwebtoken::encode;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use jsonwebtoken::Validation;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::claims::AccessClaims;
use super::claims::AccessSubject;
use super::claims::RefreshClaims;
use super::errors::TokenError;

const ALGORITHM: Algorithm = Algorithm::HS256;

/// A signed token together with its expiry instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies the two token kinds of the session lifecycle.
///
/// Access and refresh tokens are bound to **independent** secrets: leaking
/// one kind's key never forges the other kind, and the two lifetimes can be
/// tuned separately. Both secrets and both lifetimes come from configuration.
pub struct TokenCodec {
    access_keys: SigningKeys,
    refresh_keys: SigningKeys,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKeys {
    fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

impl TokenCodec {
    /// Create a codec from the two signing secrets and lifetimes.
    ///
    /// # Security Notes
    /// - Each secret should be at least 256 bits (32 bytes) for HS256
    /// - The secrets must differ; they bind the two token kinds apart
    /// - Store secrets in environment variables or vaults, never in code
    pub fn new(
        access_secret: &[u8],
        refresh_secret: &[u8],
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            access_keys: SigningKeys::from_secret(access_secret),
            refresh_keys: SigningKeys::from_secret(refresh_secret),
            access_ttl,
            refresh_ttl,
        }
    }

    /// Sign a short-lived access token for the given subject.
    ///
    /// # Errors
    /// * `SigningFailed` - claims could not be encoded
    pub fn issue_access(&self, subject: &AccessSubject) -> Result<IssuedToken, TokenError> {
        let (claims, expires_at) = AccessClaims::new(subject, self.access_ttl);
        let token = sign(&claims, &self.access_keys)?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Sign a long-lived refresh token carrying only the user id.
    ///
    /// # Errors
    /// * `SigningFailed` - claims could not be encoded
    pub fn issue_refresh(&self, subject_id: &str) -> Result<IssuedToken, TokenError> {
        let (claims, expires_at) = RefreshClaims::new(subject_id, self.refresh_ttl);
        let token = sign(&claims, &self.refresh_keys)?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Verify an access token's signature and expiry.
    ///
    /// # Errors
    /// * `Malformed` - not a decodable JWT
    /// * `SignatureInvalid` - wrong secret or tampered payload
    /// * `Expired` - the expiry instant has passed
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        verify(token, &self.access_keys)
    }

    /// Verify a refresh token's signature and expiry.
    ///
    /// Cryptographic validity only; the protocol additionally requires
    /// byte-equality with the user's persisted refresh token.
    ///
    /// # Errors
    /// * `Malformed` - not a decodable JWT
    /// * `SignatureInvalid` - wrong secret or tampered payload
    /// * `Expired` - the expiry instant has passed
    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        verify(token, &self.refresh_keys)
    }
}

fn sign<C: Serialize>(claims: &C, keys: &SigningKeys) -> Result<String, TokenError> {
    encode(&Header::new(ALGORITHM), claims, &keys.encoding)
        .map_err(|e| TokenError::SigningFailed(e.to_string()))
}

fn verify<C: DeserializeOwned>(token: &str, keys: &SigningKeys) -> Result<C, TokenError> {
    // Zero leeway: a token is invalid the second its exp passes
    let mut validation = Validation::new(ALGORITHM);
    validation.leeway = 0;

    decode::<C>(token, &keys.decoding, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::SignatureInvalid,
            _ => TokenError::Malformed,
        })
}
