use thiserror::Error;

/// Error type for token operations.
///
/// Verification failures are typed so callers can distinguish a retry-login
/// case from a tampered credential internally. The service normalizes all of
/// them to a single external `Unauthorized` to avoid handing an attacker a
/// verification oracle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// The string is not a decodable JWT (wrong segment count, bad base64,
    /// claims that do not deserialize).
    #[error("token is malformed")]
    Malformed,

    /// The signature does not match the expected secret.
    #[error("token signature is invalid")]
    SignatureInvalid,

    /// Signature and shape are fine but the expiry has passed.
    #[error("token is expired")]
    Expired,

    /// Signing a new token failed.
    #[error("failed to sign token: {0}")]
    SigningFailed(String),
}
