//! Authentication primitives for the media service
//!
//! Provides the two cryptographic building blocks of the session lifecycle:
//! - Password hashing (Argon2id)
//! - Dual-secret token issuance and verification (access + refresh JWTs)
//!
//! The service defines its own session protocol on top of these; this crate
//! stays free of persistence and transport concerns so it can be reused and
//! tested in isolation.
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use auth::PasswordHasher;
//!
//! let hasher = PasswordHasher::new();
//! let digest = hasher.hash("my_password").unwrap();
//! assert!(hasher.verify("my_password", &digest).unwrap());
//! assert!(!hasher.verify("not_my_password", &digest).unwrap());
//! ```
//!
//! ## Token Pair
//! ```
//! use auth::{AccessSubject, TokenCodec};
//! use chrono::Duration;
//!
//! let codec = TokenCodec::new(
//!     b"access_secret_at_least_32_bytes_long!",
//!     b"refresh_secret_at_least_32_bytes_ok!",
//!     Duration::minutes(15),
//!     Duration::days(10),
//! );
//!
//! let subject = AccessSubject {
//!     id: "user-1".to_string(),
//!     username: "alice".to_string(),
//!     email: "alice@example.com".to_string(),
//!     full_name: "Alice A".to_string(),
//! };
//!
//! let access = codec.issue_access(&subject).unwrap();
//! let claims = codec.verify_access(&access.token).unwrap();
//! assert_eq!(claims.sub, "user-1");
//!
//! let refresh = codec.issue_refresh("user-1").unwrap();
//! let claims = codec.verify_refresh(&refresh.token).unwrap();
//! assert_eq!(claims.sub, "user-1");
//! ```

pub mod password;
pub mod token;

// Re-export commonly used items
pub use password::PasswordError;
pub use password::PasswordHasher;
pub use token::AccessClaims;
pub use token::AccessSubject;
pub use token::IssuedToken;
pub use token::RefreshClaims;
pub use token::TokenCodec;
pub use token::TokenError;
