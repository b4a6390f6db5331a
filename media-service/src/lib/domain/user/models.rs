use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::DateTime;
use chrono::Utc;
use uuid::Uuid;

use crate::user::errors::AuthError;
use crate::user::errors::EmailError;
use crate::user::errors::FullNameError;
use crate::user::errors::UserIdError;
use crate::user::errors::UsernameError;

/// User aggregate entity.
///
/// The two secret-bearing fields (`password_hash`, `current_refresh_token`)
/// never leave the domain; responses are built from the sanitized view.
/// `current_refresh_token` is the whole of the server-side session state:
/// at most one refresh token is valid per user at any time.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub username: Username,
    pub email: EmailAddress,
    pub full_name: FullName,
    pub avatar_url: String,
    pub cover_image_url: Option<String>,
    pub password_hash: String,
    pub current_refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User unique identifier type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Generate a new random user ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a user ID from string.
    ///
    /// # Errors
    /// * `InvalidFormat` - String is not a valid UUID
    pub fn from_string(s: &str) -> Result<Self, UserIdError> {
        Uuid::parse_str(s)
            .map(UserId)
            .map_err(|e| UserIdError::InvalidFormat(e.to_string()))
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Username value type
///
/// Lowercased at construction; usernames are identity keys and lookups
/// always run on the normalized form. 3-32 characters, alphanumeric plus
/// underscore and hyphen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Username(String);

impl Username {
    const MIN_LENGTH: usize = 3;
    const MAX_LENGTH: usize = 32;

    /// Create a new valid, normalized username.
    ///
    /// # Errors
    /// * `Empty` - Blank after trimming
    /// * `TooShort` / `TooLong` - Outside the 3-32 character window
    /// * `InvalidCharacters` - Contains characters other than alphanumeric, _ and -
    pub fn new(username: &str) -> Result<Self, UsernameError> {
        let username = username.trim().to_lowercase();
        if username.is_empty() {
            return Err(UsernameError::Empty);
        }
        let username = Self::with_valid_length(username)?;
        let username = Self::with_valid_chars(username)?;
        Ok(Self(username))
    }

    fn with_valid_length(username: String) -> Result<String, UsernameError> {
        let length = username.len();
        if length < Self::MIN_LENGTH {
            Err(UsernameError::TooShort {
                min: Self::MIN_LENGTH,
                actual: length,
            })
        } else if length > Self::MAX_LENGTH {
            Err(UsernameError::TooLong {
                max: Self::MAX_LENGTH,
                actual: length,
            })
        } else {
            Ok(username)
        }
    }

    fn with_valid_chars(username: String) -> Result<String, UsernameError> {
        if username
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
        {
            Ok(username)
        } else {
            Err(UsernameError::InvalidCharacters)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Email address type
///
/// Lowercased at construction and validated with an RFC 5322 compliant
/// parser; like usernames, emails are identity keys looked up on the
/// normalized form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Create a new validated, normalized email address.
    ///
    /// # Errors
    /// * `Empty` - Blank after trimming
    /// * `InvalidFormat` - Does not conform to RFC 5322
    pub fn new(email: &str) -> Result<Self, EmailError> {
        let email = email.trim().to_lowercase();
        if email.is_empty() {
            return Err(EmailError::Empty);
        }
        email_address::EmailAddress::from_str(&email)
            .map(|_| EmailAddress(email))
            .map_err(|e| EmailError::InvalidFormat(e.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Full display name; required and non-empty after trimming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullName(String);

impl FullName {
    pub fn new(full_name: &str) -> Result<Self, FullNameError> {
        let full_name = full_name.trim();
        if full_name.is_empty() {
            return Err(FullNameError::Empty);
        }
        Ok(Self(full_name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FullName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Command to register a new user.
///
/// Image fields reference files already spooled to local disk by the upload
/// plumbing; the service exchanges them for hosted URLs. The avatar is
/// mandatory, the cover image optional.
#[derive(Debug)]
pub struct RegisterUserCommand {
    pub full_name: FullName,
    pub email: EmailAddress,
    pub username: Username,
    pub password: String,
    pub avatar: PathBuf,
    pub cover_image: Option<PathBuf>,
}

/// Command to authenticate an existing user.
///
/// `identity` is a username or an email; lookup matches either field on the
/// normalized form.
#[derive(Debug)]
pub struct LoginCommand {
    pub identity: String,
    pub password: String,
}

impl LoginCommand {
    /// Build a login command from an optional username / email pair.
    ///
    /// # Errors
    /// * `Validation` - neither identity field nor the password was provided
    pub fn new(
        username: Option<String>,
        email: Option<String>,
        password: String,
    ) -> Result<Self, AuthError> {
        let identity = username
            .into_iter()
            .chain(email)
            .map(|v| v.trim().to_lowercase())
            .find(|v| !v.is_empty())
            .ok_or_else(|| {
                AuthError::Validation("Username or email is required".to_string())
            })?;

        if password.is_empty() {
            return Err(AuthError::Validation("Password is required".to_string()));
        }

        Ok(Self { identity, password })
    }
}

/// Command to replace the caller's password.
#[derive(Debug)]
pub struct ChangePasswordCommand {
    pub current_password: String,
    pub new_password: String,
}

impl ChangePasswordCommand {
    /// # Errors
    /// * `Validation` - the replacement password is blank
    pub fn new(current_password: String, new_password: String) -> Result<Self, AuthError> {
        if new_password.trim().is_empty() {
            return Err(AuthError::Validation(
                "New password is required".to_string(),
            ));
        }
        Ok(Self {
            current_password,
            new_password,
        })
    }
}

/// An authenticated session: the user plus a freshly issued token pair.
///
/// Produced by login and by refresh rotation. The embedded user already
/// carries the newly persisted refresh token.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: User,
    pub access: auth::IssuedToken,
    pub refresh: auth::IssuedToken,
}
