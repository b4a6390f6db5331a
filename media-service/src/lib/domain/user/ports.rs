use std::path::Path;

use async_trait::async_trait;

use crate::domain::user::models::AuthSession;
use crate::domain::user::models::ChangePasswordCommand;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::LoginCommand;
use crate::domain::user::models::RegisterUserCommand;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::models::Username;
use crate::user::errors::AuthError;
use crate::user::errors::UploadError;

/// Port for the credential and session protocol.
///
/// Object-safe so the HTTP layer and tests can hold it behind
/// `Arc<dyn AuthServicePort>`.
#[async_trait]
pub trait AuthServicePort: Send + Sync + 'static {
    /// Register a new account.
    ///
    /// The password is hashed before any persistence; the avatar reference
    /// must resolve to a hosted URL or the whole operation aborts.
    ///
    /// # Errors
    /// * `IdentityAlreadyExists` / `UsernameAlreadyExists` / `EmailAlreadyExists` - duplicate identity
    /// * `Validation` - missing avatar or unresolvable avatar upload
    /// * `Database` - store operation failed
    async fn register(&self, command: RegisterUserCommand) -> Result<User, AuthError>;

    /// Verify credentials and open a session.
    ///
    /// Issues an access + refresh pair and persists the refresh token as the
    /// user's single current session.
    ///
    /// # Errors
    /// * `NotFound` - no user with that username or email
    /// * `InvalidCredentials` - password mismatch
    async fn login(&self, command: LoginCommand) -> Result<AuthSession, AuthError>;

    /// Revoke the user's session by clearing the stored refresh token.
    ///
    /// Idempotent: logging out an already logged-out user succeeds.
    async fn logout(&self, user_id: &UserId) -> Result<(), AuthError>;

    /// Exchange a refresh token for a fresh access + refresh pair.
    ///
    /// The presented token must verify cryptographically AND equal the
    /// persisted current token byte-for-byte; the old token is dead the
    /// moment the new pair lands.
    ///
    /// # Errors
    /// * `InvalidRefreshToken` - tampered, expired, malformed, or unknown subject
    /// * `StaleRefreshToken` - valid signature but already rotated away or logged out
    async fn refresh_session(&self, presented: &str) -> Result<AuthSession, AuthError>;

    /// Replace the caller's password after verifying the current one.
    ///
    /// Deliberately leaves the stored refresh token untouched: an open
    /// session survives a password change (see DESIGN.md).
    ///
    /// # Errors
    /// * `InvalidCredentials` - current password mismatch
    /// * `NotFound` - user vanished between authentication and update
    async fn change_password(
        &self,
        user_id: &UserId,
        command: ChangePasswordCommand,
    ) -> Result<(), AuthError>;

    /// Resolve a bearer access token to its user.
    ///
    /// Every failure surfaces as `InvalidAccessToken`; the distinct causes
    /// (bad signature, expiry, unknown id) are logged but never
    /// distinguished for the caller.
    async fn authenticate_access(&self, token: &str) -> Result<User, AuthError>;
}

/// Persistence operations for the user aggregate.
///
/// The store is expected to enforce uniqueness on username and email; a
/// unique violation at insert time surfaces as the same conflict error as
/// the protocol's pre-check.
#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Persist a new user.
    ///
    /// # Errors
    /// * `UsernameAlreadyExists` / `EmailAlreadyExists` - unique constraint violation
    /// * `Database` - store operation failed
    async fn create(&self, user: User) -> Result<User, AuthError>;

    /// Retrieve a user by identifier.
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, AuthError>;

    /// Retrieve a user whose username OR email equals the given normalized
    /// identity.
    async fn find_by_identity(&self, identity: &str) -> Result<Option<User>, AuthError>;

    /// Existence probe used by registration's duplicate pre-check.
    async fn find_by_username_or_email(
        &self,
        username: &Username,
        email: &EmailAddress,
    ) -> Result<Option<User>, AuthError>;

    /// Overwrite the user's current refresh token; `None` clears it.
    ///
    /// Must be a single atomic field write. Idempotent. Used by login
    /// (which may legitimately displace an existing session) and logout.
    async fn set_refresh_token(
        &self,
        id: &UserId,
        token: Option<&str>,
    ) -> Result<(), AuthError>;

    /// Compare-and-swap the current refresh token.
    ///
    /// Writes `replacement` only if the stored value still equals
    /// `expected`; returns false when it no longer does. This closes the
    /// window between rotation's equality check and its write: of two
    /// concurrent rotations presenting the same token, exactly one wins.
    async fn swap_refresh_token(
        &self,
        id: &UserId,
        expected: &str,
        replacement: &str,
    ) -> Result<bool, AuthError>;

    /// Replace the user's password digest wholesale.
    async fn update_password_hash(&self, id: &UserId, digest: &str) -> Result<(), AuthError>;
}

/// Media upload collaborator: local file in, hosted URL out.
#[async_trait]
pub trait MediaUploader: Send + Sync + 'static {
    /// Push a locally spooled file to the media store.
    ///
    /// # Returns
    /// The hosted URL of the uploaded file
    async fn upload(&self, local_path: &Path) -> Result<String, UploadError>;
}
