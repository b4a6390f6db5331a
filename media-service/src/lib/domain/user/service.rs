use std::sync::Arc;

use async_trait::async_trait;
use auth::AccessSubject;
use auth::PasswordHasher;
use auth::TokenCodec;
use chrono::Utc;

use crate::domain::user::models::AuthSession;
use crate::domain::user::models::ChangePasswordCommand;
use crate::domain::user::models::LoginCommand;
use crate::domain::user::models::RegisterUserCommand;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::user::errors::AuthError;
use crate::user::ports::AuthServicePort;
use crate::user::ports::MediaUploader;
use crate::user::ports::UserRepository;

/// The credential and session protocol.
///
/// Orchestrates the password hasher, the token codec, the user store, and
/// the media uploader; all collaborators are injected at construction.
pub struct AuthService<UR, MU>
where
    UR: UserRepository,
    MU: MediaUploader,
{
    repository: Arc<UR>,
    media: Arc<MU>,
    password_hasher: PasswordHasher,
    token_codec: Arc<TokenCodec>,
}

impl<UR, MU> AuthService<UR, MU>
where
    UR: UserRepository,
    MU: MediaUploader,
{
    pub fn new(repository: Arc<UR>, media: Arc<MU>, token_codec: Arc<TokenCodec>) -> Self {
        Self {
            repository,
            media,
            password_hasher: PasswordHasher::new(),
            token_codec,
        }
    }

    /// Sign a fresh access + refresh pair for the user. Pure issuance; the
    /// caller decides how the refresh token is persisted.
    fn issue_pair(
        &self,
        user: &User,
    ) -> Result<(auth::IssuedToken, auth::IssuedToken), AuthError> {
        let subject = AccessSubject {
            id: user.id.to_string(),
            username: user.username.as_str().to_string(),
            email: user.email.as_str().to_string(),
            full_name: user.full_name.as_str().to_string(),
        };

        let access = self
            .token_codec
            .issue_access(&subject)
            .map_err(|e| AuthError::Token(e.to_string()))?;
        let refresh = self
            .token_codec
            .issue_refresh(&subject.id)
            .map_err(|e| AuthError::Token(e.to_string()))?;

        Ok((access, refresh))
    }
}

fn assemble_session(
    mut user: User,
    access: auth::IssuedToken,
    refresh: auth::IssuedToken,
) -> AuthSession {
    user.current_refresh_token = Some(refresh.token.clone());
    AuthSession {
        user,
        access,
        refresh,
    }
}

#[async_trait]
impl<UR, MU> AuthServicePort for AuthService<UR, MU>
where
    UR: UserRepository,
    MU: MediaUploader,
{
    async fn register(&self, command: RegisterUserCommand) -> Result<User, AuthError> {
        // Pre-check is advisory; the store's unique constraints are the
        // backstop for the concurrent-registration window.
        if self
            .repository
            .find_by_username_or_email(&command.username, &command.email)
            .await?
            .is_some()
        {
            return Err(AuthError::IdentityAlreadyExists);
        }

        let password_hash = self.password_hasher.hash(&command.password)?;

        let avatar_url = self.media.upload(&command.avatar).await.map_err(|e| {
            tracing::warn!(cause = %e, "Avatar upload failed during registration");
            AuthError::Validation("Avatar file is required".to_string())
        })?;

        let cover_image_url = match &command.cover_image {
            Some(path) => match self.media.upload(path).await {
                Ok(url) => Some(url),
                Err(e) => {
                    // Cover image stays optional even when its upload fails
                    tracing::warn!(cause = %e, "Cover image upload failed, continuing without it");
                    None
                }
            },
            None => None,
        };

        let now = Utc::now();
        let user = User {
            id: UserId::new(),
            username: command.username,
            email: command.email,
            full_name: command.full_name,
            avatar_url,
            cover_image_url,
            password_hash,
            current_refresh_token: None,
            created_at: now,
            updated_at: now,
        };

        let created = self.repository.create(user).await?;

        tracing::info!(user_id = %created.id, username = %created.username, "User registered");

        Ok(created)
    }

    async fn login(&self, command: LoginCommand) -> Result<AuthSession, AuthError> {
        let user = self
            .repository
            .find_by_identity(&command.identity)
            .await?
            .ok_or(AuthError::NotFound)?;

        let password_matches = self
            .password_hasher
            .verify(&command.password, &user.password_hash)?;
        if !password_matches {
            return Err(AuthError::InvalidCredentials);
        }

        // Login unconditionally displaces whatever session existed; a second
        // device logging in invalidates the first device's refresh token.
        let (access, refresh) = self.issue_pair(&user)?;
        self.repository
            .set_refresh_token(&user.id, Some(&refresh.token))
            .await?;

        tracing::info!(user_id = %user.id, "User logged in");

        Ok(assemble_session(user, access, refresh))
    }

    async fn logout(&self, user_id: &UserId) -> Result<(), AuthError> {
        self.repository.set_refresh_token(user_id, None).await?;

        tracing::info!(user_id = %user_id, "User logged out");

        Ok(())
    }

    async fn refresh_session(&self, presented: &str) -> Result<AuthSession, AuthError> {
        let claims = self.token_codec.verify_refresh(presented).map_err(|e| {
            tracing::warn!(cause = %e, "Refresh token failed verification");
            AuthError::InvalidRefreshToken
        })?;

        let user_id =
            UserId::from_string(&claims.sub).map_err(|_| AuthError::InvalidRefreshToken)?;

        let user = self
            .repository
            .find_by_id(&user_id)
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;

        // Replay defense: a rotated-away or cleared token is dead even while
        // cryptographically unexpired.
        match &user.current_refresh_token {
            Some(current) if current == presented => {}
            _ => {
                tracing::warn!(user_id = %user_id, "Stale refresh token presented");
                return Err(AuthError::StaleRefreshToken);
            }
        }

        // Compare-and-swap: the write lands only while the presented token
        // is still current, so of two concurrent rotations exactly one wins
        // and the loser is told its token has been used.
        let (access, refresh) = self.issue_pair(&user)?;
        let swapped = self
            .repository
            .swap_refresh_token(&user_id, presented, &refresh.token)
            .await?;
        if !swapped {
            tracing::warn!(user_id = %user_id, "Refresh token rotated away concurrently");
            return Err(AuthError::StaleRefreshToken);
        }

        tracing::info!(user_id = %user_id, "Session rotated");

        Ok(assemble_session(user, access, refresh))
    }

    async fn change_password(
        &self,
        user_id: &UserId,
        command: ChangePasswordCommand,
    ) -> Result<(), AuthError> {
        let user = self
            .repository
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::NotFound)?;

        let current_matches = self
            .password_hasher
            .verify(&command.current_password, &user.password_hash)?;
        if !current_matches {
            return Err(AuthError::InvalidCredentials);
        }

        let digest = self.password_hasher.hash(&command.new_password)?;
        self.repository
            .update_password_hash(user_id, &digest)
            .await?;

        // The stored refresh token is intentionally left as-is: a password
        // change does not end the session.
        tracing::info!(user_id = %user_id, "Password changed");

        Ok(())
    }

    async fn authenticate_access(&self, token: &str) -> Result<User, AuthError> {
        let claims = self.token_codec.verify_access(token).map_err(|e| {
            tracing::warn!(cause = %e, "Access token failed verification");
            AuthError::InvalidAccessToken
        })?;

        let user_id = UserId::from_string(&claims.sub).map_err(|_| AuthError::InvalidAccessToken)?;

        // Unknown id maps to the same error as a bad token so responses never
        // reveal whether an identity exists.
        self.repository
            .find_by_id(&user_id)
            .await?
            .ok_or(AuthError::InvalidAccessToken)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::path::PathBuf;

    use chrono::Duration;
    use mockall::mock;
    use mockall::predicate::*;

    use super::*;
    use crate::domain::user::models::EmailAddress;
    use crate::domain::user::models::FullName;
    use crate::domain::user::models::Username;
    use crate::user::errors::UploadError;

    // Define mocks in the test module using mockall
    mock! {
        pub TestUserRepository {}

        #[async_trait]
        impl UserRepository for TestUserRepository {
            async fn create(&self, user: User) -> Result<User, AuthError>;
            async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, AuthError>;
            async fn find_by_identity(&self, identity: &str) -> Result<Option<User>, AuthError>;
            async fn find_by_username_or_email(
                &self,
                username: &Username,
                email: &EmailAddress,
            ) -> Result<Option<User>, AuthError>;
            async fn set_refresh_token(
                &self,
                id: &UserId,
                token: Option<&str>,
            ) -> Result<(), AuthError>;
            async fn swap_refresh_token(
                &self,
                id: &UserId,
                expected: &str,
                replacement: &str,
            ) -> Result<bool, AuthError>;
            async fn update_password_hash(&self, id: &UserId, digest: &str) -> Result<(), AuthError>;
        }
    }

    mock! {
        pub TestMediaUploader {}

        #[async_trait]
        impl MediaUploader for TestMediaUploader {
            async fn upload(&self, local_path: &Path) -> Result<String, UploadError>;
        }
    }

    fn codec() -> Arc<TokenCodec> {
        Arc::new(TokenCodec::new(
            b"access_secret_at_least_32_bytes_long!",
            b"refresh_secret_at_least_32_bytes_ok!",
            Duration::minutes(15),
            Duration::days(10),
        ))
    }

    fn service(
        repository: MockTestUserRepository,
        media: MockTestMediaUploader,
        token_codec: Arc<TokenCodec>,
    ) -> AuthService<MockTestUserRepository, MockTestMediaUploader> {
        AuthService::new(Arc::new(repository), Arc::new(media), token_codec)
    }

    fn test_user(password_hash: String) -> User {
        let now = Utc::now();
        User {
            id: UserId::new(),
            username: Username::new("alice").unwrap(),
            email: EmailAddress::new("a@x.com").unwrap(),
            full_name: FullName::new("Alice A").unwrap(),
            avatar_url: "https://cdn.test/x.png".to_string(),
            cover_image_url: None,
            password_hash,
            current_refresh_token: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn register_command() -> RegisterUserCommand {
        RegisterUserCommand {
            full_name: FullName::new("Alice A").unwrap(),
            email: EmailAddress::new("a@x.com").unwrap(),
            username: Username::new("alice").unwrap(),
            password: "pw123".to_string(),
            avatar: PathBuf::from("/tmp/uploads/x.png"),
            cover_image: None,
        }
    }

    #[tokio::test]
    async fn test_register_success() {
        let mut repository = MockTestUserRepository::new();
        let mut media = MockTestMediaUploader::new();

        repository
            .expect_find_by_username_or_email()
            .times(1)
            .returning(|_, _| Ok(None));

        media
            .expect_upload()
            .times(1)
            .returning(|_| Ok("https://cdn.test/x.png".to_string()));

        repository
            .expect_create()
            .withf(|user| {
                user.username.as_str() == "alice"
                    && user.password_hash.starts_with("$argon2")
                    && user.password_hash != "pw123"
                    && user.avatar_url == "https://cdn.test/x.png"
                    && user.cover_image_url.is_none()
                    && user.current_refresh_token.is_none()
            })
            .times(1)
            .returning(|user| Ok(user));

        let service = service(repository, media, codec());

        let created = service.register(register_command()).await.unwrap();
        assert_eq!(created.username.as_str(), "alice");
        assert!(created.password_hash.starts_with("$argon2"));
    }

    #[tokio::test]
    async fn test_register_uploads_optional_cover() {
        let mut repository = MockTestUserRepository::new();
        let mut media = MockTestMediaUploader::new();

        repository
            .expect_find_by_username_or_email()
            .times(1)
            .returning(|_, _| Ok(None));

        media.expect_upload().times(2).returning(|path| {
            Ok(format!(
                "https://cdn.test/{}",
                path.file_name().unwrap().to_string_lossy()
            ))
        });

        repository
            .expect_create()
            .withf(|user| {
                user.avatar_url == "https://cdn.test/avatar.png"
                    && user.cover_image_url.as_deref() == Some("https://cdn.test/cover.png")
            })
            .times(1)
            .returning(|user| Ok(user));

        let service = service(repository, media, codec());

        let command = RegisterUserCommand {
            avatar: PathBuf::from("/tmp/uploads/avatar.png"),
            cover_image: Some(PathBuf::from("/tmp/uploads/cover.png")),
            ..register_command()
        };

        assert!(service.register(command).await.is_ok());
    }

    #[tokio::test]
    async fn test_register_duplicate_identity_mutates_nothing() {
        let mut repository = MockTestUserRepository::new();
        let mut media = MockTestMediaUploader::new();

        repository
            .expect_find_by_username_or_email()
            .times(1)
            .returning(|_, _| Ok(Some(test_user("$argon2id$hash".to_string()))));

        media.expect_upload().times(0);
        repository.expect_create().times(0);

        let service = service(repository, media, codec());

        let result = service.register(register_command()).await;
        assert!(matches!(
            result.unwrap_err(),
            AuthError::IdentityAlreadyExists
        ));
    }

    #[tokio::test]
    async fn test_register_failed_avatar_upload_aborts() {
        let mut repository = MockTestUserRepository::new();
        let mut media = MockTestMediaUploader::new();

        repository
            .expect_find_by_username_or_email()
            .times(1)
            .returning(|_, _| Ok(None));

        media
            .expect_upload()
            .times(1)
            .returning(|_| Err(UploadError::Rejected(502)));

        repository.expect_create().times(0);

        let service = service(repository, media, codec());

        let result = service.register(register_command()).await;
        assert!(matches!(result.unwrap_err(), AuthError::Validation(_)));
    }

    #[tokio::test]
    async fn test_register_failed_cover_upload_degrades_to_none() {
        let mut repository = MockTestUserRepository::new();
        let mut media = MockTestMediaUploader::new();

        repository
            .expect_find_by_username_or_email()
            .times(1)
            .returning(|_, _| Ok(None));

        media.expect_upload().times(2).returning(|path| {
            if path.ends_with("cover.png") {
                Err(UploadError::Rejected(502))
            } else {
                Ok("https://cdn.test/avatar.png".to_string())
            }
        });

        repository
            .expect_create()
            .withf(|user| user.cover_image_url.is_none())
            .times(1)
            .returning(|user| Ok(user));

        let service = service(repository, media, codec());

        let command = RegisterUserCommand {
            avatar: PathBuf::from("/tmp/uploads/avatar.png"),
            cover_image: Some(PathBuf::from("/tmp/uploads/cover.png")),
            ..register_command()
        };

        assert!(service.register(command).await.is_ok());
    }

    #[tokio::test]
    async fn test_register_insert_conflict_surfaces_as_conflict() {
        // The unique-constraint backstop for the pre-check race
        let mut repository = MockTestUserRepository::new();
        let mut media = MockTestMediaUploader::new();

        repository
            .expect_find_by_username_or_email()
            .times(1)
            .returning(|_, _| Ok(None));

        media
            .expect_upload()
            .times(1)
            .returning(|_| Ok("https://cdn.test/x.png".to_string()));

        repository
            .expect_create()
            .times(1)
            .returning(|user| Err(AuthError::UsernameAlreadyExists(user.username.to_string())));

        let service = service(repository, media, codec());

        let result = service.register(register_command()).await;
        assert!(matches!(
            result.unwrap_err(),
            AuthError::UsernameAlreadyExists(_)
        ));
    }

    #[tokio::test]
    async fn test_login_success_persists_issued_refresh_token() {
        let token_codec = codec();
        let hasher = PasswordHasher::new();
        let user = test_user(hasher.hash("pw123").unwrap());
        let user_id = user.id;

        let mut repository = MockTestUserRepository::new();
        let media = MockTestMediaUploader::new();

        let returned_user = user.clone();
        repository
            .expect_find_by_identity()
            .withf(|identity| identity == "alice")
            .times(1)
            .returning(move |_| Ok(Some(returned_user.clone())));

        repository
            .expect_set_refresh_token()
            .withf(move |id, token| *id == user_id && matches!(token, Some(t) if !t.is_empty()))
            .times(1)
            .returning(|_, _| Ok(()));

        let service = service(repository, media, Arc::clone(&token_codec));

        let command = LoginCommand::new(Some("alice".to_string()), None, "pw123".to_string())
            .unwrap();
        let session = service.login(command).await.unwrap();

        // Two distinct non-empty tokens, refresh mirrored onto the user
        assert!(!session.access.token.is_empty());
        assert!(!session.refresh.token.is_empty());
        assert_ne!(session.access.token, session.refresh.token);
        assert_eq!(
            session.user.current_refresh_token.as_deref(),
            Some(session.refresh.token.as_str())
        );

        let claims = token_codec.verify_refresh(&session.refresh.token).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
    }

    #[tokio::test]
    async fn test_login_unknown_identity() {
        let mut repository = MockTestUserRepository::new();
        let media = MockTestMediaUploader::new();

        repository
            .expect_find_by_identity()
            .times(1)
            .returning(|_| Ok(None));
        repository.expect_set_refresh_token().times(0);

        let service = service(repository, media, codec());

        let command =
            LoginCommand::new(Some("ghost".to_string()), None, "pw123".to_string()).unwrap();
        let result = service.login(command).await;
        assert!(matches!(result.unwrap_err(), AuthError::NotFound));
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let hasher = PasswordHasher::new();
        let user = test_user(hasher.hash("pw123").unwrap());

        let mut repository = MockTestUserRepository::new();
        let media = MockTestMediaUploader::new();

        repository
            .expect_find_by_identity()
            .times(1)
            .returning(move |_| Ok(Some(user.clone())));
        repository.expect_set_refresh_token().times(0);

        let service = service(repository, media, codec());

        let command =
            LoginCommand::new(Some("alice".to_string()), None, "wrong".to_string()).unwrap();
        let result = service.login(command).await;
        assert!(matches!(result.unwrap_err(), AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_refresh_rotation_replaces_stored_token() {
        let token_codec = codec();
        let mut user = test_user("$argon2id$hash".to_string());
        let user_id = user.id;

        let presented = token_codec.issue_refresh(&user_id.to_string()).unwrap();
        user.current_refresh_token = Some(presented.token.clone());

        let mut repository = MockTestUserRepository::new();
        let media = MockTestMediaUploader::new();

        let returned_user = user.clone();
        repository
            .expect_find_by_id()
            .withf(move |id| *id == user_id)
            .times(1)
            .returning(move |_| Ok(Some(returned_user.clone())));

        let old_token = presented.token.clone();
        repository
            .expect_swap_refresh_token()
            .withf(move |id, expected, replacement| {
                *id == user_id && expected == old_token && replacement != old_token
            })
            .times(1)
            .returning(|_, _, _| Ok(true));

        let service = service(repository, media, token_codec);

        let session = service.refresh_session(&presented.token).await.unwrap();
        assert_ne!(session.refresh.token, presented.token);
        assert_eq!(
            session.user.current_refresh_token.as_deref(),
            Some(session.refresh.token.as_str())
        );
    }

    #[tokio::test]
    async fn test_refresh_losing_concurrent_rotation_is_rejected() {
        // Equality pre-check passes but the compare-and-swap write loses
        let token_codec = codec();
        let mut user = test_user("$argon2id$hash".to_string());
        let user_id = user.id;

        let presented = token_codec.issue_refresh(&user_id.to_string()).unwrap();
        user.current_refresh_token = Some(presented.token.clone());

        let mut repository = MockTestUserRepository::new();
        let media = MockTestMediaUploader::new();

        repository
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(user.clone())));
        repository
            .expect_swap_refresh_token()
            .times(1)
            .returning(|_, _, _| Ok(false));

        let service = service(repository, media, token_codec);

        let result = service.refresh_session(&presented.token).await;
        assert!(matches!(result.unwrap_err(), AuthError::StaleRefreshToken));
    }

    #[tokio::test]
    async fn test_refresh_with_rotated_away_token_is_rejected() {
        // R1 is unexpired but no longer the stored token
        let token_codec = codec();
        let mut user = test_user("$argon2id$hash".to_string());
        let user_id = user.id;

        let stale = token_codec.issue_refresh(&user_id.to_string()).unwrap();
        let current = token_codec.issue_refresh(&user_id.to_string()).unwrap();
        user.current_refresh_token = Some(current.token.clone());

        let mut repository = MockTestUserRepository::new();
        let media = MockTestMediaUploader::new();

        repository
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(user.clone())));
        repository.expect_swap_refresh_token().times(0);

        let service = service(repository, media, token_codec);

        let result = service.refresh_session(&stale.token).await;
        assert!(matches!(result.unwrap_err(), AuthError::StaleRefreshToken));
    }

    #[tokio::test]
    async fn test_refresh_after_logout_is_rejected() {
        let token_codec = codec();
        let mut user = test_user("$argon2id$hash".to_string());
        let user_id = user.id;

        let presented = token_codec.issue_refresh(&user_id.to_string()).unwrap();
        user.current_refresh_token = None;

        let mut repository = MockTestUserRepository::new();
        let media = MockTestMediaUploader::new();

        repository
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(user.clone())));
        repository.expect_swap_refresh_token().times(0);

        let service = service(repository, media, token_codec);

        let result = service.refresh_session(&presented.token).await;
        assert!(matches!(result.unwrap_err(), AuthError::StaleRefreshToken));
    }

    #[tokio::test]
    async fn test_refresh_with_garbage_token() {
        let repository = MockTestUserRepository::new();
        let media = MockTestMediaUploader::new();

        let service = service(repository, media, codec());

        let result = service.refresh_session("not.a.token").await;
        assert!(matches!(
            result.unwrap_err(),
            AuthError::InvalidRefreshToken
        ));
    }

    #[tokio::test]
    async fn test_refresh_with_expired_token() {
        let expired_codec = Arc::new(TokenCodec::new(
            b"access_secret_at_least_32_bytes_long!",
            b"refresh_secret_at_least_32_bytes_ok!",
            Duration::minutes(-5),
            Duration::minutes(-5),
        ));

        let repository = MockTestUserRepository::new();
        let media = MockTestMediaUploader::new();

        let presented = expired_codec.issue_refresh("user-1").unwrap();
        let service = service(repository, media, expired_codec);

        let result = service.refresh_session(&presented.token).await;
        assert!(matches!(
            result.unwrap_err(),
            AuthError::InvalidRefreshToken
        ));
    }

    #[tokio::test]
    async fn test_refresh_with_unknown_subject() {
        let token_codec = codec();
        let presented = token_codec
            .issue_refresh(&UserId::new().to_string())
            .unwrap();

        let mut repository = MockTestUserRepository::new();
        let media = MockTestMediaUploader::new();

        repository
            .expect_find_by_id()
            .times(1)
            .returning(|_| Ok(None));

        let service = service(repository, media, token_codec);

        let result = service.refresh_session(&presented.token).await;
        assert!(matches!(
            result.unwrap_err(),
            AuthError::InvalidRefreshToken
        ));
    }

    #[tokio::test]
    async fn test_logout_clears_stored_token() {
        let user_id = UserId::new();

        let mut repository = MockTestUserRepository::new();
        let media = MockTestMediaUploader::new();

        repository
            .expect_set_refresh_token()
            .withf(move |id, token| *id == user_id && token.is_none())
            .times(1)
            .returning(|_, _| Ok(()));

        let service = service(repository, media, codec());

        assert!(service.logout(&user_id).await.is_ok());
    }

    #[tokio::test]
    async fn test_change_password_replaces_digest() {
        let hasher = PasswordHasher::new();
        let user = test_user(hasher.hash("old-pw").unwrap());
        let user_id = user.id;

        let mut repository = MockTestUserRepository::new();
        let media = MockTestMediaUploader::new();

        repository
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(user.clone())));

        repository
            .expect_update_password_hash()
            .withf(move |id, digest| {
                *id == user_id
                    && PasswordHasher::new()
                        .verify("new-pw", digest)
                        .unwrap_or(false)
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let service = service(repository, media, codec());

        let command =
            ChangePasswordCommand::new("old-pw".to_string(), "new-pw".to_string()).unwrap();
        assert!(service.change_password(&user_id, command).await.is_ok());
    }

    #[tokio::test]
    async fn test_change_password_wrong_current() {
        let hasher = PasswordHasher::new();
        let user = test_user(hasher.hash("old-pw").unwrap());
        let user_id = user.id;

        let mut repository = MockTestUserRepository::new();
        let media = MockTestMediaUploader::new();

        repository
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(user.clone())));
        repository.expect_update_password_hash().times(0);

        let service = service(repository, media, codec());

        let command =
            ChangePasswordCommand::new("guessed".to_string(), "new-pw".to_string()).unwrap();
        let result = service.change_password(&user_id, command).await;
        assert!(matches!(result.unwrap_err(), AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_login_then_access_resolves_same_user() {
        let token_codec = codec();
        let hasher = PasswordHasher::new();
        let user = test_user(hasher.hash("pw123").unwrap());
        let user_id = user.id;

        let mut repository = MockTestUserRepository::new();
        let media = MockTestMediaUploader::new();

        let login_user = user.clone();
        repository
            .expect_find_by_identity()
            .times(1)
            .returning(move |_| Ok(Some(login_user.clone())));
        repository
            .expect_set_refresh_token()
            .times(1)
            .returning(|_, _| Ok(()));

        let resolved_user = user.clone();
        repository
            .expect_find_by_id()
            .withf(move |id| *id == user_id)
            .times(1)
            .returning(move |_| Ok(Some(resolved_user.clone())));

        let service = service(repository, media, token_codec);

        let command =
            LoginCommand::new(Some("alice".to_string()), None, "pw123".to_string()).unwrap();
        let session = service.login(command).await.unwrap();

        let authenticated = service
            .authenticate_access(&session.access.token)
            .await
            .unwrap();
        assert_eq!(authenticated.id, user_id);
    }

    #[tokio::test]
    async fn test_authenticate_access_with_garbage_token() {
        let repository = MockTestUserRepository::new();
        let media = MockTestMediaUploader::new();

        let service = service(repository, media, codec());

        let result = service.authenticate_access("garbage").await;
        assert!(matches!(result.unwrap_err(), AuthError::InvalidAccessToken));
    }

    #[tokio::test]
    async fn test_authenticate_access_unknown_user_is_not_distinguished() {
        let token_codec = codec();

        let subject = AccessSubject {
            id: UserId::new().to_string(),
            username: "ghost".to_string(),
            email: "g@x.com".to_string(),
            full_name: "Ghost".to_string(),
        };
        let issued = token_codec.issue_access(&subject).unwrap();

        let mut repository = MockTestUserRepository::new();
        let media = MockTestMediaUploader::new();

        repository
            .expect_find_by_id()
            .times(1)
            .returning(|_| Ok(None));

        let service = service(repository, media, token_codec);

        let result = service.authenticate_access(&issued.token).await;
        assert!(matches!(result.unwrap_err(), AuthError::InvalidAccessToken));
    }
}
