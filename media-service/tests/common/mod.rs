use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use auth::TokenCodec;
use chrono::Duration;
use chrono::Utc;
use media_service::domain::user::models::EmailAddress;
use media_service::domain::user::models::User;
use media_service::domain::user::models::UserId;
use media_service::domain::user::models::Username;
use media_service::domain::user::ports::AuthServicePort;
use media_service::domain::user::ports::MediaUploader;
use media_service::domain::user::ports::UserRepository;
use media_service::domain::user::service::AuthService;
use media_service::inbound::http::router::create_router;
use media_service::user::errors::AuthError;
use media_service::user::errors::UploadError;

/// Test application that spawns the real router on a random port.
///
/// The Postgres adapter is swapped for an in-memory repository and the media
/// store for a stub, so the suite is self-contained.
pub struct TestApp {
    pub address: String,
    pub api_client: reqwest::Client,
}

impl TestApp {
    /// Spawn the application in a background task and return TestApp
    pub async fn spawn() -> Self {
        let repository = Arc::new(InMemoryUserRepository::default());
        let media = Arc::new(StubMediaStore);
        let token_codec = Arc::new(TokenCodec::new(
            b"test-access-secret-at-least-32-bytes!",
            b"test-refresh-secret-at-least-32-byte!",
            Duration::minutes(15),
            Duration::days(10),
        ));

        let auth_service: Arc<dyn AuthServicePort> =
            Arc::new(AuthService::new(repository, media, token_codec));

        let upload_dir =
            std::env::temp_dir().join(format!("media-service-test-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&upload_dir)
            .await
            .expect("Failed to create upload dir");

        // Use random port (0 = OS assigns)
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let port = listener.local_addr().unwrap().port();
        let address = format!("http://127.0.0.1:{}", port);

        let router = create_router(auth_service, upload_dir, None);
        tokio::spawn(async move { axum::serve(listener, router).await });

        let api_client = reqwest::Client::new();

        TestApp {
            address,
            api_client,
        }
    }

    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.post(format!("{}{}", self.address, path))
    }

    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.get(format!("{}{}", self.address, path))
    }

    /// Register a user through the real multipart endpoint.
    pub async fn register_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> reqwest::Response {
        let form = registration_form(username, email, password);
        self.post("/api/v1/users/register")
            .multipart(form)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Register then log in, returning the login response.
    pub async fn register_and_login(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> reqwest::Response {
        let response = self.register_user(username, email, password).await;
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);

        self.post("/api/v1/users/login")
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("Failed to execute request")
    }
}

pub fn registration_form(username: &str, email: &str, password: &str) -> reqwest::multipart::Form {
    reqwest::multipart::Form::new()
        .text("fullName", "Alice A".to_string())
        .text("email", email.to_string())
        .text("username", username.to_string())
        .text("password", password.to_string())
        .part(
            "avatar",
            reqwest::multipart::Part::bytes(vec![0x89, 0x50, 0x4e, 0x47]).file_name("avatar.png"),
        )
}

/// In-memory stand-in for the Postgres repository.
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<HashMap<UserId, User>>,
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: User) -> Result<User, AuthError> {
        let mut users = self.users.lock().unwrap();

        if users.values().any(|u| u.username == user.username) {
            return Err(AuthError::UsernameAlreadyExists(user.username.to_string()));
        }
        if users.values().any(|u| u.email == user.email) {
            return Err(AuthError::EmailAlreadyExists(user.email.to_string()));
        }

        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, AuthError> {
        Ok(self.users.lock().unwrap().get(id).cloned())
    }

    async fn find_by_identity(&self, identity: &str) -> Result<Option<User>, AuthError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.username.as_str() == identity || u.email.as_str() == identity)
            .cloned())
    }

    async fn find_by_username_or_email(
        &self,
        username: &Username,
        email: &EmailAddress,
    ) -> Result<Option<User>, AuthError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| &u.username == username || &u.email == email)
            .cloned())
    }

    async fn set_refresh_token(&self, id: &UserId, token: Option<&str>) -> Result<(), AuthError> {
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(id).ok_or(AuthError::NotFound)?;
        user.current_refresh_token = token.map(str::to_string);
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn swap_refresh_token(
        &self,
        id: &UserId,
        expected: &str,
        replacement: &str,
    ) -> Result<bool, AuthError> {
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(id).ok_or(AuthError::NotFound)?;

        if user.current_refresh_token.as_deref() != Some(expected) {
            return Ok(false);
        }

        user.current_refresh_token = Some(replacement.to_string());
        user.updated_at = Utc::now();
        Ok(true)
    }

    async fn update_password_hash(&self, id: &UserId, digest: &str) -> Result<(), AuthError> {
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(id).ok_or(AuthError::NotFound)?;
        user.password_hash = digest.to_string();
        user.updated_at = Utc::now();
        Ok(())
    }
}

/// Media store stub: every upload resolves to a deterministic hosted URL.
pub struct StubMediaStore;

#[async_trait]
impl MediaUploader for StubMediaStore {
    async fn upload(&self, local_path: &Path) -> Result<String, UploadError> {
        let name = local_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(format!("https://cdn.test/{name}"))
    }
}
