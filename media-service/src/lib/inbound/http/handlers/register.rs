use std::path::Path;
use std::path::PathBuf;

use axum::extract::multipart::Field;
use axum::extract::Multipart;
use axum::extract::State;
use axum::http::StatusCode;
use thiserror::Error;
use uuid::Uuid;

use super::ApiError;
use super::ApiSuccess;
use super::UserData;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::FullName;
use crate::domain::user::models::RegisterUserCommand;
use crate::domain::user::models::Username;
use crate::inbound::http::router::AppState;
use crate::user::errors::EmailError;
use crate::user::errors::FullNameError;
use crate::user::errors::UsernameError;

pub async fn register(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<ApiSuccess<UserData>, ApiError> {
    let mut request = RegisterRequest::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("fullName") => request.full_name = Some(read_text(field).await?),
            Some("email") => request.email = Some(read_text(field).await?),
            Some("username") => request.username = Some(read_text(field).await?),
            Some("password") => request.password = Some(read_text(field).await?),
            Some("avatar") => request.avatar = Some(spool(&state.upload_dir, field).await?),
            Some("coverImage") => {
                request.cover_image = Some(spool(&state.upload_dir, field).await?)
            }
            _ => {}
        }
    }

    state
        .auth
        .register(request.try_into_command()?)
        .await
        .map_err(ApiError::from)
        .map(|ref user| {
            ApiSuccess::new(
                StatusCode::CREATED,
                "User registered successfully",
                user.into(),
            )
        })
}

async fn read_text(field: Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))
}

/// Spill an uploaded file part to the local temp directory.
///
/// The spooled path is what the media store client consumes; it removes the
/// file once the upload is pushed out.
async fn spool(upload_dir: &Path, field: Field<'_>) -> Result<PathBuf, ApiError> {
    let original_name = field
        .file_name()
        .map(str::to_string)
        .unwrap_or_else(|| "upload.bin".to_string());
    let file_name = format!("{}-{}", Uuid::new_v4(), original_name);

    let data = field
        .bytes()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let path = upload_dir.join(file_name);
    tokio::fs::write(&path, &data)
        .await
        .map_err(|e| ApiError::InternalServerError(e.to_string()))?;

    Ok(path)
}

/// Accumulated multipart form fields (raw, pre-validation)
#[derive(Debug, Default)]
struct RegisterRequest {
    full_name: Option<String>,
    email: Option<String>,
    username: Option<String>,
    password: Option<String>,
    avatar: Option<PathBuf>,
    cover_image: Option<PathBuf>,
}

#[derive(Debug, Clone, Error)]
enum ParseRegisterRequestError {
    #[error("Invalid full name: {0}")]
    FullName(#[from] FullNameError),

    #[error("Invalid email: {0}")]
    Email(#[from] EmailError),

    #[error("Invalid username: {0}")]
    Username(#[from] UsernameError),

    #[error("Password is required")]
    MissingPassword,

    #[error("Avatar file is required")]
    MissingAvatar,
}

impl RegisterRequest {
    fn try_into_command(self) -> Result<RegisterUserCommand, ParseRegisterRequestError> {
        let full_name = FullName::new(&self.full_name.unwrap_or_default())?;
        let email = EmailAddress::new(&self.email.unwrap_or_default())?;
        let username = Username::new(&self.username.unwrap_or_default())?;

        let password = self
            .password
            .filter(|p| !p.trim().is_empty())
            .ok_or(ParseRegisterRequestError::MissingPassword)?;

        let avatar = self.avatar.ok_or(ParseRegisterRequestError::MissingAvatar)?;

        Ok(RegisterUserCommand {
            full_name,
            email,
            username,
            password,
            avatar,
            cover_image: self.cover_image,
        })
    }
}

impl From<ParseRegisterRequestError> for ApiError {
    fn from(err: ParseRegisterRequestError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}
