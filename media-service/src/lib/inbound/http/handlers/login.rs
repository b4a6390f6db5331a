use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use super::UserData;
use crate::domain::user::models::LoginCommand;
use crate::inbound::http::cookies::with_session_cookies;
use crate::inbound::http::router::AppState;

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<LoginRequestBody>,
) -> Result<(CookieJar, ApiSuccess<LoginResponseData>), ApiError> {
    let command = LoginCommand::new(body.username, body.email, body.password)?;

    let session = state.auth.login(command).await.map_err(ApiError::from)?;

    // Cookies for browsers, body fields for everything else
    let jar = with_session_cookies(jar, &session);

    Ok((
        jar,
        ApiSuccess::new(
            StatusCode::OK,
            "User logged in successfully",
            LoginResponseData {
                user: (&session.user).into(),
                access_token: session.access.token,
                refresh_token: session.refresh.token,
            },
        ),
    ))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginRequestBody {
    username: Option<String>,
    email: Option<String>,
    password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponseData {
    pub user: UserData,
    pub access_token: String,
    pub refresh_token: String,
}
