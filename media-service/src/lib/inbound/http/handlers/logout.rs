use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use axum_extra::extract::cookie::CookieJar;

use super::ApiError;
use super::ApiSuccess;
use crate::inbound::http::cookies::without_session_cookies;
use crate::inbound::http::middleware::CurrentUser;
use crate::inbound::http::router::AppState;

pub async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    jar: CookieJar,
) -> Result<(CookieJar, ApiSuccess<()>), ApiError> {
    state.auth.logout(&user.id).await.map_err(ApiError::from)?;

    Ok((
        without_session_cookies(jar),
        ApiSuccess::new(StatusCode::OK, "User logged out", ()),
    ))
}
