use axum_extra::extract::cookie::Cookie;
use axum_extra::extract::cookie::CookieJar;
use axum_extra::extract::cookie::SameSite;
use chrono::Utc;
use time::Duration;

use crate::domain::user::models::AuthSession;

/// Cookie name for the access token.
pub const ACCESS_COOKIE: &str = "accessToken";
/// Cookie name for the refresh token.
pub const REFRESH_COOKIE: &str = "refreshToken";

/// Both session cookies are http-only, secure, and same-site: the tokens
/// must never be readable from client-side script.
fn session_cookie(name: &str, value: String, max_age: Duration) -> Cookie<'static> {
    Cookie::build((name.to_string(), value))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .path("/".to_string())
        .max_age(max_age)
        .build()
}

/// Attach a freshly issued token pair to the jar, each cookie expiring with
/// its token.
pub fn with_session_cookies(jar: CookieJar, session: &AuthSession) -> CookieJar {
    let now = Utc::now();
    let access_max_age = (session.access.expires_at - now).num_seconds().max(0);
    let refresh_max_age = (session.refresh.expires_at - now).num_seconds().max(0);

    jar.add(session_cookie(
        ACCESS_COOKIE,
        session.access.token.clone(),
        Duration::seconds(access_max_age),
    ))
    .add(session_cookie(
        REFRESH_COOKIE,
        session.refresh.token.clone(),
        Duration::seconds(refresh_max_age),
    ))
}

/// Expire both session cookies.
pub fn without_session_cookies(jar: CookieJar) -> CookieJar {
    jar.add(session_cookie(ACCESS_COOKIE, String::new(), Duration::ZERO))
        .add(session_cookie(REFRESH_COOKIE, String::new(), Duration::ZERO))
}
