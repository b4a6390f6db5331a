use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::http::Method;
use axum::http::Request;
use axum::http::Response;
use axum::middleware;
use axum::routing::get;
use axum::routing::post;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::Span;

use super::handlers::change_password::change_password;
use super::handlers::current_user::current_user;
use super::handlers::login::login;
use super::handlers::logout::logout;
use super::handlers::refresh_token::refresh_token;
use super::handlers::register::register;
use super::middleware::authenticate as auth_middleware;
use crate::user::ports::AuthServicePort;

// JSON bodies are small; multipart registration carries images
const JSON_BODY_LIMIT: usize = 16 * 1024;
const MULTIPART_BODY_LIMIT: usize = 8 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<dyn AuthServicePort>,
    pub upload_dir: PathBuf,
}

pub fn create_router(
    auth: Arc<dyn AuthServicePort>,
    upload_dir: PathBuf,
    cors_origin: Option<HeaderValue>,
) -> Router {
    let state = AppState { auth, upload_dir };

    let register_routes = Router::new()
        .route("/api/v1/users/register", post(register))
        .layer(DefaultBodyLimit::max(MULTIPART_BODY_LIMIT));

    let public_routes = Router::new()
        .route("/api/v1/users/login", post(login))
        .route("/api/v1/users/refresh-token", post(refresh_token))
        .layer(DefaultBodyLimit::max(JSON_BODY_LIMIT));

    let protected_routes = Router::new()
        .route("/api/v1/users/logout", post(logout))
        .route("/api/v1/users/change-password", post(change_password))
        .route("/api/v1/users/current-user", get(current_user))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(DefaultBodyLimit::max(JSON_BODY_LIMIT));

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version(),
            )
        })
        .on_request(|request: &Request<Body>, _span: &Span| {
            tracing::info!(
                method = %request.method(),
                uri = %request.uri(),
                "Request started"
            );
        })
        .on_response(
            |response: &Response<Body>, latency: Duration, _span: &Span| {
                tracing::info!(
                    status = response.status().as_u16(),
                    latency_ms = latency.as_millis(),
                    "Request completed"
                );
            },
        );

    let cors_layer = match cors_origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([
                axum::http::header::CONTENT_TYPE,
                axum::http::header::AUTHORIZATION,
            ]),
        None => CorsLayer::permissive(),
    };

    Router::new()
        .merge(register_routes)
        .merge(public_routes)
        .merge(protected_routes)
        .fallback_service(ServeDir::new("public"))
        .layer(trace_layer)
        .layer(cors_layer)
        .with_state(state)
}
