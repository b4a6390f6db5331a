use std::path::PathBuf;
use std::sync::Arc;

use axum::http::HeaderValue;
use media_service::config::Config;
use media_service::domain::user::service::AuthService;
use media_service::inbound::http::router::create_router;
use media_service::outbound::media::HttpMediaStore;
use media_service::outbound::repositories::PostgresUserRepository;
use media_service::user::ports::AuthServicePort;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "media_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        service = "media-service",
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );

    let config = Config::load()?;

    // Fail fast on unusable token secrets; every session depends on them
    anyhow::ensure!(
        !config.auth.access_token_secret.is_empty(),
        "auth.access_token_secret must be configured"
    );
    anyhow::ensure!(
        !config.auth.refresh_token_secret.is_empty(),
        "auth.refresh_token_secret must be configured"
    );
    anyhow::ensure!(
        config.auth.access_token_secret != config.auth.refresh_token_secret,
        "access and refresh token secrets must be independent"
    );

    tracing::info!(
        http_port = config.server.http_port,
        access_token_ttl_minutes = config.auth.access_token_ttl_minutes,
        refresh_token_ttl_days = config.auth.refresh_token_ttl_days,
        media_storage_url = %config.media.storage_url,
        "Configuration loaded"
    );

    let pg_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database.url)
        .await?;
    tracing::info!(
        max_connections = 5,
        database = "postgresql",
        "Database connection pool created"
    );

    sqlx::migrate!("./migrations").run(&pg_pool).await?;
    tracing::info!(database = "postgresql", "Database migrations completed");

    let token_codec = Arc::new(config.auth.token_codec());
    let user_repository = Arc::new(PostgresUserRepository::new(pg_pool));
    let media_store = Arc::new(HttpMediaStore::new(&config.media.storage_url));

    let auth_service: Arc<dyn AuthServicePort> =
        Arc::new(AuthService::new(user_repository, media_store, token_codec));

    let upload_dir = PathBuf::from(&config.media.temp_dir);
    tokio::fs::create_dir_all(&upload_dir).await?;

    let cors_origin = config
        .server
        .cors_origin
        .as_deref()
        .map(|origin| origin.parse::<HeaderValue>())
        .transpose()?;

    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    let application = create_router(auth_service, upload_dir, cors_origin);
    axum::serve(http_listener, application).await?;

    Ok(())
}
