//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors, but application-level
//! errors should use `kernel::error::AppError`.

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use auth::{
    AuthConfig, PgAuthRepository, auth_router, pg_auth_state, purge_once, spawn_revocation_sweep,
};
use axum::{
    Router, http,
    http::{Method, header},
};
use kernel::error::envelope::set_production_mode;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const OAUTH_STATE_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Deployment environment (`APP_ENV`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AppEnv {
    Development,
    Production,
    Test,
}

impl AppEnv {
    fn from_env() -> anyhow::Result<Self> {
        match env::var("APP_ENV").as_deref().unwrap_or("development") {
            "development" => Ok(AppEnv::Development),
            "production" => Ok(AppEnv::Production),
            "test" => Ok(AppEnv::Test),
            other => anyhow::bail!("APP_ENV must be development, production or test: {other:?}"),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ura_api=info,auth=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let app_env = AppEnv::from_env()?;
    set_production_mode(app_env == AppEnv::Production);

    let config = AuthConfig::from_env().context("invalid auth configuration")?;
    let sweep_interval = config.revocation_sweep_interval;
    let login_rate_limit = config.login_rate_limit.clone();
    let frontend_url = config.frontend_url.clone();

    // Database connection
    let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("../../../database/migrations")
        .run(&pool)
        .await?;

    tracing::info!("Migrations completed");

    let state = pg_auth_state(PgAuthRepository::new(pool), config)?;

    // Startup cleanup: remove expired revocation entries
    // Errors here should not prevent server startup
    match purge_once(state.repo.as_ref()).await {
        Ok(deleted) => tracing::info!(deleted, "Revocation list cleanup completed"),
        Err(e) => tracing::warn!(error = %e, "Revocation list cleanup failed, continuing anyway"),
    }

    spawn_revocation_sweep(Arc::clone(&state.repo), sweep_interval);
    Arc::clone(&state.oauth_states).spawn_cleanup(OAUTH_STATE_CLEANUP_INTERVAL);

    let limiter = Arc::clone(&state.limiter);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(login_rate_limit.window);
        loop {
            ticker.tick().await;
            let pruned = limiter.prune(&login_rate_limit);
            if pruned > 0 {
                tracing::debug!(pruned, "Pruned idle login rate limit keys");
            }
        }
    });

    // CORS configuration
    let frontend_origins = env::var("FRONTEND_ORIGINS").unwrap_or(frontend_url);

    let allowed_origins: Vec<http::HeaderValue> = frontend_origins
        .split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ]))
        .allow_credentials(true);

    // Build router
    let app = Router::new()
        .nest("/api/auth", auth_router(state))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let port: u16 = match env::var("PORT") {
        Ok(value) => value
            .parse()
            .with_context(|| format!("PORT must be a port number: {value:?}"))?,
        Err(_) => 5000,
    };
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(?app_env, "Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
