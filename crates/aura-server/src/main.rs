use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router, middleware,
    response::IntoResponse,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use aura_api::auth::{self, AppState, AppStateInner};
use aura_api::challenges;
use aura_api::completions;
use aura_api::flags;
use aura_api::leaderboard;
use aura_api::middleware::require_auth;
use aura_api::rate_limit::RateLimiter;
use aura_api::users;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aurafarm=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("AURAFARM_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("AURAFARM_DB_PATH").unwrap_or_else(|_| "aurafarm.db".into());
    let host = std::env::var("AURAFARM_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("AURAFARM_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let geofence_radius_m: f64 = std::env::var("AURAFARM_GEOFENCE_METERS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(100.0);
    let completions_per_hour: u32 = std::env::var("AURAFARM_COMPLETIONS_PER_HOUR")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(10);

    // Init database
    let db = aura_db::Database::open(&PathBuf::from(&db_path))?;

    // Shared state
    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret,
        geofence_radius_m,
        completion_limiter: RateLimiter::new(completions_per_hour, Duration::from_secs(3600)),
    });

    // Routes
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/challenges", get(challenges::list_challenges))
        .route("/challenges/{id}", get(challenges::get_challenge))
        .route("/leaderboard", get(leaderboard::leaderboard))
        .route("/health", get(health))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/challenges", post(challenges::create_challenge))
        .route("/completions", post(completions::complete_challenge))
        .route("/completions", get(completions::list_my_completions))
        .route("/completions/{id}/flags", post(flags::flag_completion))
        .route("/flags", get(flags::list_flags))
        .route("/users/me", get(users::me))
        .layer(middleware::from_fn(require_auth))
        .with_state(state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("AuraFarm server listening on {}", addr);
    info!(
        "Geofence radius: {}m, completion rate limit: {}/hour",
        geofence_radius_m, completions_per_hour
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
