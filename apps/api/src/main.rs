mod config;
mod errors;
mod guard;
mod models;
mod profile_source;
mod routes;
mod session;
mod state;
mod storage;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::profile_source::MockLinkedInSource;
use crate::routes::build_router;
use crate::session::{AuthService, Latency, SessionStore};
use crate::state::AppState;
use crate::storage::FileStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first; malformed values abort startup
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting LinkedCV API v{}", env!("CARGO_PKG_VERSION"));

    // Restore the persisted session before accepting requests
    let storage = Arc::new(FileStore::new(&config.session_dir));
    info!("Session storage at {}", storage.dir().display());
    let session = Arc::new(SessionStore::new(storage));
    session.initialize().await;

    let latency = if config.simulate_latency {
        Latency::simulated()
    } else {
        Latency::default()
    };
    info!("Simulated latency: {}", config.simulate_latency);

    // Profile source is the canned LinkedIn stub; swap for a real OAuth exchange here
    let auth = Arc::new(AuthService::new(
        session.clone(),
        Arc::new(MockLinkedInSource),
        latency,
    ));

    let state = AppState { session, auth };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict CORS to the SPA origin once it is deployed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
