use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::task;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use seat_picker::{config::Config, controllers, AppState};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.app.rust_log))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting seat picker service");
    info!(
        "Seat API at {}, hold {}s, center column {}",
        config.seat_api.base_url, config.picker.hold_duration_seconds, config.picker.center_column
    );

    // Create the shared application state
    let app_state = AppState::new(config.clone())?;

    // --- Start background tasks ---

    // Drop registry entries for pickers that stopped or were abandoned
    let registry = app_state.pickers.clone();
    let prune_every = Duration::from_secs(config.app.prune_interval_seconds.max(1));
    let idle_timeout = Duration::from_secs(config.app.picker_idle_timeout_seconds);
    task::spawn(async move {
        loop {
            tokio::time::sleep(prune_every).await;
            registry.prune_closed(idle_timeout).await;
        }
    });

    // --- Start the web server ---

    let app = Router::new()
        .route("/", get(|| async { "Seat Picker API v1.0" }))
        .route("/health", get(|| async { "OK" }))
        .nest("/api", controllers::routes())
        .with_state(app_state.clone())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("{}:{}", config.app.host, config.app.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
