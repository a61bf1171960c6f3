use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use pinpoint::app::create_app;
use pinpoint::config::Config;
use pinpoint::geo::GeoResolver;
use pinpoint::storage::{MemoryStorage, Storage};
use pinpoint::tracking::VisitRecorder;

const DEFAULT_TRACING_LEVEL: &str = "pinpoint=info,tower_http=info";

fn configure_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_TRACING_LEVEL.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    configure_tracing();

    // Load configuration
    let config = Config::from_env()?;
    info!("Loaded configuration");

    // In-memory state; nothing survives a restart
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());

    let resolver = Arc::new(GeoResolver::from_config(&config.geo)?);
    info!(
        "🌍 Geolocation: {} (fallback {}), cache TTL {}s",
        config.geo.primary_url, config.geo.fallback_url, config.geo.cache_ttl_secs
    );

    let recorder = Arc::new(VisitRecorder::new(
        Arc::clone(&storage),
        resolver,
        config.visits.max_in_flight_lookups,
    ));

    let app = create_app(
        Arc::clone(&storage),
        Arc::clone(&recorder),
        &config.public_url,
        config.frontend.static_dir.as_deref(),
    );

    if let Some(ref static_dir) = config.frontend.static_dir {
        info!("🎨 Serving dashboard from directory: {}", static_dir);
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🚀 Server listening on http://{}", addr);
    info!("📡 Public URL: {}", config.public_url);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    let pending = recorder.pending_lookups();
    if pending > 0 {
        info!("Waiting for {} pending IP lookups...", pending);
        let grace = Duration::from_secs(config.visits.shutdown_grace_secs);
        if !recorder.drain(grace).await {
            warn!(
                "{} IP lookups still pending after {}s, exiting anyway",
                recorder.pending_lookups(),
                grace.as_secs()
            );
        }
    }

    Ok(())
}
