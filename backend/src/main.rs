use std::sync::Arc;

use aquaroute::{
    AppState, config::load_config, create_router, resolver::LocationCache,
    resolver::LocationResolver,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aquaroute=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = load_config()?;
    let resolver = LocationResolver::from_config(&config)?;
    tracing::info!(
        "Gazetteer: {} entries, {} compound rules; precedence {:?}",
        resolver.gazetteer().len(),
        resolver.gazetteer().rules().len(),
        resolver.precedence()
    );
    tracing::info!(
        "Branch at ({:.4}, {:.4}), fallback radius {}km",
        resolver.branch().lat,
        resolver.branch().lng,
        resolver.fallback_radius_km()
    );

    let state = AppState {
        resolver: Arc::new(resolver),
        cache: Arc::new(LocationCache::new(config.cache_size)),
    };
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Starting aquaroute on http://{}", config.bind_addr);
    tracing::info!("  POST /api/emergency/locate - Resolve an emergency request's location");
    tracing::info!("  POST /api/emergency/route - Distance, ETA and route line");
    tracing::info!("  GET /api/health - Liveness");
    axum::serve(listener, app).await?;
    Ok(())
}
