mod error;
mod handlers;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::get;
use axum::Router;
use clap::Parser;
use ingest::{resolve_timezone, Poller, PollerConfig};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::handlers::*;
use crate::state::{build_source, build_store, create_default_config, load_config, AppState};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[arg(long, default_value = "banwatch.toml")]
    config: PathBuf,
    #[arg(long, default_value = "0.0.0.0:8000")]
    listen: SocketAddr,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    if !args.config.exists() {
        warn!("config file missing, creating default config");
        let _ = create_default_config(&args.config);
    }

    let config = load_config(&args.config)?;
    let store = build_store(&config)?;
    let source = build_source(&config);
    let tz = resolve_timezone(&config.get_string("ingest.timezone"));

    let poller = Poller::new(source, store.clone(), tz, PollerConfig::default());
    tokio::spawn(poller.run());

    let state = Arc::new(AppState::new(store));
    let app = Router::new()
        .route("/", get(root))
        .route("/api/v1/decisions", get(latest_decisions))
        .route("/api/v1/decisions/history", get(decision_history))
        .route("/api/v1/country", get(country_rollup))
        .route("/api/v1/health", get(health))
        .route("/api/v1/health/store", get(health_store))
        .layer(cors_layer(&config))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("banwatch-server listening on {}", args.listen);
    let listener = tokio::net::TcpListener::bind(args.listen).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

fn cors_layer(config: &aggregation::SystemConfig) -> CorsLayer {
    let origins = config.get_string("server.cors_origins");
    if origins.trim() == "*" {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_headers(Any)
            .allow_methods(Any);
    }
    let parsed: Vec<HeaderValue> = origins
        .split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(parsed))
        .allow_headers(Any)
        .allow_methods(Any)
}
