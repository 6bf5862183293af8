use std::{net::SocketAddr, sync::Arc};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod comparisons;
mod config;
mod encoder;
mod engine;
mod error;
mod model;
mod normalize;
mod predictor;
mod routes;
mod scaler;
mod schema;
mod statistics;
mod store;
mod types;
mod validation;
mod vocabulary;

use crate::config::Config;
use crate::engine::SalaryEngine;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "salary_engine=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    info!("Loaded configuration: {:?}", config);

    let metrics = metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;

    let engine = SalaryEngine::new(&config)?;
    let cors = routes::cors_layer(&config.server.front_origin)?;
    let app = routes::router(Arc::new(engine), cors, Some(metrics));

    let addr: SocketAddr = config.server.bind_addr.parse()?;
    info!("Starting salary prediction service on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    warn!("Shutdown signal received, starting graceful shutdown");
}
