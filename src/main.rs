use axum::routing::get;
use axum_prometheus::PrometheusMetricLayer;
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;

use spam_detector::config::ServerConfig;
use spam_detector::engine::PipelineEngine;
use spam_detector::logging;
use spam_detector::pipeline::Pipeline;
use spam_detector::server::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();
    logging::init(&config.log_level);
    tracing::info!("Starting spam detector with config: {:?}", config);

    // Without a model there is nothing to serve.
    let pipeline = match Pipeline::load(&config.model_path) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            tracing::error!(path = %config.model_path.display(), error = ?e, "Failed to load model");
            return Err(e.context("Could not load model"));
        }
    };
    tracing::info!("Model loaded from {}", config.model_path.display());

    let engine = PipelineEngine::new(pipeline);
    let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();

    let app = server::router(AppState::new(Arc::new(engine)))
        .route("/metrics", get(|| async move { metric_handle.render() }))
        .layer(prometheus_layer);

    let listener = TcpListener::bind(&config.server_address()).await?;
    tracing::info!("Server running on http://{}", config.server_address());

    axum::serve(listener, app).await?;
    Ok(())
}
