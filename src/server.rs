use axum::{Router, extract::State, http::StatusCode, response::Json, routing::post};
use metrics::counter;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::engine::Engine;
use crate::types::{
    BatchPredictRequest, BatchPredictResponse, ErrorResponse, PredictRequest, PredictResponse,
};

const PREDICT_FAILED: &str = "Prediction failed";
const BATCH_PREDICT_FAILED: &str = "Batch prediction failed";

#[derive(Clone)]
pub struct AppState {
    engine: Arc<dyn Engine + Send + Sync>,
}

impl AppState {
    pub fn new(engine: Arc<dyn Engine + Send + Sync>) -> Self {
        Self { engine }
    }
}

/// Prediction routes. `/metrics` is mounted by the binary because the
/// Prometheus recorder is process-global.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/predict", post(predict_handler))
        .route("/predict_batch", post(predict_batch_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

type ApiError = (StatusCode, Json<ErrorResponse>);

/// The caller only ever sees `detail`; the cause stays in the server log.
fn internal_error(endpoint: &'static str, detail: &str) -> ApiError {
    counter!("prediction_failures_total", "endpoint" => endpoint).increment(1);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            detail: detail.to_string(),
        }),
    )
}

#[tracing::instrument(skip(state, request))]
async fn predict_handler(
    State(state): State<AppState>,
    Json(request): Json<PredictRequest>,
) -> Result<Json<PredictResponse>, ApiError> {
    counter!("prediction_requests_total", "endpoint" => "predict").increment(1);

    let labels = match state.engine.predict(vec![request.message.clone()]).await {
        Ok(labels) => labels,
        Err(e) => {
            tracing::error!(error = ?e, "Error during prediction");
            return Err(internal_error("predict", PREDICT_FAILED));
        }
    };
    let Some(&prediction) = labels.first() else {
        tracing::error!("Engine returned no label for a single message");
        return Err(internal_error("predict", PREDICT_FAILED));
    };

    counter!("predictions_total", "label" => prediction.as_str()).increment(1);
    tracing::info!(%prediction, message = %request.message, "Predicted label");
    Ok(Json(PredictResponse { prediction }))
}

#[tracing::instrument(skip(state, request), fields(input_count = request.messages.len()))]
async fn predict_batch_handler(
    State(state): State<AppState>,
    Json(request): Json<BatchPredictRequest>,
) -> Result<Json<BatchPredictResponse>, ApiError> {
    counter!("prediction_requests_total", "endpoint" => "predict_batch").increment(1);

    let input_count = request.messages.len();
    let predictions = match state.engine.predict(request.messages).await {
        Ok(predictions) => predictions,
        Err(e) => {
            tracing::error!(error = ?e, "Batch prediction failed");
            return Err(internal_error("predict_batch", BATCH_PREDICT_FAILED));
        }
    };
    if predictions.len() != input_count {
        tracing::error!(
            input_count,
            output_count = predictions.len(),
            "Engine returned the wrong number of labels"
        );
        return Err(internal_error("predict_batch", BATCH_PREDICT_FAILED));
    }

    for label in &predictions {
        counter!("predictions_total", "label" => label.as_str()).increment(1);
    }
    tracing::info!(?predictions, "Batch prediction results");
    Ok(Json(BatchPredictResponse { predictions }))
}
