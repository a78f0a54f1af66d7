//! HTTP request handlers

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::training::TrainingRequest;
use crate::utils::DataLoader;

use super::error::{Result, ServerError};
use super::state::AppState;

pub async fn root() -> Json<Value> {
    Json(json!({ "message": "ModelForge backend running" }))
}

/// Parse the multipart `file` field as CSV and cache it
pub async fn upload_csv(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<Value>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload.csv").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ServerError::BadRequest(e.to_string()))?;
        info!(file = %file_name, bytes = data.len(), "Received CSV upload");

        let df = DataLoader::new().read_csv_bytes(&data)?;
        let rows = df.height();
        let columns = state.store_dataset(df).await;
        info!(rows, columns = columns.len(), "Dataset cached");

        return Ok(Json(json!({
            "message": "CSV uploaded successfully",
            "columns": columns,
        })));
    }

    Err(ServerError::BadRequest("No file uploaded".to_string()))
}

/// Train on the cached dataset, off the async runtime and bounded by the
/// configured timeout
pub async fn train(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TrainingRequest>,
) -> Result<Json<Value>> {
    let df = state
        .dataset()
        .await
        .ok_or_else(|| ServerError::Conflict("Please upload CSV first".to_string()))?;

    let session = Arc::clone(&state.session);
    let job_request = request.clone();
    let job = tokio::task::spawn_blocking(move || session.train_request(&df, &job_request));

    let timeout = state.config.train_timeout;
    let artifact = match tokio::time::timeout(timeout, job).await {
        Err(_) => {
            warn!(algorithm = %request.algorithm, timeout_secs = timeout.as_secs(), "Training timed out");
            return Err(ServerError::Timeout(timeout.as_secs()));
        }
        Ok(Err(join_err)) => return Err(ServerError::Internal(join_err.to_string())),
        Ok(Ok(Err(e))) => {
            warn!(algorithm = %request.algorithm, kind = e.kind(), error = %e, "Training failed");
            return Err(e.into());
        }
        Ok(Ok(Ok(artifact))) => artifact,
    };

    let metric_name = artifact.task().metric_name();
    let score = artifact.score();
    let mut body = json!({
        "message": format!("Model trained using {}", request.algorithm),
        "metric": score,
        "metric_name": metric_name,
        "features": artifact.feature_schema(),
        "metrics": artifact.metrics(),
    });
    body[metric_name] = json!(score);

    Ok(Json(body))
}

#[derive(Debug, Deserialize)]
pub struct PredictInput {
    values: Option<Vec<f64>>,
    /// Older clients send the row under this name
    test_input: Option<Vec<f64>>,
}

pub async fn predict(
    State(state): State<Arc<AppState>>,
    Json(input): Json<PredictInput>,
) -> Result<Json<Value>> {
    let values = input
        .values
        .or(input.test_input)
        .ok_or_else(|| ServerError::BadRequest("Missing 'values' (or legacy 'test_input')".to_string()))?;

    let prediction = state.session.predict(&values)?;
    Ok(Json(json!({ "prediction": prediction })))
}
