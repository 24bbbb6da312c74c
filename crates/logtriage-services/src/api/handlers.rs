//! HTTP request handlers for the REST API.

use std::path::PathBuf;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::Value;
use tracing::debug;

use logtriage_core::MetricsSnapshot;
use logtriage_core::model::ModelSummary;
use logtriage_core::persist::write_atomic;
use logtriage_core::scheduler::{RetrainJob, Submission};
use logtriage_core::table::CsvTable;
use logtriage_types::{ClassificationResult, LogRecord, TriageError};

use super::ApiState;
use crate::error::{ApiError, ApiResult};

const NO_OUTPUT: &str = "No classified output found. POST a CSV to /classify first.";

/// Build all API routes.
pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/classify", post(classify_csv).get(last_output))
        .route("/classify-json", post(classify_json))
        .route("/metrics", get(metrics))
        .route("/retrain", post(submit_retrain))
        .route("/retrain/{job_id}", get(retrain_status))
        .route("/model", get(model_summary))
}

/// Returns basic health status, version, and uptime.
async fn health_check(State(state): State<ApiState>) -> Json<Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.ctx.uptime().as_secs()
    }))
}

fn csv_response(bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"classified_logs.csv\"",
            ),
        ],
        bytes,
    )
        .into_response()
}

async fn persist_output(path: PathBuf, bytes: Vec<u8>) -> ApiResult<()> {
    tokio::task::spawn_blocking(move || write_atomic(&path, &bytes))
        .await
        .map_err(|e| TriageError::Internal(format!("output write task failed: {e}")))?
        .map_err(TriageError::from)?;
    Ok(())
}

/// Classify a CSV body and return it with `target_label` filled in.
async fn classify_csv(State(state): State<ApiState>, body: Bytes) -> ApiResult<Response> {
    let table = CsvTable::parse(&body)?;
    let records = table.log_records()?;
    debug!(rows = records.len(), "classifying CSV upload");

    let results = state.ctx.pipeline().classify_batch(records).await;
    let labels: Vec<&str> = results.iter().map(|r| r.label.as_str()).collect();
    let bytes = table.with_labels(labels.as_slice())?.to_csv()?;

    persist_output(state.ctx.config().storage.output_path(), bytes.clone()).await?;
    Ok(csv_response(bytes))
}

async fn last_output(State(state): State<ApiState>) -> ApiResult<Response> {
    match tokio::fs::read(state.ctx.config().storage.output_path()).await {
        Ok(bytes) => Ok(csv_response(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ApiError::NotFound(NO_OUTPUT.into()))
        }
        Err(e) => Err(TriageError::from(e).into()),
    }
}

/// Loose field read: strings as-is, missing or null as empty, anything
/// else in its JSON text form.
fn field(entry: &serde_json::Map<String, Value>, key: &str) -> String {
    match entry.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Parse `{"logs": [{source, log_message}, ...]}` into records.
pub fn parse_json_logs(body: &[u8]) -> Result<Vec<LogRecord>, TriageError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| TriageError::validation(format!("body is not valid JSON: {e}")))?;

    let logs = match value.get("logs") {
        Some(Value::Array(items)) if !items.is_empty() => items,
        _ => {
            return Err(TriageError::validation(
                "Body must contain a non-empty 'logs' array",
            ));
        }
    };

    logs.iter()
        .enumerate()
        .map(|(i, entry)| match entry {
            Value::Object(map) => Ok(LogRecord::new(field(map, "source"), field(map, "log_message"))),
            _ => Err(TriageError::validation(format!("logs[{i}] must be an object"))),
        })
        .collect()
}

async fn classify_json(State(state): State<ApiState>, body: Bytes) -> ApiResult<Json<Value>> {
    let records = parse_json_logs(&body)?;
    let results: Vec<ClassificationResult> = state.ctx.pipeline().classify_batch(records).await;
    Ok(Json(serde_json::json!({ "results": results })))
}

async fn metrics(State(state): State<ApiState>) -> Json<MetricsSnapshot> {
    Json(state.ctx.metrics().snapshot())
}

/// Queue a retrain from a labeled CSV body. Returns 202 immediately.
async fn submit_retrain(
    State(state): State<ApiState>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Submission>)> {
    let rows = CsvTable::parse(&body)?.labeled_examples()?;
    let submission = state.ctx.scheduler().submit(rows)?;
    Ok((StatusCode::ACCEPTED, Json(submission)))
}

async fn retrain_status(
    State(state): State<ApiState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<RetrainJob>> {
    let not_found = || ApiError::NotFound(format!("retrain job not found: {job_id}"));
    let id = uuid::Uuid::parse_str(&job_id).map_err(|_| not_found())?;
    state.ctx.scheduler().status(&id).map(Json).ok_or_else(not_found)
}

async fn model_summary(State(state): State<ApiState>) -> Json<ModelSummary> {
    Json(state.ctx.live_model().snapshot().summary())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_logs_parse() {
        let recs = parse_json_logs(
            br#"{"logs":[{"source":"ModernCRM","log_message":"User User1 logged in."},{"log_message":"x"}]}"#,
        )
        .unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].source, "ModernCRM");
        assert_eq!(recs[1].source, "");
    }

    #[test]
    fn json_logs_stringify_scalars() {
        let recs = parse_json_logs(br#"{"logs":[{"source":7,"log_message":null}]}"#).unwrap();
        assert_eq!(recs[0], LogRecord::new("7", ""));
    }

    #[test]
    fn json_logs_rejects_bad_shapes() {
        for body in [r#"{}"#, r#"{"logs":[]}"#, r#"{"logs":"nope"}"#, "not json"] {
            let err = parse_json_logs(body.as_bytes()).unwrap_err();
            assert!(matches!(err, TriageError::Validation { .. }));
        }
        let err = parse_json_logs(br#"{"logs":[{"source":"a"}, 5]}"#).unwrap_err();
        assert!(err.to_string().contains("logs[1] must be an object"));
    }
}
