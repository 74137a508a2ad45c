use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use mnav_tracker::models::Snapshot;
use mnav_tracker::refresh::RefreshOutcome;
use mnav_tracker::service::ConfigUpdateRequest;
use mnav_tracker::TrackerService;
use serde_json::{json, Value};

use crate::error::ApiError;

type AppState = Arc<TrackerService>;

pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/api/data", get(data))
        .route("/api/history", get(history))
        .route("/api/update_config", post(update_config))
        .route("/api/manual_update", post(manual_update))
        .route("/health", get(health))
}

/// `[timestamp, <price per instrument>..., reserve_price]`
fn price_row(snapshot: &Snapshot, instruments: &[String]) -> Value {
    let mut row = vec![json!(snapshot.timestamp)];
    row.extend(instruments.iter().map(|s| json!(snapshot.price(s))));
    row.push(json!(snapshot.reserve_price()));
    Value::Array(row)
}

/// `[timestamp, <mnav per instrument>...]`
fn mnav_row(snapshot: &Snapshot, instruments: &[String]) -> Value {
    let mut row = vec![json!(snapshot.timestamp)];
    row.extend(instruments.iter().map(|s| json!(snapshot.metric(s))));
    Value::Array(row)
}

async fn data(State(service): State<AppState>) -> Result<Json<Value>, ApiError> {
    let latest = service.latest_snapshot().await?;
    let instruments = service.coordinator().instruments();

    let config: BTreeMap<&str, Value> = latest
        .config
        .values()
        .map(|c| {
            (
                c.symbol.as_str(),
                json!({
                    "shares_outstanding": c.shares_outstanding,
                    "eth_holdings": c.eth_holdings,
                }),
            )
        })
        .collect();

    let (price_data, mnav_data) = match &latest.snapshot {
        Some(snapshot) => (price_row(snapshot, instruments), mnav_row(snapshot, instruments)),
        None => (Value::Null, Value::Null),
    };

    Ok(Json(json!({
        "success": true,
        "data": {
            "price_data": price_data,
            "mnav_data": mnav_data,
            "config": config,
        },
        "timestamp": service.now(),
    })))
}

async fn history(State(service): State<AppState>) -> Result<Json<Value>, ApiError> {
    let snapshots = service.history().await?;
    Ok(Json(json!({
        "success": true,
        "count": snapshots.len(),
        "data": snapshots,
        "timestamp": service.now(),
    })))
}

async fn update_config(
    State(service): State<AppState>,
    body: Result<Json<ConfigUpdateRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = body?;
    let updated = service.update_config(&request).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("{} config updated", updated.symbol),
    })))
}

async fn manual_update(State(service): State<AppState>) -> Json<Value> {
    match service.trigger_manual_refresh().await {
        RefreshOutcome::Completed(report) => {
            let mut body = json!({
                "success": true,
                "message": "data refreshed",
                "timestamp": report.snapshot.timestamp,
            });
            if let Some(err) = report.storage_error {
                body["warning"] = json!(format!("snapshot not stored: {err}"));
            }
            Json(body)
        }
        RefreshOutcome::Skipped => Json(json!({
            "success": true,
            "message": "refresh already in progress; skipped",
            "timestamp": service.now(),
        })),
    }
}

async fn health(State(service): State<AppState>) -> Json<Value> {
    Json(json!(service.health()))
}
