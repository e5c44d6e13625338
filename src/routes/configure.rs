//! Board sync configuration endpoints.

use std::collections::HashSet;

use anyhow::anyhow;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};

use timeline_sync_core::{
    BoardApi, BoardColumn, BoardSyncConfig, KvStore, MondayClient,
    storage::{config_key, webhook_key},
};

use crate::routes::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/configure", post(create))
        .route("/configure/{board_id}", get(show).delete(remove))
        .route("/configure/{board_id}/columns", get(columns))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigureRequest {
    board_id: i64,
    start_date_column_id: String,
    end_date_column_id: String,
    timeline_column_id: String,
    api_token: String,
}

/// POST /configure - validate and persist a board's sync configuration
async fn create(
    State(state): State<AppState>,
    Json(req): Json<ConfigureRequest>,
) -> Result<Response, AppError> {
    let requested = [
        req.start_date_column_id.as_str(),
        req.end_date_column_id.as_str(),
        req.timeline_column_id.as_str(),
    ];

    // The three roles must map to three distinct columns.
    if requested.iter().collect::<HashSet<_>>().len() != requested.len() {
        return Err(AppError::bad_request(
            "startDateColumnId, endDateColumnId and timelineColumnId must be distinct",
        ));
    }

    // Verify the token works by listing the board's columns, then check
    // the requested ids against them.
    let monday = MondayClient::new(req.api_token.clone());
    let columns = match monday.board_columns(req.board_id).await {
        Ok(columns) => columns,
        Err(_) => return Err(AppError::bad_request("Invalid API token or board ID")),
    };

    let known: HashSet<&str> = columns.iter().map(|c| c.id.as_str()).collect();
    let missing: Vec<&str> = requested
        .iter()
        .copied()
        .filter(|id| !known.contains(id))
        .collect();
    if !missing.is_empty() {
        // The caller gets the board's actual columns back so it can
        // correct the request.
        return Ok(missing_columns_response(&missing, &columns));
    }

    let config = BoardSyncConfig {
        board_id: req.board_id,
        start_date_column_id: req.start_date_column_id,
        end_date_column_id: req.end_date_column_id,
        timeline_column_id: req.timeline_column_id,
        sync_mode: state.settings.sync_mode,
        api_token: req.api_token,
        installed_at: Utc::now(),
    };
    state
        .storage
        .put(
            &config_key(config.board_id),
            &serde_json::to_string(&config)?,
            None,
        )
        .await?;

    Ok(Json(json!({
        "success": true,
        "config": redacted(&config)?,
        "nextStep": format!(
            "POST {}/webhook/subscribe with {{\"boardId\": {}}} to activate the webhook",
            state.settings.app_url(),
            config.board_id
        ),
    }))
    .into_response())
}

fn missing_columns_response(missing: &[&str], columns: &[BoardColumn]) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "error": format!("Column IDs not found on board: {}", missing.join(", ")),
            "availableColumns": columns,
        })),
    )
        .into_response()
}

/// GET /configure/:board_id - stored config with the token redacted
async fn show(
    State(state): State<AppState>,
    Path(board_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let Some(raw) = state.storage.get(&config_key(board_id)).await? else {
        return Err(AppError::not_found("Board not configured"));
    };
    let config: BoardSyncConfig = serde_json::from_str(&raw)?;

    Ok(Json(redacted(&config)?))
}

/// DELETE /configure/:board_id - drop the config and webhook record
async fn remove(
    State(state): State<AppState>,
    Path(board_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    state.storage.delete(&config_key(board_id)).await?;
    state.storage.delete(&webhook_key(board_id)).await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Config for board {board_id} removed"),
    })))
}

/// GET /configure/:board_id/columns - board columns partitioned by type
async fn columns(
    State(state): State<AppState>,
    Path(board_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let Some(token) = state.settings.monday_api_token.clone() else {
        return Err(AppError::from(anyhow!("MONDAY_API_TOKEN not set")));
    };

    let monday = MondayClient::new(token);
    let columns = monday.board_columns(board_id).await?;

    let date_columns: Vec<_> = columns
        .iter()
        .filter(|c| c.column_type == "date")
        .cloned()
        .collect();
    let timeline_columns: Vec<_> = columns
        .iter()
        .filter(|c| c.column_type == "timeline")
        .cloned()
        .collect();

    Ok(Json(json!({
        "boardId": board_id,
        "allColumns": columns,
        "dateColumns": date_columns,
        "timelineColumns": timeline_columns,
    })))
}

fn redacted(config: &BoardSyncConfig) -> serde_json::Result<Value> {
    let mut value = serde_json::to_value(config)?;
    if let Some(token) = value.get_mut("apiToken") {
        *token = Value::String("***hidden***".into());
    }
    Ok(value)
}
