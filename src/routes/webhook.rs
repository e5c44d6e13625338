//! monday.com webhook intake and subscription management.

use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, warn};

use timeline_sync_core::{
    BoardApi, BoardSyncConfig, KvStore, MondayClient, SyncEngine, WebhookPayload,
    storage::{config_key, webhook_key},
};

use crate::routes::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/webhook", post(receive))
        .route("/webhook/subscribe", post(subscribe))
        .route("/webhook/unsubscribe", post(unsubscribe))
}

/// POST /webhook - change notifications and challenge verification
async fn receive(
    State(state): State<AppState>,
    Json(payload): Json<WebhookPayload>,
) -> Result<Json<Value>, AppError> {
    // Subscription verification: echo the challenge straight back.
    if let Some(challenge) = payload.challenge {
        return Ok(Json(json!({ "challenge": challenge })));
    }

    let Some(event) = payload.event else {
        return Err(AppError::bad_request("No event in payload"));
    };

    let Some(raw) = state.storage.get(&config_key(event.board_id)).await? else {
        warn!("no config for board {}", event.board_id);
        // 200 on purpose: a failure status would make monday retry the
        // delivery indefinitely.
        return Ok(Json(json!({ "error": "Board not configured" })));
    };
    let config: BoardSyncConfig = serde_json::from_str(&raw)?;

    let monday = Arc::new(MondayClient::new(config.api_token.clone()));
    let engine = SyncEngine::new(monday, state.storage.clone());

    let report = engine.handle_column_change(&event, &config).await;
    info!(
        "sync result for board {} item {}: {:?}",
        event.board_id, event.pulse_id, report
    );

    Ok(Json(serde_json::to_value(&report)?))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BoardRequest {
    board_id: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SubscribeResponse {
    success: bool,
    webhook_url: String,
    board_id: i64,
    webhook_id: i64,
}

/// POST /webhook/subscribe - register a change_column_value webhook
async fn subscribe(
    State(state): State<AppState>,
    Json(req): Json<BoardRequest>,
) -> Result<Json<SubscribeResponse>, AppError> {
    let Some(raw) = state.storage.get(&config_key(req.board_id)).await? else {
        return Err(AppError::bad_request(
            "Configure the board first via POST /configure",
        ));
    };
    let config: BoardSyncConfig = serde_json::from_str(&raw)?;

    let monday = MondayClient::new(config.api_token.clone());
    let webhook_url = format!("{}/webhook", state.settings.app_url());
    let webhook_id = monday
        .create_webhook(req.board_id, &webhook_url, "change_column_value")
        .await?;

    state
        .storage
        .put(
            &webhook_key(req.board_id),
            &json!({ "id": webhook_id }).to_string(),
            None,
        )
        .await?;

    Ok(Json(SubscribeResponse {
        success: true,
        webhook_url,
        board_id: req.board_id,
        webhook_id,
    }))
}

#[derive(Deserialize)]
struct WebhookRecord {
    id: i64,
}

/// POST /webhook/unsubscribe - delete the webhook and its record
async fn unsubscribe(
    State(state): State<AppState>,
    Json(req): Json<BoardRequest>,
) -> Result<Json<Value>, AppError> {
    let Some(raw) = state.storage.get(&config_key(req.board_id)).await? else {
        return Err(AppError::bad_request("Board not configured"));
    };
    let config: BoardSyncConfig = serde_json::from_str(&raw)?;

    let Some(raw) = state.storage.get(&webhook_key(req.board_id)).await? else {
        return Err(AppError::bad_request("No webhook found for board"));
    };
    let record: WebhookRecord = serde_json::from_str(&raw)?;

    let monday = MondayClient::new(config.api_token.clone());
    monday.delete_webhook(record.id).await?;
    state.storage.delete(&webhook_key(req.board_id)).await?;

    Ok(Json(json!({ "success": true, "boardId": req.board_id })))
}
