//! Incoming webhook payloads.
//!
//! monday.com posts either a one-time verification challenge or a column
//! change event. Payloads are loosely typed on the wire, so the column
//! value fields stay as raw JSON here; the sync engine re-reads current
//! values from the API instead of trusting the event body.

use serde::Deserialize;

/// Body of a POST to the webhook endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    pub challenge: Option<String>,
    pub event: Option<ColumnChangeEvent>,
}

/// A `change_column_value` notification. Lives only for the duration of
/// one request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnChangeEvent {
    pub user_id: i64,
    pub board_id: i64,
    /// monday's name for an item id.
    pub pulse_id: i64,
    #[serde(default)]
    pub pulse_name: String,
    pub column_id: String,
    #[serde(default)]
    pub column_type: String,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    #[serde(default)]
    pub previous_value: Option<serde_json::Value>,
    /// Epoch millis.
    #[serde(default)]
    pub changed_at: i64,
    #[serde(default)]
    pub trigger_uuid: String,
}
