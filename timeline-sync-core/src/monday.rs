//! monday.com GraphQL API client.
//!
//! The platform signals failure through an `errors` array on an
//! otherwise-200 response, so every call checks the body even when the
//! HTTP status is fine. A non-empty `errors` array is always a failure;
//! there is no partial-success interpretation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::error;

use crate::error::{Result, SyncError};

const API_URL: &str = "https://api.monday.com/v2";
const API_VERSION: &str = "2024-10";

/// A column's value on one item, as returned by the items query.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnValue {
    pub id: String,
    #[serde(rename = "type", default)]
    pub column_type: String,
    /// Raw serialized value; `None` for empty columns.
    pub value: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

/// A column definition on a board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardColumn {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub column_type: String,
}

/// The board operations the sync engine and routes need. `MondayClient`
/// is the real implementation; tests substitute their own.
#[async_trait]
pub trait BoardApi: Send + Sync {
    /// Fetch current values for a set of columns on one item.
    async fn item_column_values(
        &self,
        item_id: i64,
        column_ids: &[String],
    ) -> Result<Vec<ColumnValue>>;

    /// Write a single column's value. `value` is the serialized column
    /// payload (e.g. a timeline JSON object).
    async fn change_column_value(
        &self,
        board_id: i64,
        item_id: i64,
        column_id: &str,
        value: &str,
    ) -> Result<()>;

    /// Write several columns in one mutation. `values` maps column id to
    /// column payload.
    async fn change_multiple_columns(
        &self,
        board_id: i64,
        item_id: i64,
        values: Value,
    ) -> Result<()>;

    /// List a board's column definitions.
    async fn board_columns(&self, board_id: i64) -> Result<Vec<BoardColumn>>;

    /// Create a change-notification webhook, returning its id.
    async fn create_webhook(&self, board_id: i64, url: &str, event: &str) -> Result<i64>;

    async fn delete_webhook(&self, webhook_id: i64) -> Result<()>;
}

pub struct MondayClient {
    http: reqwest::Client,
    api_token: String,
}

impl MondayClient {
    pub fn new(api_token: impl Into<String>) -> Self {
        MondayClient {
            http: reqwest::Client::new(),
            api_token: api_token.into(),
        }
    }

    async fn graphql(&self, query: String) -> Result<Value> {
        let response = self
            .http
            .post(API_URL)
            .header("Authorization", &self.api_token)
            .header("API-Version", API_VERSION)
            .json(&json!({ "query": query }))
            .send()
            .await?;

        let body: GraphQlResponse = response.json().await?;

        if let Some(errors) = body.errors.filter(|e| !e.is_empty()) {
            let message = errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            error!("monday API error: {message}");
            return Err(SyncError::Api(message));
        }

        body.data
            .ok_or_else(|| SyncError::Api("empty response from monday API".into()))
    }
}

#[derive(Deserialize)]
struct GraphQlResponse {
    data: Option<Value>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Deserialize)]
struct ItemsResponse {
    #[serde(default)]
    items: Vec<Item>,
}

#[derive(Deserialize)]
struct Item {
    #[serde(default)]
    column_values: Vec<ColumnValue>,
}

#[derive(Deserialize)]
struct BoardsResponse {
    #[serde(default)]
    boards: Vec<Board>,
}

#[derive(Deserialize)]
struct Board {
    #[serde(default)]
    columns: Vec<BoardColumn>,
}

#[derive(Deserialize)]
struct CreateWebhookResponse {
    create_webhook: WebhookId,
}

#[derive(Deserialize)]
struct WebhookId {
    id: i64,
}

#[async_trait]
impl BoardApi for MondayClient {
    async fn item_column_values(
        &self,
        item_id: i64,
        column_ids: &[String],
    ) -> Result<Vec<ColumnValue>> {
        let ids = column_ids
            .iter()
            .map(|id| format!("\"{id}\""))
            .collect::<Vec<_>>()
            .join(",");
        let query = format!(
            "{{ items(ids: [{item_id}]) {{ column_values(ids: [{ids}]) {{ id type value text }} }} }}"
        );

        let data = self.graphql(query).await?;
        let response: ItemsResponse = serde_json::from_value(data)?;
        Ok(response
            .items
            .into_iter()
            .next()
            .map(|item| item.column_values)
            .unwrap_or_default())
    }

    async fn change_column_value(
        &self,
        board_id: i64,
        item_id: i64,
        column_id: &str,
        value: &str,
    ) -> Result<()> {
        // The value argument is a JSON string, so it gets embedded as an
        // escaped string literal.
        let value_literal = Value::String(value.to_string()).to_string();
        let query = format!(
            "mutation {{ change_column_value(board_id: {board_id}, item_id: {item_id}, \
             column_id: \"{column_id}\", value: {value_literal}) {{ id }} }}"
        );
        self.graphql(query).await?;
        Ok(())
    }

    async fn change_multiple_columns(
        &self,
        board_id: i64,
        item_id: i64,
        values: Value,
    ) -> Result<()> {
        let values_literal = Value::String(values.to_string()).to_string();
        let query = format!(
            "mutation {{ change_multiple_column_values(item_id: {item_id}, board_id: {board_id}, \
             column_values: {values_literal}) {{ id }} }}"
        );
        self.graphql(query).await?;
        Ok(())
    }

    async fn board_columns(&self, board_id: i64) -> Result<Vec<BoardColumn>> {
        let query = format!("{{ boards(ids: [{board_id}]) {{ columns {{ id title type }} }} }}");

        let data = self.graphql(query).await?;
        let response: BoardsResponse = serde_json::from_value(data)?;
        Ok(response
            .boards
            .into_iter()
            .next()
            .map(|board| board.columns)
            .unwrap_or_default())
    }

    async fn create_webhook(&self, board_id: i64, url: &str, event: &str) -> Result<i64> {
        let data = self.graphql(create_webhook_query(board_id, url, event)).await?;
        let response: CreateWebhookResponse = serde_json::from_value(data)?;
        Ok(response.create_webhook.id)
    }

    async fn delete_webhook(&self, webhook_id: i64) -> Result<()> {
        let query = format!("mutation {{ delete_webhook(id: {webhook_id}) {{ id }} }}");
        self.graphql(query).await?;
        Ok(())
    }
}

/// `event` is a GraphQL enum value, so it stays unquoted; the webhook
/// config is a serialized JSON object, empty by default.
fn create_webhook_query(board_id: i64, url: &str, event: &str) -> String {
    format!(
        "mutation {{ create_webhook(board_id: {board_id}, url: \"{url}\", event: {event}, \
         config: \"{{}}\") {{ id }} }}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_webhook_query_shape() {
        let query = create_webhook_query(123, "https://sync.example.com/webhook", "change_column_value");
        assert_eq!(
            query,
            "mutation { create_webhook(board_id: 123, url: \"https://sync.example.com/webhook\", \
             event: change_column_value, config: \"{}\") { id } }"
        );
    }
}
