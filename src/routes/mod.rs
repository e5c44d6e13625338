pub mod configure;
pub mod webhook;

use axum::{
    Json, Router,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(landing))
        .route("/health", get(health))
        .merge(webhook::router())
        .merge(configure::router())
        .fallback(not_found)
        .with_state(state)
        .layer(cors)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn landing() -> Html<&'static str> {
    Html(LANDING_PAGE)
}

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" }))).into_response()
}

/// Standard API error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Convert errors to HTTP responses. Anything bubbling up through `?`
/// becomes a 500; client errors are built explicitly.
pub struct AppError(StatusCode, anyhow::Error);

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError(StatusCode::BAD_REQUEST, anyhow::anyhow!(message.into()))
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AppError(StatusCode::NOT_FOUND, anyhow::anyhow!(message.into()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.1.to_string(),
        });
        (self.0, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(StatusCode::INTERNAL_SERVER_ERROR, err.into())
    }
}

const LANDING_PAGE: &str = r#"<!DOCTYPE html>
<html><head><title>Monday Timeline Sync</title>
<style>body{font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',Roboto,sans-serif;max-width:680px;margin:60px auto;padding:0 20px;color:#333;line-height:1.6}
h1{color:#0073ea}code{background:#f4f4f4;padding:2px 6px;border-radius:3px;font-size:14px}
a{color:#0073ea}</style></head>
<body>
<h1>Monday Timeline Sync</h1>
<p>Keeps Start Date + End Date columns in sync with Timeline columns on monday.com.</p>

<h2>Quick Setup</h2>
<ol>
<li>Configure your board: <code>POST /configure</code></li>
<li>Subscribe to changes: <code>POST /webhook/subscribe</code></li>
<li>Done! Column changes will sync automatically.</li>
</ol>

<h2>API Endpoints</h2>
<ul>
<li><code>GET /health</code> &mdash; Health check</li>
<li><code>POST /configure</code> &mdash; Configure board sync</li>
<li><code>GET /configure/:boardId</code> &mdash; View board config</li>
<li><code>GET /configure/:boardId/columns</code> &mdash; List board columns</li>
<li><code>DELETE /configure/:boardId</code> &mdash; Remove board config</li>
<li><code>POST /webhook</code> &mdash; monday.com webhook receiver</li>
<li><code>POST /webhook/subscribe</code> &mdash; Create webhook subscription</li>
<li><code>POST /webhook/unsubscribe</code> &mdash; Remove webhook</li>
</ul>
</body></html>"#;
