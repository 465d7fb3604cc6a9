//! HTTP surface for the assistant widget.
//!
//! Three operations drive the widget (activate, close, submit), one SSE
//! stream mirrors its events to the page, and two read endpoints expose the
//! transcript and the registry for inspection and tests.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Path, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::AppState;
use crate::config::AppConfig;
use crate::events::sse_event;
use crate::ui;
use crate::widget::{Activation, Message, WidgetRegistry};

/// Upper bound on request handling. Covers producing the response, not
/// streaming an SSE body.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors returned by the widget API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The page key has no widget yet.
    #[error("no widget for page {0}")]
    WidgetNotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::WidgetNotFound(_) => {
                (StatusCode::NOT_FOUND, self.to_string()).into_response()
            }
        }
    }
}

/// Start the server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    let widgets = WidgetRegistry::with_reply_delay(config.widget.reply_delay());

    // Periodically drop widgets whose page has gone away.
    let janitor = widgets.clone();
    let retention = config.widget.retention();
    let sweep_interval = config.widget.sweep_interval();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(sweep_interval).await;
            let removed = janitor.sweep_idle_with_retention(retention);
            if removed > 0 {
                info!(
                    name: "widget.swept",
                    removed = removed,
                    "Dropped idle widgets"
                );
            }
        }
    });

    let state = AppState { widgets };
    let app = router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

/// Build the router. Separate from [`start_server`] so tests can drive the
/// HTTP surface without binding a socket.
pub fn router(state: AppState) -> Router {
    Router::new()
        // HTML page
        .route("/", get(index_handler))
        // Widget operations
        .route("/api/widget/activate", post(api_activate))
        .route("/api/widget/close", post(api_close))
        .route("/api/widget/messages", post(api_submit))
        // Inspection
        .route("/api/widgets", get(api_list_widgets))
        .route("/api/widgets/{id}/messages", get(api_get_messages))
        .route("/api/widgets/{id}/events", get(api_widget_events))
        // Static assets
        .nest_service("/static", ServeDir::new("static"))
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(axum::middleware::from_fn(
            |req: Request, next: Next| async move {
                match tokio::time::timeout(REQUEST_TIMEOUT, next.run(req)).await {
                    Ok(res) => res,
                    Err(_) => (StatusCode::REQUEST_TIMEOUT, "Request timed out").into_response(),
                }
            },
        ))
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// HTML Page Handler
// ─────────────────────────────────────────────────────────────────────────────

/// GET / - Host page with the launcher and an empty mount element.
///
/// A fresh page key is minted per render, so each page load starts a new
/// widget lifetime.
async fn index_handler() -> Html<String> {
    let page_id = uuid::Uuid::new_v4().to_string();
    Html(ui::page(&page_id))
}

// ─────────────────────────────────────────────────────────────────────────────
// API Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Request body for the activate API.
#[derive(Debug, Deserialize)]
struct ActivateRequest {
    /// Page key from the host page's mount element.
    page_id: String,
}

/// Response from the activate API.
#[derive(Debug, Serialize)]
struct ActivateResponse {
    /// Page key the widget is bound to.
    page_id: String,
    /// Visibility after this activation.
    visible: bool,
    /// Whether this activation created the widget.
    created: bool,
    /// Panel fragment (styles + markup), present only on creation.
    panel: Option<String>,
}

/// POST /api/widget/activate - Create the widget or toggle its visibility.
async fn api_activate(
    State(state): State<AppState>,
    Json(req): Json<ActivateRequest>,
) -> Json<ActivateResponse> {
    let (widget, outcome) = state.widgets.activate(&req.page_id);

    info!(
        name: "widget.activated",
        page_id = %req.page_id,
        outcome = ?outcome,
        "Widget activated"
    );

    let created = outcome == Activation::Created;
    let panel = created.then(|| ui::panel(&widget.messages(), widget.is_visible()));

    Json(ActivateResponse {
        page_id: req.page_id,
        visible: widget.is_visible(),
        created,
        panel,
    })
}

/// Request body for the close API.
#[derive(Debug, Deserialize)]
struct CloseRequest {
    page_id: String,
}

/// POST /api/widget/close - Hide the panel. The transcript is retained.
async fn api_close(
    State(state): State<AppState>,
    Json(req): Json<CloseRequest>,
) -> Result<StatusCode, ApiError> {
    let widget = state
        .widgets
        .get(&req.page_id)
        .ok_or_else(|| ApiError::WidgetNotFound(req.page_id.clone()))?;

    widget.close();
    info!(name: "widget.closed", page_id = %req.page_id, "Widget closed");
    Ok(StatusCode::NO_CONTENT)
}

/// Request body for message submission.
#[derive(Debug, Deserialize)]
struct SubmitRequest {
    page_id: String,
    /// Raw input; trimmed server-side.
    text: String,
}

/// Response from message submission.
#[derive(Debug, Serialize)]
struct SubmitResponse {
    /// False when the trimmed text was empty and nothing happened.
    accepted: bool,
}

/// POST /api/widget/messages - Submit user input.
async fn api_submit(
    State(state): State<AppState>,
    Json(req): Json<SubmitRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let widget = state
        .widgets
        .get(&req.page_id)
        .ok_or_else(|| ApiError::WidgetNotFound(req.page_id.clone()))?;

    let accepted = widget.submit(&req.text);
    tracing::debug!(
        name: "widget.submitted",
        page_id = %req.page_id,
        accepted = accepted,
        "Message submitted"
    );

    Ok(Json(SubmitResponse { accepted }))
}

/// Widget info for listing.
#[derive(Debug, Serialize)]
struct WidgetInfo {
    page_id: String,
    visible: bool,
    message_count: usize,
}

/// GET /api/widgets - List live widgets.
async fn api_list_widgets(State(state): State<AppState>) -> Json<Vec<WidgetInfo>> {
    let widgets: Vec<WidgetInfo> = state
        .widgets
        .list_ids()
        .iter()
        .filter_map(|id| {
            state.widgets.get(id).map(|w| WidgetInfo {
                page_id: id.clone(),
                visible: w.is_visible(),
                message_count: w.message_count(),
            })
        })
        .collect();

    Json(widgets)
}

/// GET /api/widgets/:id/messages - Get the transcript, oldest first.
async fn api_get_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let widget = state
        .widgets
        .get(&id)
        .ok_or_else(|| ApiError::WidgetNotFound(id.clone()))?;

    Ok(Json(widget.messages()))
}

/// GET /api/widgets/:id/events - SSE stream of widget events.
async fn api_widget_events(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let widget = state
        .widgets
        .get(&id)
        .ok_or_else(|| ApiError::WidgetNotFound(id.clone()))?;

    info!(
        name: "widget.events.subscribed",
        page_id = %id,
        "Event stream opened"
    );

    let stream = BroadcastStream::new(widget.subscribe());
    let sse_stream = async_stream::stream! {
        futures::pin_mut!(stream);
        while let Some(item) = stream.next().await {
            match item {
                Ok(event) => {
                    yield Ok::<String, Infallible>(sse_event(&event));
                }
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    // The page resyncs from the transcript endpoint.
                    tracing::warn!(
                        page_id = %id,
                        skipped = skipped,
                        "Event subscriber lagged"
                    );
                }
            }
        }
    };

    let body = axum::body::Body::from_stream(sse_stream);
    Ok(build_sse_response(body))
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn build_sse_response(body: axum::body::Body) -> Response {
    let mut resp = Response::new(body);
    let h = resp.headers_mut();
    h.insert("Content-Type", "text/event-stream".parse().unwrap());
    h.insert("Cache-Control", "no-cache".parse().unwrap());
    h.insert("Connection", "keep-alive".parse().unwrap());
    h.insert("X-Accel-Buffering", "no".parse().unwrap());
    resp
}
