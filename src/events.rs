//! Widget events for the page's event stream.
//!
//! The widget broadcasts a small set of typed events; the server relays them
//! to the page as Server-Sent Events so the panel mirrors server-side state
//! without polling.
//!
//! # Example
//!
//! ```rust
//! use assistant_widget::events::{WidgetEvent, sse_event};
//!
//! let sse = sse_event(&WidgetEvent::PanelHidden);
//! assert!(sse.starts_with("event: panel.hidden\n"));
//! ```

use serde::{Deserialize, Serialize};

use crate::widget::Message;

/// Events emitted by a widget instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "data")]
pub enum WidgetEvent {
    /// The panel became visible.
    #[serde(rename = "panel.shown")]
    PanelShown,

    /// The panel was hidden. The transcript is retained.
    #[serde(rename = "panel.hidden")]
    PanelHidden,

    /// A message was appended to the transcript.
    #[serde(rename = "transcript.append")]
    TranscriptAppend {
        /// The appended message.
        message: Message,
    },
}

/// Get the SSE event name for a [`WidgetEvent`].
#[must_use]
pub fn event_name(evt: &WidgetEvent) -> &'static str {
    match evt {
        WidgetEvent::PanelShown => "panel.shown",
        WidgetEvent::PanelHidden => "panel.hidden",
        WidgetEvent::TranscriptAppend { .. } => "transcript.append",
    }
}

/// Convert a [`WidgetEvent`] to an SSE-formatted string.
///
/// The output follows the Server-Sent Events specification with both an
/// `event:` line (for `EventSource` listeners) and a `data:` line containing
/// the JSON payload.
#[must_use]
pub fn sse_event(evt: &WidgetEvent) -> String {
    let json = serde_json::to_string(evt).unwrap_or_else(|e| {
        serde_json::json!({ "type": "error", "data": { "message": e.to_string() } }).to_string()
    });

    format!("event: {}\ndata: {json}\n\n", event_name(evt))
}
