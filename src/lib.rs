//! Assistant popup widget
//!
//! A floating "AI Assistant" chat popup that is lazily instantiated on first
//! interaction, delivers its own styles and markup to the page, and echoes a
//! canned response after a fixed delay. All widget state lives server-side;
//! the page carries only a launcher button, a mount element, and a thin
//! client script.
//!
//! # Architecture
//!
//! - **Widget core**: explicit instance objects with activate/close/submit
//!   as public methods, one per page key
//! - **Server**: Axum-based HTTP surface with an SSE event stream
//! - **UI**: server-rendered HTML; the panel fragment ships its styles on
//!   first activation
//!
//! # Modules
//!
//! - [`widget`]: instances, transcript, registry
//! - [`events`]: widget events and SSE framing
//! - [`ui`]: page shell and fragment rendering
//! - [`server`]: router and handlers
//! - [`config`]: layered configuration

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::unused_async)]

pub mod config;
pub mod events;
pub mod server;
pub mod ui;
pub mod widget;

use widget::WidgetRegistry;

/// Application state shared across all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Per-page widget instances.
    pub widgets: WidgetRegistry,
}
