//! The assistant popup widget.
//!
//! The widget is an explicit instance object rather than ambient page state:
//! [`Widget`] owns the visibility flag and the append-only transcript, and
//! [`WidgetRegistry`] guarantees at most one instance per page key.
//!
//! # Structure
//!
//! - [`message`]: transcript entries and the canned texts
//! - [`instance`]: the widget instance and its deferred mock reply
//! - [`registry`]: per-page singleton bookkeeping and idle cleanup

pub mod instance;
pub mod message;
pub mod registry;

pub use instance::{DEFAULT_REPLY_DELAY, Widget};
pub use message::{GREETING, MOCK_REPLY, Message, Sender};
pub use registry::{Activation, WidgetRegistry};
