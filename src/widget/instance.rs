//! The widget instance: visibility, transcript, deferred mock reply.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use crate::events::WidgetEvent;

use super::message::{GREETING, MOCK_REPLY, Message};

/// Delay before the deferred mock reply is appended.
pub const DEFAULT_REPLY_DELAY: Duration = Duration::from_millis(600);

/// Capacity of the per-widget event channel. Subscribers that lag past this
/// many events miss frames and resync from the transcript endpoint.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// A single assistant popup instance.
///
/// Holds the visibility flag and the append-only transcript. Created on
/// first activation with the greeting already in the transcript, and never
/// destroyed by its own operations (closing only hides it).
///
/// Cloning is cheap and shares state, so a clone can be moved into the
/// deferred reply task while handlers keep their own handle.
#[derive(Debug)]
pub struct Widget {
    inner: Arc<WidgetInner>,
}

#[derive(Debug)]
struct WidgetInner {
    /// Page key this instance is bound to.
    page_id: String,
    /// Whether the panel is currently shown.
    visible: RwLock<bool>,
    /// Ordered transcript, oldest first. Append-only.
    transcript: RwLock<Vec<Message>>,
    /// Delay applied to every deferred reply.
    reply_delay: Duration,
    created_at: DateTime<Utc>,
    /// Last operation time, used by the registry's idle sweep.
    last_activity: RwLock<DateTime<Utc>>,
    /// Broadcast of widget events to SSE subscribers.
    events: broadcast::Sender<WidgetEvent>,
}

impl Clone for Widget {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Widget {
    /// Create a widget for the given page key with the default reply delay.
    ///
    /// The new widget is visible and its transcript already contains the
    /// greeting.
    #[must_use]
    pub fn new(page_id: impl Into<String>) -> Self {
        Self::with_reply_delay(page_id, DEFAULT_REPLY_DELAY)
    }

    /// Create a widget with a custom reply delay.
    #[must_use]
    pub fn with_reply_delay(page_id: impl Into<String>, reply_delay: Duration) -> Self {
        let now = Utc::now();
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let widget = Self {
            inner: Arc::new(WidgetInner {
                page_id: page_id.into(),
                visible: RwLock::new(true),
                transcript: RwLock::new(Vec::new()),
                reply_delay,
                created_at: now,
                last_activity: RwLock::new(now),
                events,
            }),
        };
        widget.push(Message::bot(GREETING));
        tracing::info!(
            name: "widget.created",
            page_id = %widget.inner.page_id,
            "Widget created"
        );
        widget
    }

    /// Get the page key this widget is bound to.
    #[must_use]
    pub fn page_id(&self) -> &str {
        &self.inner.page_id
    }

    /// Whether the panel is currently shown.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        *self.inner.visible.read().unwrap()
    }

    /// Show the panel.
    pub fn show(&self) {
        self.set_visible(true);
    }

    /// Hide the panel. The transcript is retained, so reopening shows the
    /// prior history.
    pub fn close(&self) {
        self.set_visible(false);
    }

    /// Flip visibility and return the new state.
    pub fn toggle(&self) -> bool {
        let next = !self.is_visible();
        self.set_visible(next);
        next
    }

    fn set_visible(&self, visible: bool) {
        {
            let mut guard = self.inner.visible.write().unwrap();
            *guard = visible;
        }
        self.touch();
        let event = if visible {
            WidgetEvent::PanelShown
        } else {
            WidgetEvent::PanelHidden
        };
        self.broadcast(event);
        tracing::debug!(
            name: "widget.visibility",
            page_id = %self.inner.page_id,
            visible = visible,
            "Visibility changed"
        );
    }

    /// Submit user input.
    ///
    /// The text is trimmed; an empty result is a no-op and returns `false`.
    /// Otherwise the user message is appended, a deferred mock reply is
    /// scheduled, and `true` is returned.
    pub fn submit(&self, raw_text: &str) -> bool {
        let text = raw_text.trim();
        if text.is_empty() {
            return false;
        }

        self.push(Message::user(text));
        self.schedule_reply();
        true
    }

    /// Append a message to the transcript and notify subscribers.
    fn push(&self, message: Message) {
        {
            let mut guard = self.inner.transcript.write().unwrap();
            guard.push(message.clone());
        }
        self.touch();
        tracing::debug!(
            name: "widget.message.appended",
            page_id = %self.inner.page_id,
            sender = message.sender.as_str(),
            text_length = message.text.len(),
            "Message appended"
        );
        self.broadcast(WidgetEvent::TranscriptAppend { message });
    }

    /// Schedule the one-shot deferred reply.
    ///
    /// The reply fires once after the configured delay, independent of
    /// further input, and is not cancelled by closing the panel: a reply
    /// scheduled before `close` still lands in the hidden transcript.
    fn schedule_reply(&self) {
        let widget = self.clone();
        let delay = self.inner.reply_delay;
        tracing::debug!(
            name: "widget.reply.scheduled",
            page_id = %self.inner.page_id,
            delay_ms = delay.as_millis() as u64,
            "Mock reply scheduled"
        );
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            widget.push(Message::bot(MOCK_REPLY));
        });
    }

    /// Get the transcript, oldest first.
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.inner.transcript.read().unwrap().clone()
    }

    /// Number of messages in the transcript.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.inner.transcript.read().unwrap().len()
    }

    /// Subscribe to widget events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<WidgetEvent> {
        self.inner.events.subscribe()
    }

    fn broadcast(&self, event: WidgetEvent) {
        // Send fails when no subscriber is connected, which is the normal
        // state before the page opens its event stream.
        let _ = self.inner.events.send(event);
    }

    /// Update the last activity timestamp.
    fn touch(&self) {
        let mut guard = self.inner.last_activity.write().unwrap();
        *guard = Utc::now();
    }

    /// Check whether the widget has seen no activity for `retention`.
    #[must_use]
    pub fn is_idle_for(&self, retention: Duration) -> bool {
        let last = *self.inner.last_activity.read().unwrap();
        let now = Utc::now();
        if let Ok(idle) = (now - last).to_std() {
            idle > retention
        } else {
            // Negative duration means clock skew or "last" is in the future.
            false
        }
    }

    /// Get the widget age.
    #[must_use]
    pub fn age(&self) -> Duration {
        let now = Utc::now();
        (now - self.inner.created_at)
            .to_std()
            .unwrap_or(Duration::from_secs(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::message::Sender;

    #[test]
    fn test_widget_starts_visible_with_greeting() {
        let widget = Widget::new("page-1");

        assert_eq!(widget.page_id(), "page-1");
        assert!(widget.is_visible());

        let messages = widget.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].sender, Sender::Bot);
        assert_eq!(messages[0].text, GREETING);
    }

    #[test]
    fn test_close_retains_transcript() {
        let widget = Widget::new("page-1");

        widget.close();
        assert!(!widget.is_visible());
        assert_eq!(widget.message_count(), 1);

        widget.show();
        assert!(widget.is_visible());
        assert_eq!(widget.messages()[0].text, GREETING);
    }

    #[test]
    fn test_toggle_flips_visibility() {
        let widget = Widget::new("page-1");

        assert!(!widget.toggle());
        assert!(!widget.is_visible());
        assert!(widget.toggle());
        assert!(widget.is_visible());
    }

    #[tokio::test]
    async fn test_submit_rejects_whitespace_input() {
        let widget = Widget::new("page-1");

        assert!(!widget.submit(""));
        assert!(!widget.submit("   "));
        assert!(!widget.submit("\t\n"));
        assert_eq!(widget.message_count(), 1);
    }

    #[tokio::test]
    async fn test_submit_trims_and_appends() {
        let widget = Widget::new("page-1");

        assert!(widget.submit("  hello  "));

        let messages = widget.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].sender, Sender::User);
        assert_eq!(messages[1].text, "hello");
    }

    #[tokio::test(start_paused = true)]
    async fn test_deferred_reply_appends_after_delay() {
        let widget = Widget::new("page-1");

        widget.submit("price?");
        assert_eq!(widget.message_count(), 2);

        // Just before the delay elapses, only greeting + user message exist.
        tokio::time::sleep(Duration::from_millis(599)).await;
        assert_eq!(widget.message_count(), 2);

        tokio::time::sleep(Duration::from_millis(2)).await;
        let messages = widget.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[2].sender, Sender::Bot);
        assert_eq!(messages[2].text, MOCK_REPLY);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_lands_while_hidden() {
        let widget = Widget::new("page-1");

        widget.submit("anyone there?");
        widget.close();

        tokio::time::sleep(Duration::from_millis(700)).await;

        assert!(!widget.is_visible());
        let messages = widget.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[2].text, MOCK_REPLY);
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_submission_gets_one_reply() {
        let widget = Widget::with_reply_delay("page-1", Duration::from_millis(50));

        widget.submit("first");
        widget.submit("second");
        tokio::time::sleep(Duration::from_millis(100)).await;

        let messages = widget.messages();
        // greeting, two user messages, two mock replies
        assert_eq!(messages.len(), 5);
        let replies = messages
            .iter()
            .filter(|m| m.sender == Sender::Bot && m.text == MOCK_REPLY)
            .count();
        assert_eq!(replies, 2);
    }

    #[tokio::test]
    async fn test_subscribers_observe_appends() {
        let widget = Widget::new("page-1");
        let mut rx = widget.subscribe();

        widget.submit("hello");

        match rx.recv().await.unwrap() {
            WidgetEvent::TranscriptAppend { message } => {
                assert_eq!(message.sender, Sender::User);
                assert_eq!(message.text, "hello");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
