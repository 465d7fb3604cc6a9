//! Transcript messages.

use serde::{Deserialize, Serialize};

/// Greeting appended when a widget is first created.
pub const GREETING: &str = "Hello! I'm loaded lazily. How can I help you today?";

/// Canned reply appended by the deferred mock responder.
///
/// This is a placeholder for a future real response source.
pub const MOCK_REPLY: &str = "I am a static mock response. Connect me to an API!";

/// Who authored a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// Typed into the input field by the person using the page.
    User,
    /// Produced by the widget itself (greeting or mock reply).
    Bot,
}

impl Sender {
    /// Lowercase name used in API payloads and CSS classes.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Bot => "bot",
        }
    }
}

/// A single transcript entry. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message author.
    pub sender: Sender,
    /// Message body, already trimmed for user input.
    pub text: String,
}

impl Message {
    /// Create a user message.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
        }
    }

    /// Create a bot message.
    #[must_use]
    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Bot,
            text: text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        let user = Message::user("hello");
        assert_eq!(user.sender, Sender::User);
        assert_eq!(user.text, "hello");

        let bot = Message::bot(MOCK_REPLY);
        assert_eq!(bot.sender, Sender::Bot);
        assert_eq!(bot.text, MOCK_REPLY);
    }

    #[test]
    fn test_sender_serializes_lowercase() {
        let json = serde_json::to_string(&Message::user("hi")).unwrap();
        assert!(json.contains("\"sender\":\"user\""));

        let json = serde_json::to_string(&Message::bot("hi")).unwrap();
        assert!(json.contains("\"sender\":\"bot\""));
    }
}
