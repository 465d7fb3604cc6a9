//! Server-side HTML rendering.
//!
//! The host page and the panel fragment are rendered as plain HTML strings.
//! The panel's styles travel inside the fragment, so they reach the page
//! only when the widget is first activated; the stylesheet under `/static`
//! covers page chrome and the launcher button only.

use crate::widget::Message;

/// Styles for the panel fragment. Delivered with the markup on first
/// activation rather than with the page.
const PANEL_STYLE: &str = "
#assistant-panel {
  position: fixed; bottom: 90px; right: 20px;
  width: 350px; height: 500px;
  background: #fff;
  border: 1px solid #e0e0e0; border-radius: 12px;
  box-shadow: 0 8px 30px rgba(0,0,0,0.12);
  display: flex; flex-direction: column;
  font-family: system-ui, sans-serif;
  z-index: 999;
}
#assistant-panel.hidden { display: none; }
.assistant-header {
  padding: 16px; background: #f4f4f5; border-bottom: 1px solid #ddd;
  border-radius: 12px 12px 0 0; font-weight: 600;
  display: flex; justify-content: space-between;
}
.assistant-close { cursor: pointer; background: none; border: none; font-size: 1.2rem; }
.assistant-messages {
  flex: 1; padding: 16px; overflow-y: auto;
  display: flex; flex-direction: column; gap: 12px;
}
.assistant-msg {
  max-width: 80%; padding: 10px 14px; border-radius: 10px;
  font-size: 0.95rem; line-height: 1.4;
}
.assistant-msg.bot { background: #f0f0f0; align-self: flex-start; color: #333; }
.assistant-msg.user { background: #000; color: #fff; align-self: flex-end; }
.assistant-input-area { padding: 16px; border-top: 1px solid #eee; display: flex; gap: 8px; }
#assistant-input { flex: 1; padding: 10px; border: 1px solid #ddd; border-radius: 6px; outline: none; }
#assistant-input:focus { border-color: #000; }
#assistant-send {
  padding: 0 16px; background: #000; color: #fff; border: none;
  border-radius: 6px; cursor: pointer; font-weight: 600;
}
";

/// Escape text for safe interpolation into HTML.
#[must_use]
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render the host page.
///
/// The page carries the launcher button and an empty mount element tagged
/// with the per-render page key; the panel itself arrives later through the
/// activate endpoint.
#[must_use]
pub fn page(page_id: &str) -> String {
    let page_id = escape(page_id);
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta name="description" content="Assistant popup widget demo">
    <title>Assistant Widget</title>

    <script type="module" src="/static/assistant.js"></script>
    <link rel="stylesheet" href="/static/app.css">
</head>
<body>
    <div id="page-shell">
        <header class="page-header">
            <span class="page-title">Assistant Widget</span>
        </header>

        <main class="page-main">
            <h1>Host page</h1>
            <p>The assistant loads lazily: nothing is mounted until the launcher is clicked.</p>
        </main>
    </div>

    <button id="assistant-launcher" class="assistant-launcher" aria-label="Open AI Assistant">&#128172;</button>
    <div id="assistant-root" data-page-id="{page_id}"></div>
</body>
</html>"#
    )
}

/// Render the panel fragment: styles, header, transcript, input area.
#[must_use]
pub fn panel(messages: &[Message], visible: bool) -> String {
    let transcript: String = messages.iter().map(render_message).collect();
    let hidden_class = if visible { "" } else { "hidden" };
    format!(
        r#"<style>{PANEL_STYLE}</style>
<aside id="assistant-panel" class="{hidden_class}" role="dialog" aria-label="AI Assistant">
    <header class="assistant-header">
        <span>AI Assistant</span>
        <button type="button" class="assistant-close" aria-label="Close">&times;</button>
    </header>
    <div class="assistant-messages" id="assistant-messages">
{transcript}    </div>
    <form class="assistant-input-area" id="assistant-form">
        <input type="text" id="assistant-input" placeholder="Type a message..." autocomplete="off" autofocus />
        <button type="submit" id="assistant-send">Send</button>
    </form>
</aside>"#
    )
}

/// Render a single transcript entry.
#[must_use]
pub fn render_message(message: &Message) -> String {
    format!(
        "        <div class=\"assistant-msg {}\">{}</div>\n",
        message.sender.as_str(),
        escape(&message.text)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::{GREETING, Message};

    #[test]
    fn test_escape() {
        assert_eq!(escape("a < b & c"), "a &lt; b &amp; c");
        assert_eq!(
            escape(r#"<script>alert("x")</script>"#),
            "&lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt;"
        );
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn test_page_carries_page_key_and_launcher() {
        let html = page("page-123");
        assert!(html.contains(r#"data-page-id="page-123""#));
        assert!(html.contains("assistant-launcher"));
        assert!(html.contains("assistant-root"));
    }

    #[test]
    fn test_panel_contains_transcript_and_input() {
        let messages = vec![Message::bot(GREETING)];
        let html = panel(&messages, true);

        assert!(html.contains("assistant-panel"));
        assert!(html.contains(&escape(GREETING)));
        assert!(html.contains("assistant-input"));
        assert!(html.contains("autofocus"));
        assert!(html.contains("<style>"));
        assert!(!html.contains(r#"class="hidden""#));
    }

    #[test]
    fn test_hidden_panel_is_marked() {
        let html = panel(&[], false);
        assert!(html.contains(r#"class="hidden""#));
    }

    #[test]
    fn test_render_message_escapes_text() {
        let message = Message::user("<b>bold</b>");
        let html = render_message(&message);

        assert!(html.contains("assistant-msg user"));
        assert!(html.contains("&lt;b&gt;bold&lt;/b&gt;"));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn test_transcript_renders_in_order() {
        let messages = vec![Message::bot("first"), Message::user("second")];
        let html = panel(&messages, true);

        let first = html.find("first").unwrap();
        let second = html.find("second").unwrap();
        assert!(first < second);
    }
}
