//! Server-side transcript rendering.
//!
//! Produces the HTML fragment the chat page swaps into its transcript pane.
//! Output depends only on the messages passed in, so rendering the same
//! transcript twice yields identical bytes.

use std::fmt::Write as _;

use aibrew_core::types::{Message, Role};

/// Royal blue bubble for the user's messages.
pub const USER_BUBBLE_COLOR: &str = "#4169E1";
/// Light gray bubble for the model's replies.
pub const ASSISTANT_BUBBLE_COLOR: &str = "#F1F0F0";

/// Render the whole transcript as one `<div class="transcript">` fragment.
pub fn render_transcript(messages: &[Message]) -> String {
    let mut html = String::with_capacity(128 + messages.len() * 256);
    html.push_str("<div class=\"transcript\" role=\"log\" aria-live=\"polite\">");
    if messages.is_empty() {
        html.push_str("<p class=\"transcript-empty\">No messages yet.</p>");
    }
    for message in messages {
        render_bubble(&mut html, message);
    }
    html.push_str("</div>");
    html
}

fn render_bubble(html: &mut String, message: &Message) {
    // User bubbles sit on the right, replies on the left.
    let (class, background, foreground, push) = match message.role {
        Role::User => ("bubble bubble-user", USER_BUBBLE_COLOR, "white", "left"),
        Role::Assistant => ("bubble bubble-assistant", ASSISTANT_BUBBLE_COLOR, "black", "right"),
    };

    // Writing to a String never fails.
    let _ = write!(
        html,
        "<div class=\"{class}\" style=\"background-color:{background};color:{foreground};\
         padding:10px;border-radius:10px;margin:6px 0;max-width:80%;\
         margin-{push}:auto;text-align:left;white-space:pre-wrap;\">\
         <strong>{label}:</strong> {content}\
         <span class=\"bubble-time\" style=\"display:block;font-size:0.75em;opacity:0.7;\">{time}</span>\
         </div>",
        class = class,
        background = background,
        foreground = foreground,
        push = push,
        label = message.role.display_name(),
        content = escape_html(&message.content),
        time = message.created_at.format("%H:%M"),
    );
}

/// Escape text for safe inclusion in HTML element content or attributes.
pub fn escape_html(text: &str) -> String {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_transcript() {
        let html = render_transcript(&[]);
        assert!(html.starts_with("<div class=\"transcript\""));
        assert!(html.contains("No messages yet."));
        assert!(html.ends_with("</div>"));
    }

    #[test]
    fn test_user_bubble_style() {
        let html = render_transcript(&[Message::user("Hi")]);
        assert!(html.contains("background-color:#4169E1;color:white;"));
        assert!(html.contains("<strong>You:</strong> Hi"));
        assert!(!html.contains("No messages yet."));
    }

    #[test]
    fn test_assistant_bubble_style() {
        let html = render_transcript(&[Message::assistant("Hello!")]);
        assert!(html.contains("background-color:#F1F0F0;color:black;"));
        assert!(html.contains("<strong>Chatbot:</strong> Hello!"));
    }

    #[test]
    fn test_bubbles_in_transcript_order() {
        let html = render_transcript(&[Message::user("question"), Message::assistant("answer")]);
        let q = html.find("question").unwrap();
        let a = html.find("answer").unwrap();
        assert!(q < a);
        assert_eq!(html.matches("class=\"bubble ").count(), 2);
    }

    #[test]
    fn test_content_is_escaped() {
        let html = render_transcript(&[Message::user("<script>alert('x')</script> & \"q\"")]);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt; &amp; &quot;q&quot;"));
    }

    #[test]
    fn test_rendering_is_idempotent() {
        let messages = vec![
            Message::user("What is this?"),
            Message::assistant("A cat."),
            Message::user("What color?"),
        ];
        assert_eq!(render_transcript(&messages), render_transcript(&messages));
    }

    #[test]
    fn test_escape_html_passthrough() {
        assert_eq!(escape_html("plain text"), "plain text");
        assert_eq!(escape_html("héllo"), "héllo");
    }
}
