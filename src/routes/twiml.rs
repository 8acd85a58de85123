//! Minimal TwiML documents returned to carrier webhooks.

use axum::http::header;
use axum::response::{IntoResponse, Response};

const XML_HEADER: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq)]
pub enum TwiML {
    /// No reply.
    Empty,
    /// Reply with a text message.
    Message(String),
    /// Accept an inbound fax and post the document to `action`.
    Receive { action: String },
    /// Refuse an inbound fax.
    Reject,
}

impl TwiML {
    pub fn render(&self) -> String {
        let body = match self {
            TwiML::Empty => "<Response></Response>".to_string(),
            TwiML::Message(text) => format!(
                "<Response><Message><Body>{}</Body></Message></Response>",
                escape(text)
            ),
            TwiML::Receive { action } => format!(
                "<Response><Receive action=\"{}\" method=\"POST\" mediaType=\"application/pdf\"></Receive></Response>",
                escape(action)
            ),
            TwiML::Reject => "<Response><Reject></Reject></Response>".to_string(),
        };
        format!("{XML_HEADER}{body}")
    }
}

impl IntoResponse for TwiML {
    fn into_response(self) -> Response {
        ([(header::CONTENT_TYPE, "application/xml")], self.render()).into_response()
    }
}
