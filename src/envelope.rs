//! Outgoing message envelope and header composition.

use serde::{Deserialize, Serialize};

use crate::settings::EmailSettings;

/// The `Content-Type` header appended when HTML output is enabled.
pub const HTML_CONTENT_TYPE: &str = "Content-Type: text/html; charset=UTF-8";

/// The subject/body/headers triple handed to the mail transport.
///
/// Built fresh for every render and discarded after use; carries no state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEnvelope {
    pub subject: String,
    pub body: String,
    /// Ordered header lines, e.g. `Content-Type: text/html; charset=UTF-8`.
    pub headers: Vec<String>,
}

impl MessageEnvelope {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
            headers: Vec::new(),
        }
    }

    /// The value of the first header with the given name, if any.
    pub fn header(&self, name: &str) -> Option<&str> {
        let prefix = format!("{}:", name);
        self.headers
            .iter()
            .find(|line| starts_with_ignore_case(line, &prefix))
            .map(|line| line[prefix.len()..].trim_start())
    }
}

/// Combine rendered subject/body with the settings into a final envelope.
///
/// Header rules:
/// - HTML mode drops every pre-existing `Content-Type` header
///   (case-insensitive prefix match) and appends exactly one
///   `text/html; charset=UTF-8` header.
/// - A configured sender appends a `From` header: display-name form when
///   both name and address are set, address-only form otherwise. Without an
///   address the transport default applies.
///
/// Stateless and idempotent given identical inputs; nothing is sent here.
pub fn compose(
    settings: &EmailSettings,
    subject: String,
    body: String,
    existing_headers: Vec<String>,
) -> MessageEnvelope {
    let mut headers = existing_headers;

    if settings.send_html {
        headers.retain(|line| !starts_with_ignore_case(line, "Content-Type:"));
        headers.push(HTML_CONTENT_TYPE.to_string());
    }

    if let Some(from) = settings.from_header() {
        headers.push(from);
    }

    MessageEnvelope {
        subject,
        body,
        headers,
    }
}

// Byte-wise comparison: header lines are host-supplied and may hold
// multibyte text, so str slicing at the prefix length could split a char.
fn starts_with_ignore_case(line: &str, prefix: &str) -> bool {
    line.len() >= prefix.len()
        && line.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}
