//! Settings record and validation for the custom welcome email.
//!
//! The record is a singleton persisted by the host through a
//! [`SettingsStore`](crate::store::SettingsStore). Two entry points exist:
//!
//! - [`EmailSettings::sanitize`] normalizes raw admin-form input (checkbox
//!   semantics, text/HTML sanitization, email syntax checks), and
//! - [`EmailSettings::from_stored`] merges a previously persisted value over
//!   the built-in defaults.
//!
//! Neither path can fail: malformed fields silently degrade to their
//! defaults rather than rejecting the whole record.

use ammonia::Builder;
use lettre::Address;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;

use crate::context::decode_entities;

/// Default subject template used when the admin leaves the field empty.
pub const DEFAULT_SUBJECT: &str = "Welcome to {site_name}";

/// Default message template used when the admin leaves the field empty.
pub const DEFAULT_MESSAGE: &str = "Hi {username},\n\n\
Your account has been created on {site_name}.\n\n\
Set your password here:\n{set_password_url}\n\n\
Then log in at:\n{login_url}\n\n\
If you did not expect this account, please ignore this email.";

/// HTML tags allowed in the message template when HTML output is enabled.
const ALLOWED_TAGS: &[&str] = &[
    "a", "b", "blockquote", "br", "code", "div", "em", "h1", "h2", "h3", "h4",
    "h5", "h6", "hr", "i", "img", "li", "ol", "p", "pre", "span", "strong",
    "table", "tbody", "td", "th", "thead", "tr", "ul",
];

/// Attributes allowed on any of the allowed tags.
const ALLOWED_ATTRIBUTES: &[&str] = &["alt", "href", "src", "title"];

/// The administrator-configured welcome email settings.
///
/// `subject` and `message` are always non-empty; `from_email` and
/// `preview_email`, when `Some`, hold syntactically valid addresses (after
/// [`EmailSettings::sanitize`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailSettings {
    /// Whether the custom template replaces the default notification.
    #[serde(default)]
    pub enabled: bool,
    /// Send as HTML rather than plain text.
    #[serde(default)]
    pub send_html: bool,
    /// Optional sender display name; used only together with `from_email`.
    #[serde(default)]
    pub from_name: Option<String>,
    /// Optional sender address override.
    #[serde(default)]
    pub from_email: Option<String>,
    /// Optional override recipient for test sends.
    #[serde(default)]
    pub preview_email: Option<String>,
    /// Subject template containing placeholder tokens.
    #[serde(default = "default_subject")]
    pub subject: String,
    /// Message body template containing placeholder tokens.
    #[serde(default = "default_message")]
    pub message: String,
}

fn default_subject() -> String {
    DEFAULT_SUBJECT.to_string()
}

fn default_message() -> String {
    DEFAULT_MESSAGE.to_string()
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            send_html: false,
            from_name: None,
            from_email: None,
            preview_email: None,
            subject: default_subject(),
            message: default_message(),
        }
    }
}

impl EmailSettings {
    /// Normalize raw admin-form input into a well-typed record.
    ///
    /// Checkbox semantics apply to `enabled` and `send_html`: an absent key
    /// means off. Text fields are stripped of markup, email fields must
    /// parse as addresses or are dropped, and an empty subject or message
    /// falls back to the built-in template. Never fails; persistence is the
    /// caller's responsibility.
    pub fn sanitize(raw: &Value) -> Self {
        let map = match raw.as_object() {
            Some(map) => map,
            None => return Self::default(),
        };

        let send_html = map.get("send_html").is_some_and(truthy);

        // A message that sanitizes down to nothing also falls back.
        let message = map
            .get("message")
            .and_then(Value::as_str)
            .map(|text| {
                if send_html {
                    sanitize_html(text)
                } else {
                    sanitize_multiline(text)
                }
            })
            .filter(|message| !message.is_empty())
            .unwrap_or_else(default_message);

        Self {
            enabled: map.get("enabled").is_some_and(truthy),
            send_html,
            from_name: map
                .get("from_name")
                .and_then(Value::as_str)
                .map(sanitize_text)
                .filter(|name| !name.is_empty()),
            from_email: map
                .get("from_email")
                .and_then(Value::as_str)
                .and_then(sanitize_email),
            preview_email: map
                .get("preview_email")
                .and_then(Value::as_str)
                .and_then(sanitize_email),
            subject: map
                .get("subject")
                .and_then(Value::as_str)
                .map(sanitize_text)
                .filter(|subject| !subject.is_empty())
                .unwrap_or_else(default_subject),
            message,
        }
    }

    /// Merge a previously persisted value over the defaults.
    ///
    /// Missing fields take their default; present fields are read leniently
    /// (numeric and string forms of the boolean flags are accepted, since
    /// older hosts persisted `1`/`0`). A non-mapping value yields pure
    /// defaults.
    pub fn from_stored(value: &Value) -> Self {
        let map = match value.as_object() {
            Some(map) => map,
            None => return Self::default(),
        };

        let defaults = Self::default();
        Self {
            enabled: map.get("enabled").map_or(defaults.enabled, truthy),
            send_html: map.get("send_html").map_or(defaults.send_html, truthy),
            from_name: stored_string(map.get("from_name")),
            from_email: stored_string(map.get("from_email")),
            preview_email: stored_string(map.get("preview_email")),
            subject: stored_string(map.get("subject")).unwrap_or(defaults.subject),
            message: stored_string(map.get("message")).unwrap_or(defaults.message),
        }
    }

    /// Sender mailbox for the `From` header, if an override is configured.
    ///
    /// Returns the display-name form when both fields are set, the
    /// address-only form when only the address is set, `None` otherwise.
    pub fn from_header(&self) -> Option<String> {
        match (&self.from_name, &self.from_email) {
            (Some(name), Some(email)) => Some(format!("From: \"{}\" <{}>", name, email)),
            (None, Some(email)) => Some(format!("From: <{}>", email)),
            _ => None,
        }
    }
}

/// Checkbox truthiness: `true`, non-zero numbers, and non-empty strings
/// other than `"0"` count as on.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty() && s != "0",
        _ => false,
    }
}

fn stored_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::to_string)
        .filter(|s| !s.is_empty())
}

static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

/// Single-line plain text: tags stripped, whitespace runs collapsed, trimmed.
fn sanitize_text(text: &str) -> String {
    let stripped = TAG_PATTERN.replace_all(text, "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Multi-line plain text: tags stripped, entities decoded, line breaks kept.
fn sanitize_multiline(text: &str) -> String {
    let stripped = TAG_PATTERN.replace_all(text, "");
    let decoded = decode_entities(&stripped);
    decoded
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Reduce HTML input to the allow-list: scripts, comments, and event
/// attributes are removed, unknown tags are stripped.
fn sanitize_html(html: &str) -> String {
    let mut builder = Builder::default();
    builder.tags(ALLOWED_TAGS.iter().copied().collect());
    builder.generic_attributes(ALLOWED_ATTRIBUTES.iter().copied().collect());
    builder.strip_comments(true);
    builder.link_rel(None);
    builder.clean(html).to_string().trim().to_string()
}

/// Validate email syntax; invalid input is dropped, not rejected.
fn sanitize_email(text: &str) -> Option<String> {
    let trimmed = text.trim();
    trimmed.parse::<Address>().ok().map(|_| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sanitize_empty_input_yields_defaults() {
        let settings = EmailSettings::sanitize(&json!({}));
        assert_eq!(settings, EmailSettings::default());
        assert!(!settings.enabled);
        assert_eq!(settings.subject, DEFAULT_SUBJECT);
        assert_eq!(settings.message, DEFAULT_MESSAGE);
    }

    #[test]
    fn sanitize_non_mapping_yields_defaults() {
        assert_eq!(
            EmailSettings::sanitize(&json!("garbage")),
            EmailSettings::default()
        );
        assert_eq!(EmailSettings::sanitize(&json!(null)), EmailSettings::default());
    }

    #[test]
    fn checkbox_semantics_absent_means_off() {
        let settings = EmailSettings::sanitize(&json!({
            "subject": "Hello",
        }));
        assert!(!settings.enabled);
        assert!(!settings.send_html);
    }

    #[test]
    fn checkbox_semantics_truthy_forms() {
        for on in [json!(true), json!(1), json!("1"), json!("on")] {
            let settings = EmailSettings::sanitize(&json!({ "enabled": on }));
            assert!(settings.enabled, "expected {:?} to be truthy", on);
        }
        for off in [json!(false), json!(0), json!(""), json!("0"), json!(null)] {
            let settings = EmailSettings::sanitize(&json!({ "enabled": off }));
            assert!(!settings.enabled, "expected {:?} to be falsy", off);
        }
    }

    #[test]
    fn invalid_emails_are_silently_dropped() {
        let settings = EmailSettings::sanitize(&json!({
            "from_email": "not-an-email",
            "preview_email": "also@not@valid",
        }));
        assert_eq!(settings.from_email, None);
        assert_eq!(settings.preview_email, None);
    }

    #[test]
    fn valid_emails_are_kept_trimmed() {
        let settings = EmailSettings::sanitize(&json!({
            "from_email": "  support@example.com  ",
            "preview_email": "admin@example.com",
        }));
        assert_eq!(settings.from_email.as_deref(), Some("support@example.com"));
        assert_eq!(settings.preview_email.as_deref(), Some("admin@example.com"));
    }

    #[test]
    fn from_name_is_stripped_and_collapsed() {
        let settings = EmailSettings::sanitize(&json!({
            "from_name": "  <b>Acme</b>   Support\n Team ",
        }));
        assert_eq!(settings.from_name.as_deref(), Some("Acme Support Team"));
    }

    #[test]
    fn empty_subject_falls_back_to_default() {
        let settings = EmailSettings::sanitize(&json!({ "subject": "   " }));
        assert_eq!(settings.subject, DEFAULT_SUBJECT);
    }

    #[test]
    fn message_sanitizing_to_nothing_falls_back_to_default() {
        let settings = EmailSettings::sanitize(&json!({
            "send_html": true,
            "message": "<script>alert('x')</script>",
        }));
        assert_eq!(settings.message, DEFAULT_MESSAGE);
    }

    #[test]
    fn plain_text_message_keeps_line_breaks() {
        let settings = EmailSettings::sanitize(&json!({
            "message": "Hi {username},\n\nWelcome to <b>{site_name}</b>.\n",
        }));
        assert_eq!(settings.message, "Hi {username},\n\nWelcome to {site_name}.");
    }

    #[test]
    fn html_message_strips_scripts_but_keeps_safe_tags() {
        let settings = EmailSettings::sanitize(&json!({
            "send_html": true,
            "message": "<p>Hi <strong>{username}</strong></p><script>alert('x')</script>",
        }));
        assert!(settings.message.contains("<strong>{username}</strong>"));
        assert!(!settings.message.contains("script"));
        assert!(!settings.message.contains("alert"));
    }

    #[test]
    fn html_message_drops_event_attributes() {
        let settings = EmailSettings::sanitize(&json!({
            "send_html": true,
            "message": "<a href=\"https://x.test\" onclick=\"steal()\">set password</a>",
        }));
        assert!(settings.message.contains("href"));
        assert!(!settings.message.contains("onclick"));
    }

    #[test]
    fn from_stored_merges_over_defaults() {
        let settings = EmailSettings::from_stored(&json!({
            "enabled": 1,
            "subject": "Custom subject",
        }));
        assert!(settings.enabled);
        assert!(!settings.send_html);
        assert_eq!(settings.subject, "Custom subject");
        assert_eq!(settings.message, DEFAULT_MESSAGE);
    }

    #[test]
    fn from_stored_non_mapping_yields_defaults() {
        assert_eq!(
            EmailSettings::from_stored(&json!([1, 2])),
            EmailSettings::default()
        );
    }

    #[test]
    fn from_header_forms() {
        let mut settings = EmailSettings::default();
        assert_eq!(settings.from_header(), None);

        settings.from_email = Some("support@x.com".to_string());
        assert_eq!(
            settings.from_header().as_deref(),
            Some("From: <support@x.com>")
        );

        settings.from_name = Some("Support".to_string());
        assert_eq!(
            settings.from_header().as_deref(),
            Some("From: \"Support\" <support@x.com>")
        );
    }

    #[test]
    fn record_round_trips_through_serde() {
        let settings = EmailSettings {
            enabled: true,
            send_html: true,
            from_name: Some("Support".to_string()),
            from_email: Some("support@x.com".to_string()),
            preview_email: None,
            subject: "Hello {username}".to_string(),
            message: "<p>Welcome</p>".to_string(),
        };
        let value = serde_json::to_value(&settings).unwrap();
        assert_eq!(EmailSettings::from_stored(&value), settings);
    }
}
