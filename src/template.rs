//! Placeholder substitution over subject and body templates.
//!
//! # Architecture
//!
//! The renderer sits between the context builder and the composer:
//! ```text
//! settings.rs → context.rs → template.rs → envelope.rs
//! ```
//!
//! Rendering is two fixed passes:
//!
//! 1. **Literal pass** — the five static tokens (`{site_name}`,
//!    `{username}`, `{user_email}`, `{set_password_url}`, `{login_url}`)
//!    are replaced by exact string match in a single left-to-right scan.
//!    Replacement text is skipped over, never rescanned, so context values
//!    are not reinterpreted as templates.
//! 2. **Dynamic pass** — `{meta:<key>}` tokens are resolved through the
//!    context's [`MetadataResolver`](crate::context::MetadataResolver).
//!
//! The ordering is deliberate: metadata values are never scanned for static
//! tokens and static values are never rescanned for static tokens. One pass
//! per kind, no recursion. Unrecognized `{...}` text passes through
//! untouched.

use regex::Regex;
use std::sync::LazyLock;

use crate::context::RenderContext;

static META_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{meta:([^}]+)\}").expect("valid regex"));

/// Render a template against a context.
///
/// Templates containing no recognized token are returned unchanged.
pub fn render(template: &str, ctx: &RenderContext) -> String {
    let replacements: [(&str, &str); 5] = [
        ("{site_name}", &ctx.site_name),
        ("{username}", &ctx.username),
        ("{user_email}", &ctx.user_email),
        ("{set_password_url}", &ctx.set_password_url),
        ("{login_url}", &ctx.login_url),
    ];

    let literal = replace_literal(template, &replacements);

    META_PATTERN
        .replace_all(&literal, |caps: &regex::Captures<'_>| {
            ctx.resolve_meta(&caps[1])
        })
        .into_owned()
}

/// Single-pass exact-match substitution (strtr semantics).
///
/// At each position the first matching token is replaced and the scan
/// resumes after the replacement, so replacement values are never rescanned.
fn replace_literal(input: &str, pairs: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pos = 0;

    while pos < input.len() {
        let rest = &input[pos..];
        match pairs.iter().find(|(token, _)| rest.starts_with(token)) {
            Some((token, value)) => {
                out.push_str(value);
                pos += token.len();
            }
            None => match rest.chars().next() {
                Some(ch) => {
                    out.push(ch);
                    pos += ch.len_utf8();
                }
                None => break,
            },
        }
    }

    out
}
