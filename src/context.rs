//! Substitution context assembly for a single render.
//!
//! A [`RenderContext`] is built fresh for every render and discarded after
//! use. It carries the five static placeholder values and an optional
//! [`MetadataResolver`] capability the renderer consults for `{meta:key}`
//! tokens, decoupling the renderer from whatever storage the host keeps
//! user attributes in.

use regex::Regex;
use std::sync::LazyLock;

/// Host-supplied lookup for arbitrary per-user attributes.
///
/// Keys arrive already normalized (lowercased, `[a-z0-9_-]` only).
/// Implementations resolve unknown keys and non-scalar values to the empty
/// string rather than failing.
pub trait MetadataResolver {
    fn resolve(&self, key: &str) -> String;
}

/// The site the account was created on, with its URLs precomputed by the
/// host's URL builders.
#[derive(Debug, Clone)]
pub struct Site {
    /// Display name; may contain HTML entities as stored by the host.
    pub name: String,
    /// Login page URL.
    pub login_url: String,
    /// Generic "forgot password" URL, used when no reset link can be
    /// recovered from the default notification.
    pub lost_password_url: String,
}

/// The newly created user account the notification is about.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Login identifier (not the display name).
    pub login: String,
    /// Account email address.
    pub email: String,
}

/// Placeholder values for one render call.
pub struct RenderContext<'a> {
    pub site_name: String,
    pub username: String,
    pub user_email: String,
    pub set_password_url: String,
    pub login_url: String,
    /// Absent when the render has no associated user; `{meta:...}` tokens
    /// then resolve to the empty string.
    pub metadata: Option<&'a dyn MetadataResolver>,
}

static URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("valid regex"));

impl<'a> RenderContext<'a> {
    /// Assemble the context for a user/site pair.
    ///
    /// The password-set URL is recovered from the default notification's
    /// original body (`default_message`): the first `http(s)://` token wins.
    /// When the body carries no URL, the site's lost-password URL is used
    /// instead.
    pub fn build(
        user: &NewUser,
        site: &Site,
        default_message: &str,
        metadata: Option<&'a dyn MetadataResolver>,
    ) -> Self {
        let set_password_url = URL_PATTERN
            .find(default_message)
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| site.lost_password_url.clone());

        Self {
            site_name: decode_entities(&site.name),
            username: user.login.clone(),
            user_email: user.email.clone(),
            set_password_url,
            login_url: site.login_url.clone(),
            metadata,
        }
    }

    /// Resolve a raw `{meta:...}` key through the host's resolver.
    ///
    /// The key is trimmed and normalized before lookup; without a resolver
    /// the result is always empty.
    pub(crate) fn resolve_meta(&self, raw_key: &str) -> String {
        match self.metadata {
            Some(resolver) => resolver.resolve(&normalize_meta_key(raw_key)),
            None => String::new(),
        }
    }
}

/// Normalize a metadata key: lowercase, restricted to `[a-z0-9_-]`.
pub(crate) fn normalize_meta_key(key: &str) -> String {
    key.trim()
        .chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_' || *c == '-')
        .collect()
}

/// Decode the HTML entities hosts commonly store in site titles.
pub(crate) fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&") // Must be last
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapResolver(HashMap<String, String>);

    impl MetadataResolver for MapResolver {
        fn resolve(&self, key: &str) -> String {
            self.0.get(key).cloned().unwrap_or_default()
        }
    }

    fn test_site() -> Site {
        Site {
            name: "Acme &amp; Co".to_string(),
            login_url: "https://site.test/wp-login.php".to_string(),
            lost_password_url: "https://site.test/wp-login.php?action=lostpassword".to_string(),
        }
    }

    fn test_user() -> NewUser {
        NewUser {
            login: "alice".to_string(),
            email: "alice@site.test".to_string(),
        }
    }

    #[test]
    fn build_extracts_first_url_from_default_message() {
        let message = "Set your password:\nhttps://site.test/wp-login.php?action=rp&key=abc\n\nhttps://site.test/other";
        let ctx = RenderContext::build(&test_user(), &test_site(), message, None);
        assert_eq!(
            ctx.set_password_url,
            "https://site.test/wp-login.php?action=rp&key=abc"
        );
    }

    #[test]
    fn build_falls_back_to_lost_password_url() {
        let ctx = RenderContext::build(&test_user(), &test_site(), "no links here", None);
        assert_eq!(
            ctx.set_password_url,
            "https://site.test/wp-login.php?action=lostpassword"
        );
    }

    #[test]
    fn build_decodes_site_name_entities() {
        let ctx = RenderContext::build(&test_user(), &test_site(), "", None);
        assert_eq!(ctx.site_name, "Acme & Co");
    }

    #[test]
    fn normalize_lowercases_and_strips_unsafe_chars() {
        assert_eq!(normalize_meta_key("Parrain"), "parrain");
        assert_eq!(normalize_meta_key("  billing_id  "), "billing_id");
        assert_eq!(normalize_meta_key("Team-42"), "team-42");
        assert_eq!(normalize_meta_key("a b;DROP TABLE"), "abdroptable");
    }

    #[test]
    fn resolve_meta_without_resolver_is_empty() {
        let ctx = RenderContext::build(&test_user(), &test_site(), "", None);
        assert_eq!(ctx.resolve_meta("anything"), "");
    }

    #[test]
    fn resolve_meta_normalizes_before_lookup() {
        let mut map = HashMap::new();
        map.insert("parrain".to_string(), "bob".to_string());
        let resolver = MapResolver(map);
        let ctx = RenderContext::build(&test_user(), &test_site(), "", Some(&resolver));
        assert_eq!(ctx.resolve_meta("Parrain"), "bob");
        assert_eq!(ctx.resolve_meta(" parrain "), "bob");
        assert_eq!(ctx.resolve_meta("unknown_key"), "");
    }

    #[test]
    fn decode_entities_handles_quotes_and_ampersand() {
        assert_eq!(decode_entities("Tom &amp; Jerry"), "Tom & Jerry");
        assert_eq!(decode_entities("&quot;quoted&quot;"), "\"quoted\"");
        assert_eq!(decode_entities("it&#039;s &#39;fine&#39;"), "it's 'fine'");
        assert_eq!(decode_entities("&lt;tag&gt;"), "<tag>");
    }
}
