//! Notification filter: replaces the host's default new-user email.
//!
//! The host calls [`filter_new_user_email`] with the envelope it is about to
//! send. When the custom template is enabled and the user reference is
//! valid, a replacement envelope is returned; on any ambiguous condition the
//! original envelope comes back unchanged so account creation is never
//! blocked. This path never fails.

use crate::context::{MetadataResolver, NewUser, RenderContext, Site};
use crate::envelope::{compose, MessageEnvelope};
use crate::settings::EmailSettings;
use crate::template::render;

/// Replace the default new-user notification with the configured template.
///
/// The password-set URL is recovered from `default.body` before the body is
/// replaced, so the one-time reset link the host generated survives into
/// the custom message.
pub fn filter_new_user_email(
    default: MessageEnvelope,
    user: Option<&NewUser>,
    site: &Site,
    settings: &EmailSettings,
    metadata: Option<&dyn MetadataResolver>,
) -> MessageEnvelope {
    if !settings.enabled {
        tracing::debug!("custom welcome email disabled, keeping default notification");
        return default;
    }

    let user = match user {
        Some(user) => user,
        None => {
            tracing::warn!("invalid user reference, keeping default notification");
            return default;
        }
    };

    let ctx = RenderContext::build(user, site, &default.body, metadata);
    let subject = render(&settings.subject, &ctx);
    let body = render(&settings.message, &ctx);

    tracing::debug!(
        username = %user.login,
        send_html = settings.send_html,
        "replacing default new-user notification"
    );

    compose(settings, subject, body, default.headers)
}
