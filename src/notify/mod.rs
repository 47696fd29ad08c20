//! Test-send ("preview") handling.
//!
//! An administrator can ask for the configured template to be sent to a
//! chosen address before enabling it site-wide. The handler resolves the
//! recipient, renders against the acting admin's own account, and hands the
//! composed envelope to a [`MailTransport`]. Every failure is a discrete
//! [`TestSendError`] outcome for display; nothing is retried.

mod smtp;
mod traits;

pub use smtp::{SmtpConfig, SmtpMailTransport, TlsMode};
pub use traits::MailTransport;

use lettre::Address;
use std::sync::Arc;

use crate::context::{MetadataResolver, NewUser, RenderContext, Site};
use crate::envelope::{compose, MessageEnvelope};
use crate::error::TestSendError;
use crate::settings::EmailSettings;
use crate::template::render;

/// A successfully delivered preview, returned for display.
#[derive(Debug, Clone)]
pub struct SentPreview {
    pub recipient: String,
    pub envelope: MessageEnvelope,
}

/// Sends a preview of the configured template through an injected transport.
pub struct TestSender {
    transport: Arc<dyn MailTransport>,
}

impl TestSender {
    pub fn new(transport: Arc<dyn MailTransport>) -> Self {
        Self { transport }
    }

    /// Render the template against the acting admin and deliver it.
    ///
    /// Recipient resolution: the configured preview address wins when set —
    /// a set-but-invalid address aborts with
    /// [`TestSendError::InvalidRecipient`] and nothing is sent. Without a
    /// preview address, the admin's own email is used; without either, the
    /// send aborts with [`TestSendError::MissingRecipient`].
    ///
    /// The preview has no default notification to mine for a reset link, so
    /// `{set_password_url}` falls back to the site's lost-password URL.
    pub async fn send_preview(
        &self,
        settings: &EmailSettings,
        admin: &NewUser,
        site: &Site,
        metadata: Option<&dyn MetadataResolver>,
    ) -> Result<SentPreview, TestSendError> {
        let recipient = resolve_recipient(settings, admin)?;

        let ctx = RenderContext::build(admin, site, "", metadata);
        let subject = render(&settings.subject, &ctx);
        let body = render(&settings.message, &ctx);
        let envelope = compose(settings, subject, body, Vec::new());

        tracing::debug!(recipient = %recipient, "sending preview email");
        self.transport.deliver(&recipient, &envelope).await?;

        Ok(SentPreview {
            recipient,
            envelope,
        })
    }
}

/// Pick the preview recipient: configured preview address first, then the
/// acting admin's own address.
fn resolve_recipient(
    settings: &EmailSettings,
    admin: &NewUser,
) -> Result<String, TestSendError> {
    let candidate = match &settings.preview_email {
        Some(preview) if !preview.is_empty() => preview.clone(),
        _ if !admin.email.is_empty() => admin.email.clone(),
        _ => return Err(TestSendError::MissingRecipient),
    };

    if candidate.parse::<Address>().is_err() {
        return Err(TestSendError::InvalidRecipient { address: candidate });
    }

    Ok(candidate)
}
