//! SMTP mail transport built on lettre.
//!
//! Production implementation of [`MailTransport`]. The envelope's header
//! lines drive the wire message: a `From` header overrides the configured
//! default sender, and the `Content-Type` header selects HTML or plain-text
//! output.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Deserialize;

use super::traits::MailTransport;
use crate::envelope::MessageEnvelope;
use crate::error::TransportError;

/// SMTP connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub tls: TlsMode,
    #[serde(default = "default_true")]
    pub tls_verify: bool,
    /// Default sender mailbox, used when the envelope carries no `From`
    /// header (e.g. `Site <noreply@site.test>`).
    pub default_from: String,
}

/// TLS mode for SMTP connections.
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
    None,
    #[default]
    Starttls,
    Tls,
}

fn default_true() -> bool {
    true
}

/// Lettre-backed SMTP transport.
pub struct SmtpMailTransport {
    inner: AsyncSmtpTransport<Tokio1Executor>,
    default_from: Mailbox,
}

impl SmtpMailTransport {
    /// Build the transport from configuration.
    ///
    /// Fails when the TLS parameters cannot be constructed or the default
    /// sender address does not parse.
    pub fn from_config(config: &SmtpConfig) -> Result<Self, TransportError> {
        let default_from: Mailbox = config
            .default_from
            .parse()
            .map_err(|e| {
                TransportError::BadEnvelope(format!(
                    "invalid default_from address '{}': {}",
                    config.default_from, e
                ))
            })?;

        let tls_parameters = if config.tls != TlsMode::None {
            let mut builder = TlsParameters::builder(config.host.clone());
            if !config.tls_verify {
                builder = builder.dangerous_accept_invalid_certs(true);
            }
            Some(builder.build().map_err(|e| {
                TransportError::SendFailed(format!("TLS configuration error: {}", e))
            })?)
        } else {
            None
        };

        let builder = match (config.tls, tls_parameters) {
            (TlsMode::None, _) => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
                    .port(config.port)
            }
            (TlsMode::Starttls, Some(params)) => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
                    .port(config.port)
                    .tls(Tls::Required(params))
            }
            (TlsMode::Tls, Some(params)) => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
                    .port(config.port)
                    .tls(Tls::Wrapper(params))
            }
            // Parameters are always built for the TLS modes above.
            (_, None) => unreachable!("TLS parameters required for TLS modes"),
        };

        let builder = match (&config.username, &config.password) {
            (Some(user), Some(pass)) => {
                builder.credentials(Credentials::new(user.clone(), pass.clone()))
            }
            (None, None) => builder,
            _ => {
                return Err(TransportError::SendFailed(
                    "smtp username and password must be set together".to_string(),
                ))
            }
        };

        Ok(Self {
            inner: builder.build(),
            default_from,
        })
    }

    /// Translate an envelope into a lettre [`Message`] for one recipient.
    fn build_message(
        &self,
        to: &str,
        envelope: &MessageEnvelope,
    ) -> Result<Message, TransportError> {
        let to: Mailbox = to
            .parse()
            .map_err(|e| TransportError::BadEnvelope(format!("invalid recipient '{}': {}", to, e)))?;

        let from = match envelope.header("From") {
            Some(raw) => raw.parse::<Mailbox>().map_err(|e| {
                TransportError::BadEnvelope(format!("invalid From header '{}': {}", raw, e))
            })?,
            None => self.default_from.clone(),
        };

        let content_type = match envelope.header("Content-Type") {
            Some(raw) => raw.parse::<ContentType>().map_err(|e| {
                TransportError::BadEnvelope(format!("invalid Content-Type '{}': {}", raw, e))
            })?,
            None => ContentType::TEXT_PLAIN,
        };

        Message::builder()
            .from(from)
            .to(to)
            .subject(&envelope.subject)
            .header(content_type)
            .body(envelope.body.clone())
            .map_err(|e| TransportError::BadEnvelope(format!("failed to build email: {}", e)))
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn deliver(&self, to: &str, envelope: &MessageEnvelope) -> Result<(), TransportError> {
        let message = self.build_message(to, envelope)?;

        match self.inner.send(message).await {
            Ok(_) => {
                tracing::debug!(recipient = %to, "email delivered via SMTP");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(recipient = %to, error = %e, "SMTP delivery failed");
                Err(TransportError::SendFailed(e.to_string()))
            }
        }
    }
}
