//! Mail transport trait definition.

use async_trait::async_trait;

use crate::envelope::MessageEnvelope;
use crate::error::TransportError;

/// Abstract mail delivery, implemented by the host or by
/// [`SmtpMailTransport`](crate::notify::SmtpMailTransport).
///
/// Implementations must be `Send + Sync` to work across async tasks. The
/// core never retries; a failed delivery is surfaced as-is.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Deliver an envelope to a single recipient address.
    ///
    /// The envelope's header lines (`From`, `Content-Type`) are
    /// authoritative; implementations translate them into their wire format.
    async fn deliver(&self, to: &str, envelope: &MessageEnvelope) -> Result<(), TransportError>;
}
