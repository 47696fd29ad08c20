//! Centralized error types for greetmail using thiserror.
//!
//! Settings validation never errors (malformed input degrades to defaults),
//! so the taxonomy here covers only the preview-send path, the mail
//! transport, and the settings store.

use thiserror::Error;

/// Errors surfaced by the preview ("test send") handler.
///
/// Each variant is a discrete outcome the caller can display; none of them
/// implies a retry.
#[derive(Error, Debug)]
pub enum TestSendError {
    /// Neither a preview address nor the acting admin's address is available.
    #[error("no recipient email available for the test send")]
    MissingRecipient,
    /// A recipient address was configured but is not valid email syntax.
    #[error("invalid recipient email address '{address}'")]
    InvalidRecipient { address: String },
    /// The mail transport reported a delivery failure.
    #[error("test send failed: {0}")]
    TransportFailed(#[from] TransportError),
}

/// Errors related to handing an envelope to the mail transport.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The envelope could not be converted into a wire message.
    #[error("invalid outgoing message: {0}")]
    BadEnvelope(String),
    #[error("failed to send email: {0}")]
    SendFailed(String),
}

/// Errors related to the external settings store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to load settings: {0}")]
    LoadFailed(String),
    #[error("failed to save settings: {0}")]
    SaveFailed(String),
}
