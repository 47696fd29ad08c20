// src/lib.rs
//! Greetmail - Customizable welcome emails for newly created user accounts.
//!
//! Replaces a host platform's default new-user notification with an
//! administrator-configured template. The host supplies the collaborators
//! (settings storage, user-attribute lookup, mail transport, site URLs);
//! this crate owns the settings validation rules, the placeholder
//! substitution engine, and the header composition.

pub mod context;
pub mod envelope;
pub mod error;
pub mod filter;
pub mod notify;
pub mod settings;
pub mod store;
pub mod template;

// Re-export commonly used types
pub use context::{MetadataResolver, NewUser, RenderContext, Site};
pub use envelope::{compose, MessageEnvelope, HTML_CONTENT_TYPE};
pub use error::{StoreError, TestSendError, TransportError};
pub use filter::filter_new_user_email;
pub use notify::{
    MailTransport, SentPreview, SmtpConfig, SmtpMailTransport, TestSender, TlsMode,
};
pub use settings::{EmailSettings, DEFAULT_MESSAGE, DEFAULT_SUBJECT};
pub use store::{load_settings, save_settings, MemoryStore, SettingsStore};
pub use template::render;
