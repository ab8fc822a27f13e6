//! Mail transport collaborator seam.
//!
//! The dispatcher is written against this trait; production wires in the
//! SMTP implementation from [`crate::smtp`], tests inject in-memory
//! doubles. No retry or backoff logic lives behind the trait — one call
//! is one delivery attempt.

use async_trait::async_trait;

/// A file attached to an outbound message.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// One fully rendered outbound message.
#[derive(Debug, Clone)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attachments: Vec<Attachment>,
}

impl OutboundEmail {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
            attachments: Vec::new(),
        }
    }
}

/// Error type for delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),

    /// The transport call exceeded its bounded timeout.
    #[error("Delivery attempt timed out")]
    Timeout,
}

/// Injected delivery collaborator. `send` performs exactly one attempt.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<(), TransportError>;
}
