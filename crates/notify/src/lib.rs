//! Notification dispatch for the approval workflow.
//!
//! Building blocks:
//!
//! - [`MailTransport`] — injected delivery collaborator; SMTP
//!   implementation in [`smtp`], test doubles live with the tests.
//! - [`Dispatcher`] — turns domain events into durable notification
//!   records, attempts immediate delivery, and owns the bounded-retry
//!   path. Delivery failure never escalates past the record.
//! - [`SweepService`] — periodic background sweeps: retry failed
//!   deliveries, remind on stale reviews, warn on approaching deadlines.
//! - [`RecipientDirectory`] — identity-collaborator seam resolving user
//!   ids to addresses for the sweeps.

pub mod directory;
pub mod dispatcher;
pub mod smtp;
pub mod sweep;
pub mod template;
pub mod transport;

pub use directory::RecipientDirectory;
pub use dispatcher::{Dispatcher, Recipient};
pub use smtp::{EmailConfig, SmtpMailer};
pub use sweep::SweepService;
pub use transport::{MailTransport, OutboundEmail, TransportError};
