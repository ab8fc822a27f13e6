//! Identity-collaborator seam for recipient resolution.
//!
//! The portal's identity system (CAS) lives outside this core. The sweeps
//! only need two lookups: an address for a known user id, and the
//! administrator list for escalations when no reviewer is assigned.

use async_trait::async_trait;

use gradus_core::types::DbId;

use crate::dispatcher::Recipient;

/// Resolves user ids to notification recipients.
#[async_trait]
pub trait RecipientDirectory: Send + Sync {
    /// Address for a user id, `None` when unknown.
    async fn lookup(&self, user_id: DbId) -> Option<Recipient>;

    /// All administrator recipients.
    async fn admins(&self) -> Vec<Recipient>;
}
