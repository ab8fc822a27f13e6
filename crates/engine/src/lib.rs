//! Request-driven workflow engine for the approval portal.
//!
//! [`WorkflowEngine`] orchestrates repositories, the feedback ledger, the
//! integrity verifier and the notification dispatcher for every reviewer
//! or client action. Each operation leaves the project/stage data
//! consistent even if the process dies right after: stage transitions are
//! compare-and-set and the derived project status is recomputed and
//! stored after every mutation.

pub mod error;
pub mod filestore;
pub mod workflow;

pub use error::EngineError;
pub use filestore::{FileStore, LocalFileStore, StoredFile};
pub use workflow::WorkflowEngine;
