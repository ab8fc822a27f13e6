//! Pure domain logic for the multi-area project approval workflow.
//!
//! Everything in this crate is side-effect free: state machine rules,
//! status aggregation, authorization checks, and digest helpers. The
//! persistence layer (`gradus-db`) and the orchestrating engine
//! (`gradus-engine`) build on these primitives.

pub mod aggregate;
pub mod area;
pub mod error;
pub mod feedback;
pub mod integrity;
pub mod notification;
pub mod principal;
pub mod stage;
pub mod types;

pub use error::CoreError;
