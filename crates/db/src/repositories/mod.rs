//! Repository structs, one per table.

pub mod document_repo;
pub mod feedback_repo;
pub mod notification_repo;
pub mod project_repo;
pub mod stage_repo;

pub use document_repo::DocumentRepo;
pub use feedback_repo::FeedbackRepo;
pub use notification_repo::NotificationRepo;
pub use project_repo::ProjectRepo;
pub use stage_repo::StageRepo;
