//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts, validated with `validator`

pub mod document;
pub mod feedback;
pub mod notification;
pub mod project;
pub mod stage;
