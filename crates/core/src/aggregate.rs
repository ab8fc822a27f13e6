//! Aggregate project status derived from the stage set.
//!
//! The project row never holds independent truth: its status is a pure
//! function of the stage statuses (plus whether the client has formally
//! submitted). The engine recomputes this value after every stage mutation
//! and stores it compare-and-set style; a direct write that disagrees with
//! the derived value is an [`CoreError::InconsistentState`].

use crate::error::CoreError;
use crate::stage::StageStatus;

// ---------------------------------------------------------------------------
// ProjectStatus
// ---------------------------------------------------------------------------

/// Overall project lifecycle status (derived, see [`derive_status`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectStatus {
    Draft,
    InProgress,
    UnderReview,
    Approved,
    Rejected,
}

impl ProjectStatus {
    /// String representation for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Draft => "draft",
            ProjectStatus::InProgress => "in_progress",
            ProjectStatus::UnderReview => "under_review",
            ProjectStatus::Approved => "approved",
            ProjectStatus::Rejected => "rejected",
        }
    }

    /// Parse from a stored string.
    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "draft" => Ok(ProjectStatus::Draft),
            "in_progress" => Ok(ProjectStatus::InProgress),
            "under_review" => Ok(ProjectStatus::UnderReview),
            "approved" => Ok(ProjectStatus::Approved),
            "rejected" => Ok(ProjectStatus::Rejected),
            other => Err(CoreError::Validation(format!(
                "Unknown project status: '{other}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

/// Project priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(CoreError::Validation(format!("Unknown priority: '{other}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Derivation
// ---------------------------------------------------------------------------

/// Derive the aggregate status from stage statuses.
///
/// Precedence, highest first:
/// 1. any `rejected` → `Rejected`
/// 2. all `approved` (non-empty set) → `Approved`
/// 3. any `in_review` → `UnderReview` when submitted, else `InProgress`
/// 4. otherwise → `Draft`
pub fn derive_status(stages: &[StageStatus], submitted: bool) -> ProjectStatus {
    if stages.iter().any(|s| *s == StageStatus::Rejected) {
        ProjectStatus::Rejected
    } else if !stages.is_empty() && stages.iter().all(|s| *s == StageStatus::Approved) {
        ProjectStatus::Approved
    } else if stages.iter().any(|s| *s == StageStatus::InReview) {
        if submitted {
            ProjectStatus::UnderReview
        } else {
            ProjectStatus::InProgress
        }
    } else {
        ProjectStatus::Draft
    }
}

/// Overall progress: arithmetic mean of per-stage progress, rounded down.
/// Zero for a project with no stages yet.
pub fn overall_progress(stage_progress: &[i16]) -> i16 {
    if stage_progress.is_empty() {
        return 0;
    }
    let sum: i64 = stage_progress.iter().map(|p| *p as i64).sum();
    (sum / stage_progress.len() as i64) as i16
}

/// Guard for direct status writes: only the derived value is accepted.
pub fn check_direct_write(
    requested: ProjectStatus,
    derived: ProjectStatus,
) -> Result<(), CoreError> {
    if requested == derived {
        Ok(())
    } else {
        Err(CoreError::InconsistentState(format!(
            "status '{}' conflicts with derived status '{}'",
            requested.as_str(),
            derived.as_str()
        )))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
