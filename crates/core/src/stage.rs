//! Per-area stage state machine.
//!
//! States: `pending → in_review → {approved | rejected}`. A rejected stage
//! may be re-opened back to `in_review` when the client resubmits;
//! `approved` is terminal for its area.
//!
//! The functions here are pure: they decide whether a transition is legal
//! and what the resulting status/progress is. The persistence layer applies
//! them through compare-and-set updates so a racing caller observes
//! [`CoreError::InvalidState`] instead of silently overwriting.

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Progress constants
// ---------------------------------------------------------------------------

/// Progress value of an approved stage.
pub const PROGRESS_COMPLETE: i16 = 100;

/// Ceiling for progress bumps while a stage is not yet approved.
pub const PROGRESS_UPLOAD_CAP: i16 = 99;

/// Progress increment applied per uploaded document.
pub const PROGRESS_UPLOAD_INCREMENT: i16 = 15;

/// Progress a stage resets to when review (re)starts.
pub const PROGRESS_REVIEW_BASELINE: i16 = 10;

// ---------------------------------------------------------------------------
// StageStatus
// ---------------------------------------------------------------------------

/// Review status of one (project, area) stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    Pending,
    InReview,
    Approved,
    Rejected,
}

impl StageStatus {
    /// String representation for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            StageStatus::Pending => "pending",
            StageStatus::InReview => "in_review",
            StageStatus::Approved => "approved",
            StageStatus::Rejected => "rejected",
        }
    }

    /// Parse from a stored string.
    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "pending" => Ok(StageStatus::Pending),
            "in_review" => Ok(StageStatus::InReview),
            "approved" => Ok(StageStatus::Approved),
            "rejected" => Ok(StageStatus::Rejected),
            other => Err(CoreError::Validation(format!(
                "Unknown stage status: '{other}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Transition rules
// ---------------------------------------------------------------------------

/// Whether a reviewer may be (re)assigned in the given status.
///
/// Assignment never changes the status itself; it is refused once the
/// stage has reached a decision.
pub fn can_assign(status: StageStatus) -> Result<(), CoreError> {
    match status {
        StageStatus::Pending | StageStatus::InReview => Ok(()),
        other => Err(CoreError::InvalidState {
            action: "assign a reviewer",
            status: other.as_str(),
        }),
    }
}

/// `pending → in_review`.
///
/// Returns `Ok(false)` when the stage is already `in_review` — the call is
/// an idempotent no-op and the original start timestamp must be kept.
pub fn apply_start(status: StageStatus) -> Result<bool, CoreError> {
    match status {
        StageStatus::Pending => Ok(true),
        StageStatus::InReview => Ok(false),
        other => Err(CoreError::InvalidState {
            action: "start review",
            status: other.as_str(),
        }),
    }
}

/// `in_review → approved`.
pub fn apply_approve(status: StageStatus) -> Result<StageStatus, CoreError> {
    match status {
        StageStatus::InReview => Ok(StageStatus::Approved),
        other => Err(CoreError::InvalidState {
            action: "approve",
            status: other.as_str(),
        }),
    }
}

/// `in_review → rejected`.
pub fn apply_reject(status: StageStatus) -> Result<StageStatus, CoreError> {
    match status {
        StageStatus::InReview => Ok(StageStatus::Rejected),
        other => Err(CoreError::InvalidState {
            action: "reject",
            status: other.as_str(),
        }),
    }
}

/// `rejected → in_review` on client resubmission.
///
/// Progress resets to [`PROGRESS_REVIEW_BASELINE`] rather than being
/// preserved from the failed round.
pub fn apply_reopen(status: StageStatus) -> Result<StageStatus, CoreError> {
    match status {
        StageStatus::Rejected => Ok(StageStatus::InReview),
        other => Err(CoreError::InvalidState {
            action: "re-open",
            status: other.as_str(),
        }),
    }
}

/// Progress after a document upload: bumped by [`PROGRESS_UPLOAD_INCREMENT`]
/// and capped at [`PROGRESS_UPLOAD_CAP`] while the stage is not approved.
pub fn bumped_progress(current: i16) -> i16 {
    (current + PROGRESS_UPLOAD_INCREMENT).min(PROGRESS_UPLOAD_CAP)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn status_round_trip() {
        for status in [
            StageStatus::Pending,
            StageStatus::InReview,
            StageStatus::Approved,
            StageStatus::Rejected,
        ] {
            assert_eq!(StageStatus::from_str(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn unknown_status_rejected() {
        assert!(StageStatus::from_str("done").is_err());
    }

    // -- can_assign --

    #[test]
    fn assign_allowed_before_decision() {
        assert!(can_assign(StageStatus::Pending).is_ok());
        assert!(can_assign(StageStatus::InReview).is_ok());
    }

    #[test]
    fn assign_refused_after_decision() {
        assert_matches!(
            can_assign(StageStatus::Approved),
            Err(CoreError::InvalidState { .. })
        );
        assert_matches!(
            can_assign(StageStatus::Rejected),
            Err(CoreError::InvalidState { .. })
        );
    }

    // -- apply_start --

    #[test]
    fn start_from_pending_transitions() {
        assert_eq!(apply_start(StageStatus::Pending).unwrap(), true);
    }

    #[test]
    fn start_when_in_review_is_noop() {
        assert_eq!(apply_start(StageStatus::InReview).unwrap(), false);
    }

    #[test]
    fn start_from_terminal_fails() {
        assert!(apply_start(StageStatus::Approved).is_err());
        assert!(apply_start(StageStatus::Rejected).is_err());
    }

    // -- apply_approve / apply_reject --

    #[test]
    fn approve_only_from_in_review() {
        assert_eq!(
            apply_approve(StageStatus::InReview).unwrap(),
            StageStatus::Approved
        );
        for status in [
            StageStatus::Pending,
            StageStatus::Approved,
            StageStatus::Rejected,
        ] {
            assert_matches!(
                apply_approve(status),
                Err(CoreError::InvalidState { action, .. }) if action == "approve"
            );
        }
    }

    #[test]
    fn double_approve_is_invalid_state() {
        let approved = apply_approve(StageStatus::InReview).unwrap();
        assert_matches!(apply_approve(approved), Err(CoreError::InvalidState { .. }));
    }

    #[test]
    fn reject_only_from_in_review() {
        assert_eq!(
            apply_reject(StageStatus::InReview).unwrap(),
            StageStatus::Rejected
        );
        assert!(apply_reject(StageStatus::Pending).is_err());
        assert!(apply_reject(StageStatus::Approved).is_err());
    }

    // -- apply_reopen --

    #[test]
    fn reopen_only_from_rejected() {
        assert_eq!(
            apply_reopen(StageStatus::Rejected).unwrap(),
            StageStatus::InReview
        );
        assert!(apply_reopen(StageStatus::Pending).is_err());
        assert!(apply_reopen(StageStatus::InReview).is_err());
        assert!(apply_reopen(StageStatus::Approved).is_err());
    }

    // -- bumped_progress --

    #[test]
    fn progress_bump_adds_increment() {
        assert_eq!(bumped_progress(10), 10 + PROGRESS_UPLOAD_INCREMENT);
        assert_eq!(bumped_progress(0), PROGRESS_UPLOAD_INCREMENT);
    }

    #[test]
    fn progress_bump_caps_below_complete() {
        assert_eq!(bumped_progress(95), PROGRESS_UPLOAD_CAP);
        assert_eq!(bumped_progress(99), PROGRESS_UPLOAD_CAP);
    }

    #[test]
    fn progress_constants_are_sane() {
        assert!(PROGRESS_REVIEW_BASELINE < PROGRESS_UPLOAD_CAP);
        assert!(PROGRESS_UPLOAD_CAP < PROGRESS_COMPLETE);
    }
}
