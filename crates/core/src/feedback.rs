//! Feedback entry kinds.
//!
//! Feedback is an append-only audit trail; entries are never mutated or
//! deleted through normal operation.

use crate::error::CoreError;

/// Kind of a feedback ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackKind {
    Comment,
    Suggestion,
    Issue,
    Approval,
    Rejection,
}

impl FeedbackKind {
    /// String representation for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackKind::Comment => "comment",
            FeedbackKind::Suggestion => "suggestion",
            FeedbackKind::Issue => "issue",
            FeedbackKind::Approval => "approval",
            FeedbackKind::Rejection => "rejection",
        }
    }

    /// Parse from a stored string.
    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "comment" => Ok(FeedbackKind::Comment),
            "suggestion" => Ok(FeedbackKind::Suggestion),
            "issue" => Ok(FeedbackKind::Issue),
            "approval" => Ok(FeedbackKind::Approval),
            "rejection" => Ok(FeedbackKind::Rejection),
            other => Err(CoreError::Validation(format!(
                "Unknown feedback kind: '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        for kind in [
            FeedbackKind::Comment,
            FeedbackKind::Suggestion,
            FeedbackKind::Issue,
            FeedbackKind::Approval,
            FeedbackKind::Rejection,
        ] {
            assert_eq!(FeedbackKind::from_str(kind.as_str()).unwrap(), kind);
        }
    }

    #[test]
    fn unknown_kind_rejected() {
        assert!(FeedbackKind::from_str("praise").is_err());
    }
}
