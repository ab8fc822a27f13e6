//! Subject/body rendering per notification kind.
//!
//! Templates take free-form JSON vars; missing vars render as empty
//! strings rather than failing, so a malformed caller still produces a
//! deliverable (if terse) message.

use gradus_core::notification::NotificationKind;

/// Subject prefix for every portal email.
const SUBJECT_PREFIX: &str = "[Gradus]";

/// Fetch a string var, defaulting to empty.
fn var<'a>(vars: &'a serde_json::Value, key: &str) -> &'a str {
    vars.get(key).and_then(|v| v.as_str()).unwrap_or("")
}

/// Render (subject, body) for a notification kind.
pub fn render(kind: NotificationKind, vars: &serde_json::Value) -> (String, String) {
    let code = var(vars, "project_code");
    let title = var(vars, "project_title");

    match kind {
        NotificationKind::ProjectSubmitted => (
            format!("{SUBJECT_PREFIX} Project {code} submitted for review"),
            format!(
                "Project \"{title}\" ({code}) has been submitted and is awaiting \
                 review by each area.\nFirst area in sequence: {}.",
                var(vars, "next_area")
            ),
        ),
        NotificationKind::ProjectApproved => (
            format!("{SUBJECT_PREFIX} Project {code} fully approved"),
            format!("Project \"{title}\" ({code}) has been approved by every review area."),
        ),
        NotificationKind::ProjectRejected => (
            format!("{SUBJECT_PREFIX} Project {code} rejected"),
            format!(
                "Project \"{title}\" ({code}) was rejected by the {} area.\nReason: {}",
                var(vars, "area"),
                var(vars, "reason")
            ),
        ),
        NotificationKind::DocumentUploaded => (
            format!("{SUBJECT_PREFIX} New document on project {code}"),
            format!(
                "Document \"{}\" was uploaded for the {} area of project {code}.",
                var(vars, "document_name"),
                var(vars, "area")
            ),
        ),
        NotificationKind::FeedbackAdded => (
            format!("{SUBJECT_PREFIX} New feedback on project {code}"),
            format!(
                "New {} feedback on project {code}:\n{}",
                var(vars, "kind"),
                var(vars, "message")
            ),
        ),
        NotificationKind::ProjectAssigned => (
            format!("{SUBJECT_PREFIX} Review assignment for project {code}"),
            format!(
                "You have been assigned to review the {} area of project \"{title}\" ({code}).",
                var(vars, "area")
            ),
        ),
        NotificationKind::ReminderPendingReview => (
            format!("{SUBJECT_PREFIX} Review of project {code} is waiting"),
            format!(
                "The {} review of project {code} has seen no activity for {} days.",
                var(vars, "area"),
                var(vars, "days_stalled")
            ),
        ),
        NotificationKind::ProjectDeadlineWarning => (
            format!("{SUBJECT_PREFIX} Project {code} nears its completion date"),
            format!(
                "Project \"{title}\" ({code}) has an estimated completion date of {} \
                 and its review is still open.",
                var(vars, "estimated_completion")
            ),
        ),
        NotificationKind::WeeklySummary => (
            format!("{SUBJECT_PREFIX} Weekly review summary"),
            format!("Weekly summary:\n{}", var(vars, "summary")),
        ),
        NotificationKind::BulkActionCompleted => (
            format!("{SUBJECT_PREFIX} Bulk action completed"),
            format!(
                "Bulk action \"{}\" completed: {}.",
                var(vars, "action"),
                var(vars, "outcome")
            ),
        ),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use gradus_core::notification::ALL_KINDS;
    use serde_json::json;

    #[test]
    fn every_kind_renders_nonempty() {
        let vars = json!({
            "project_code": "PRJ-7",
            "project_title": "Data Platform",
            "area": "security",
            "reason": "missing diagram",
        });
        for kind in ALL_KINDS {
            let (subject, body) = render(*kind, &vars);
            assert!(subject.starts_with(SUBJECT_PREFIX), "{kind:?}");
            assert!(!body.is_empty(), "{kind:?}");
        }
    }

    #[test]
    fn rejection_includes_area_and_reason() {
        let vars = json!({
            "project_code": "PRJ-9",
            "project_title": "Portal",
            "area": "security",
            "reason": "missing diagram",
        });
        let (subject, body) = render(NotificationKind::ProjectRejected, &vars);
        assert!(subject.contains("PRJ-9"));
        assert!(body.contains("security"));
        assert!(body.contains("missing diagram"));
    }

    #[test]
    fn missing_vars_render_empty_not_panic() {
        let (subject, body) = render(NotificationKind::ProjectAssigned, &json!({}));
        assert!(subject.contains("Review assignment"));
        assert!(!body.is_empty());
    }

    #[test]
    fn reminder_carries_stall_duration() {
        let vars = json!({
            "project_code": "PRJ-1",
            "area": "quality",
            "days_stalled": "4",
        });
        let (_, body) = render(NotificationKind::ReminderPendingReview, &vars);
        assert!(body.contains("4 days"));
    }
}
