//! End-to-end workflow scenarios against a real database.
//!
//! Drives the engine the way the portal would: a client drafts and
//! submits, reviewers work their areas, documents get verified, and the
//! derived project status is checked at every step.

use std::sync::{Arc, Mutex};

use assert_matches::assert_matches;
use async_trait::async_trait;
use sqlx::PgPool;

use gradus_core::area::{Area, REVIEW_SEQUENCE};
use gradus_core::principal::Principal;
use gradus_core::CoreError;
use gradus_db::models::feedback::CreateFeedback;
use gradus_db::models::project::{CreateProject, Project};
use gradus_db::repositories::StageRepo;
use gradus_engine::{EngineError, LocalFileStore, WorkflowEngine};
use gradus_notify::{Dispatcher, MailTransport, OutboundEmail, Recipient, TransportError};

// ---------------------------------------------------------------------------
// Transport doubles
// ---------------------------------------------------------------------------

#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<OutboundEmail>>,
}

#[async_trait]
impl MailTransport for RecordingMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

struct FailingMailer;

#[async_trait]
impl MailTransport for FailingMailer {
    async fn send(&self, _email: &OutboundEmail) -> Result<(), TransportError> {
        Err(TransportError::Build("server unavailable".to_string()))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn build_engine(
    pool: PgPool,
    transport: Arc<dyn MailTransport>,
) -> (WorkflowEngine, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = Arc::new(Dispatcher::new(pool.clone(), transport));
    let files = Arc::new(LocalFileStore::new(dir.path()));
    (WorkflowEngine::new(pool, dispatcher, files), dir)
}

fn owner() -> Principal {
    Principal::client(1)
}

fn reviewer_for(area: Area) -> Principal {
    Principal::reviewer(10, vec![area])
}

fn recipients() -> Vec<Recipient> {
    vec![Recipient::user("owner@example.edu")]
}

async fn submitted_project(engine: &WorkflowEngine, code: &str) -> Project {
    let project = engine
        .create_project(
            &owner(),
            CreateProject {
                code: code.to_string(),
                title: format!("Project {code}"),
                description: None,
                owner_id: 0,
                priority: None,
                estimated_completion: None,
            },
        )
        .await
        .unwrap();
    engine
        .submit(&owner(), project.id, &recipients())
        .await
        .unwrap()
}

// ---------------------------------------------------------------------------
// Scenario: clean run through every area ends in aggregate approval
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn full_review_cycle_ends_approved(pool: PgPool) {
    let mailer = Arc::new(RecordingMailer::default());
    let (engine, _dir) = build_engine(pool, Arc::clone(&mailer) as _);

    let project = submitted_project(&engine, "E2E-1").await;
    // All stages pending: nothing is under review yet.
    assert_eq!(project.status, "draft");

    let mut latest = None;
    for area in REVIEW_SEQUENCE {
        let reviewer = reviewer_for(*area);
        engine
            .start_review(&reviewer, project.id, *area)
            .await
            .unwrap();
        latest = Some(
            engine
                .approve(&reviewer, project.id, *area, &recipients())
                .await
                .unwrap(),
        );
    }

    assert_eq!(latest.unwrap().status, "approved");
    assert_eq!(engine.overall_progress(project.id).await.unwrap(), 100);

    // One submission mail plus one final approval mail.
    assert_eq!(mailer.sent.lock().unwrap().len(), 2);
}

#[sqlx::test(migrations = "../../migrations")]
async fn partial_approval_is_not_approved(pool: PgPool) {
    let (engine, _dir) = build_engine(pool, Arc::new(RecordingMailer::default()));
    let project = submitted_project(&engine, "E2E-2").await;

    let area = REVIEW_SEQUENCE[0];
    let reviewer = reviewer_for(area);
    engine.start_review(&reviewer, project.id, area).await.unwrap();
    let latest = engine
        .approve(&reviewer, project.id, area, &recipients())
        .await
        .unwrap();

    assert_eq!(latest.status, "draft", "remaining areas are still pending");
}

// ---------------------------------------------------------------------------
// Scenario: rejection wins the aggregate and writes one ledger entry
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn rejection_records_exactly_one_feedback_entry(pool: PgPool) {
    let (engine, _dir) = build_engine(pool.clone(), Arc::new(RecordingMailer::default()));
    let project = submitted_project(&engine, "E2E-3").await;

    let area = Area::Security;
    let reviewer = reviewer_for(area);
    engine.start_review(&reviewer, project.id, area).await.unwrap();

    // Another area is mid-review; rejection must still win.
    let other = reviewer_for(Area::Quality);
    engine
        .start_review(&other, project.id, Area::Quality)
        .await
        .unwrap();

    let latest = engine
        .reject(&reviewer, project.id, area, "Threat model missing", &recipients())
        .await
        .unwrap();
    assert_eq!(latest.status, "rejected");

    let feedback = engine.list_feedback(project.id).await.unwrap();
    let rejections: Vec<_> = feedback.iter().filter(|f| f.kind == "rejection").collect();
    assert_eq!(rejections.len(), 1);
    assert_eq!(rejections[0].message, "Threat model missing");
    assert_eq!(rejections[0].area.as_deref(), Some(area.as_str()));
    assert_eq!(rejections[0].author_id, reviewer.user_id);
}

#[sqlx::test(migrations = "../../migrations")]
async fn reopen_after_rejection_restarts_the_round(pool: PgPool) {
    let (engine, _dir) = build_engine(pool.clone(), Arc::new(RecordingMailer::default()));
    let project = submitted_project(&engine, "E2E-4").await;

    let area = Area::Infrastructure;
    let reviewer = reviewer_for(area);
    engine.start_review(&reviewer, project.id, area).await.unwrap();
    engine
        .reject(&reviewer, project.id, area, "Capacity plan outdated", &recipients())
        .await
        .unwrap();

    let stage = engine.reopen(&owner(), project.id, area).await.unwrap();
    assert_eq!(stage.status, "in_review");
    assert_eq!(stage.progress, 10);
    assert!(stage.completed_at.is_none());

    let latest = engine.change_status(project.id, gradus_core::aggregate::ProjectStatus::UnderReview)
        .await
        .unwrap();
    assert_eq!(latest.status, "under_review");

    // Only the owner (or an admin) may re-open.
    let result = engine.reopen(&reviewer, project.id, area).await;
    assert_matches!(result, Err(EngineError::Core(CoreError::Forbidden(_))));
}

// ---------------------------------------------------------------------------
// Scenario: two reviewers race the same decision
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn concurrent_approves_have_one_winner(pool: PgPool) {
    let (engine, _dir) = build_engine(pool, Arc::new(RecordingMailer::default()));
    let project = submitted_project(&engine, "E2E-5").await;

    let area = REVIEW_SEQUENCE[0];
    let reviewer = reviewer_for(area);
    engine.start_review(&reviewer, project.id, area).await.unwrap();

    let (a, b) = tokio::join!(
        engine.approve(&reviewer, project.id, area, &[]),
        engine.approve(&reviewer, project.id, area, &[]),
    );

    let ok_count = [a.is_ok(), b.is_ok()].iter().filter(|x| **x).count();
    assert_eq!(ok_count, 1, "exactly one approve may win");
    for result in [a, b] {
        if let Err(e) = result {
            assert_matches!(e, EngineError::Core(CoreError::InvalidState { .. }));
        }
    }
}

#[sqlx::test(migrations = "../../migrations")]
async fn approve_before_review_starts_is_invalid_state(pool: PgPool) {
    let (engine, _dir) = build_engine(pool, Arc::new(RecordingMailer::default()));
    let project = submitted_project(&engine, "E2E-6").await;

    let area = REVIEW_SEQUENCE[0];
    let result = engine
        .approve(&reviewer_for(area), project.id, area, &[])
        .await;
    assert_matches!(
        result,
        Err(EngineError::Core(CoreError::InvalidState {
            status: "pending",
            ..
        }))
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn start_review_is_idempotent(pool: PgPool) {
    let (engine, _dir) = build_engine(pool, Arc::new(RecordingMailer::default()));
    let project = submitted_project(&engine, "E2E-7").await;

    let area = REVIEW_SEQUENCE[0];
    let reviewer = reviewer_for(area);
    let first = engine.start_review(&reviewer, project.id, area).await.unwrap();
    let second = engine.start_review(&reviewer, project.id, area).await.unwrap();

    assert_eq!(first.started_at, second.started_at);
    assert_eq!(second.status, "in_review");
}

// ---------------------------------------------------------------------------
// Scenario: authorization boundaries
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn clients_and_foreign_reviewers_are_refused(pool: PgPool) {
    let (engine, _dir) = build_engine(pool, Arc::new(RecordingMailer::default()));
    let project = submitted_project(&engine, "E2E-8").await;

    let result = engine
        .start_review(&owner(), project.id, Area::Architecture)
        .await;
    assert_matches!(result, Err(EngineError::Core(CoreError::Forbidden(_))));

    // A reviewer scoped to one area may not decide another.
    let result = engine
        .start_review(&reviewer_for(Area::Quality), project.id, Area::Security)
        .await;
    assert_matches!(result, Err(EngineError::Core(CoreError::Forbidden(_))));

    let result = engine
        .force_status(
            &owner(),
            project.id,
            gradus_core::aggregate::ProjectStatus::Approved,
            "nope",
        )
        .await;
    assert_matches!(result, Err(EngineError::Core(CoreError::Forbidden(_))));
}

// ---------------------------------------------------------------------------
// Scenario: document verification gates stage attachment
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn verified_document_attaches_and_bumps_progress(pool: PgPool) {
    let (engine, _dir) = build_engine(pool.clone(), Arc::new(RecordingMailer::default()));
    let project = submitted_project(&engine, "E2E-9").await;
    let area = Area::Architecture;

    let document = engine
        .upload_document(project.id, area, "blueprint.pdf", b"%PDF-1.7 blueprint")
        .await
        .unwrap();
    assert!(document.stage_id.is_none());

    let attached = engine.attach_document(document.id, &recipients()).await.unwrap();
    assert!(attached.stage_id.is_some());

    let stage = StageRepo::find(&pool, project.id, area.as_str())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stage.progress, 15);
}

#[sqlx::test(migrations = "../../migrations")]
async fn tampered_document_is_refused(pool: PgPool) {
    let (engine, dir) = build_engine(pool.clone(), Arc::new(RecordingMailer::default()));
    let project = submitted_project(&engine, "E2E-10").await;

    let document = engine
        .upload_document(project.id, Area::Quality, "report.pdf", b"original report")
        .await
        .unwrap();

    // Flip the stored bytes behind the engine's back.
    std::fs::write(dir.path().join(&document.storage_path), b"doctored report").unwrap();

    let result = engine.attach_document(document.id, &recipients()).await;
    assert_matches!(
        result,
        Err(EngineError::Core(CoreError::IntegrityViolation(_)))
    );

    // The document must stay unattached and the stage untouched.
    let current = gradus_db::repositories::DocumentRepo::find_by_id(&pool, document.id)
        .await
        .unwrap()
        .unwrap();
    assert!(current.stage_id.is_none());
    let stage = StageRepo::find(&pool, project.id, Area::Quality.as_str())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stage.progress, 0);
}

// ---------------------------------------------------------------------------
// Scenario: status writes outside the engine are guarded
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn conflicting_direct_status_write_is_inconsistent(pool: PgPool) {
    let (engine, _dir) = build_engine(pool, Arc::new(RecordingMailer::default()));
    let project = submitted_project(&engine, "E2E-11").await;

    let result = engine
        .change_status(project.id, gradus_core::aggregate::ProjectStatus::Approved)
        .await;
    assert_matches!(
        result,
        Err(EngineError::Core(CoreError::InconsistentState(_)))
    );

    // Writing the derived value is a no-op success.
    let latest = engine
        .change_status(project.id, gradus_core::aggregate::ProjectStatus::Draft)
        .await
        .unwrap();
    assert_eq!(latest.status, "draft");
}

#[sqlx::test(migrations = "../../migrations")]
async fn admin_override_is_logged_in_the_ledger(pool: PgPool) {
    let (engine, _dir) = build_engine(pool, Arc::new(RecordingMailer::default()));
    let project = submitted_project(&engine, "E2E-12").await;

    let admin = Principal::admin(99);
    let latest = engine
        .force_status(
            &admin,
            project.id,
            gradus_core::aggregate::ProjectStatus::Approved,
            "Rector's office decision 41/2026",
        )
        .await
        .unwrap();
    assert_eq!(latest.status, "approved");

    let feedback = engine.list_feedback(project.id).await.unwrap();
    let overrides: Vec<_> = feedback.iter().filter(|f| f.kind == "comment").collect();
    assert_eq!(overrides.len(), 1);
    assert!(overrides[0].message.contains("Rector's office decision 41/2026"));
    assert_eq!(overrides[0].author_id, admin.user_id);
}

// ---------------------------------------------------------------------------
// Scenario: notification failures never block the workflow
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn delivery_failure_does_not_block_submission(pool: PgPool) {
    let (engine, _dir) = build_engine(pool.clone(), Arc::new(FailingMailer));

    let project = submitted_project(&engine, "E2E-13").await;
    assert!(project.submitted_at.is_some());

    // The failure landed on the record, queued for retry.
    let failed: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE status = 'failed'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(failed, 1);
}

// ---------------------------------------------------------------------------
// Scenario: feedback preconditions
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn feedback_requires_an_existing_project(pool: PgPool) {
    let (engine, _dir) = build_engine(pool, Arc::new(RecordingMailer::default()));

    let result = engine
        .add_feedback(
            &owner(),
            CreateFeedback {
                project_id: 424242,
                area: None,
                author_id: 0,
                kind: "suggestion".to_string(),
                message: "Consider splitting the appendix upload.".to_string(),
            },
            &[],
        )
        .await;
    assert_matches!(
        result,
        Err(EngineError::Core(CoreError::NotFound {
            entity: "project",
            ..
        }))
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn repeat_submission_is_invalid_state(pool: PgPool) {
    let (engine, _dir) = build_engine(pool, Arc::new(RecordingMailer::default()));
    let project = submitted_project(&engine, "E2E-14").await;

    let result = engine.submit(&owner(), project.id, &recipients()).await;
    assert_matches!(
        result,
        Err(EngineError::Core(CoreError::InvalidState {
            action: "submit",
            ..
        }))
    );
}
