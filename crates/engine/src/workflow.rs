//! The workflow engine: every reviewer/client operation in one place.
//!
//! Conventions shared by all operations:
//!
//! - Transitions are pre-checked against the pure rules in
//!   `gradus_core::stage`, then applied as a conditional `UPDATE`. A
//!   failed update means another writer won the race; the loser gets
//!   `InvalidStateError` built from the fresh row instead of silently
//!   overwriting.
//! - After every stage mutation the derived project status is recomputed
//!   and stored compare-and-set style.
//! - Notifications are raised last and their failures only logged: the
//!   workflow action must succeed even when the dispatcher cannot.

use std::sync::Arc;

use validator::Validate;

use gradus_core::aggregate::{self, ProjectStatus};
use gradus_core::area::{Area, REVIEW_SEQUENCE};
use gradus_core::feedback::FeedbackKind;
use gradus_core::integrity;
use gradus_core::notification::NotificationKind;
use gradus_core::principal::Principal;
use gradus_core::stage::{self, StageStatus, PROGRESS_UPLOAD_INCREMENT};
use gradus_core::types::DbId;
use gradus_core::CoreError;

use gradus_db::models::document::{CreateDocument, Document};
use gradus_db::models::feedback::{CreateFeedback, FeedbackEntry};
use gradus_db::models::project::{CreateProject, Project};
use gradus_db::models::stage::Stage;
use gradus_db::repositories::{DocumentRepo, FeedbackRepo, ProjectRepo, StageRepo};
use gradus_db::DbPool;

use gradus_notify::{Dispatcher, Recipient};

use crate::error::EngineError;
use crate::filestore::FileStore;

/// Bound on recompute retries when stage writers race the status store.
const RECOMPUTE_ATTEMPTS: usize = 3;

// ---------------------------------------------------------------------------
// WorkflowEngine
// ---------------------------------------------------------------------------

/// Orchestrates the approval workflow over the persistence layer, the
/// notification dispatcher and the file store.
pub struct WorkflowEngine {
    pool: DbPool,
    dispatcher: Arc<Dispatcher>,
    files: Arc<dyn FileStore>,
}

impl WorkflowEngine {
    pub fn new(pool: DbPool, dispatcher: Arc<Dispatcher>, files: Arc<dyn FileStore>) -> Self {
        Self {
            pool,
            dispatcher,
            files,
        }
    }

    // -- project lifecycle ---------------------------------------------------

    /// Create a project in `draft` for the acting user.
    pub async fn create_project(
        &self,
        principal: &Principal,
        mut input: CreateProject,
    ) -> Result<Project, EngineError> {
        input.owner_id = principal.user_id;
        input.validate()?;
        if let Some(priority) = &input.priority {
            aggregate::Priority::from_str(priority)?;
        }
        let project = ProjectRepo::create(&self.pool, &input).await?;
        tracing::info!(project_id = project.id, code = %project.code, "Project created");
        Ok(project)
    }

    /// Formally submit a project: one `pending` stage per configured area
    /// is created and the submission is announced.
    pub async fn submit(
        &self,
        principal: &Principal,
        project_id: DbId,
        recipients: &[Recipient],
    ) -> Result<Project, EngineError> {
        let project = self.require_project(project_id).await?;
        self.authorize_owner(principal, &project)?;

        if project.submitted_at.is_some() {
            let status = ProjectStatus::from_str(&project.status)?;
            return Err(CoreError::InvalidState {
                action: "submit",
                status: status.as_str(),
            }
            .into());
        }

        let areas: Vec<&str> = REVIEW_SEQUENCE.iter().map(|a| a.as_str()).collect();
        StageRepo::create_for_submission(&self.pool, project_id, &areas).await?;
        ProjectRepo::mark_submitted(&self.pool, project_id).await?;
        let project = self.recompute_status(project_id).await?;

        self.notify(
            NotificationKind::ProjectSubmitted,
            Some(project_id),
            recipients,
            &serde_json::json!({
                "project_code": project.code,
                "project_title": project.title,
                "next_area": REVIEW_SEQUENCE[0].as_str(),
            }),
        )
        .await;

        tracing::info!(project_id, "Project submitted for review");
        Ok(project)
    }

    /// Administratively delete a project; stages, feedback, documents and
    /// notifications cascade.
    pub async fn delete_project(
        &self,
        principal: &Principal,
        project_id: DbId,
    ) -> Result<(), EngineError> {
        principal.authorize_admin()?;
        if !ProjectRepo::delete(&self.pool, project_id).await? {
            return Err(CoreError::NotFound {
                entity: "project",
                id: project_id,
            }
            .into());
        }
        tracing::info!(project_id, "Project deleted");
        Ok(())
    }

    // -- stage operations ----------------------------------------------------

    /// Assign a reviewer to a stage. Allowed while the stage is `pending`
    /// or `in_review`; the stage status itself is unchanged.
    pub async fn assign_reviewer(
        &self,
        principal: &Principal,
        project_id: DbId,
        area: Area,
        reviewer_id: DbId,
        recipients: &[Recipient],
    ) -> Result<Stage, EngineError> {
        principal.authorize_review(area)?;
        let stage = self.require_stage(project_id, area).await?;
        stage::can_assign(StageStatus::from_str(&stage.status)?)?;

        if !StageRepo::assign_reviewer(&self.pool, project_id, area.as_str(), reviewer_id).await? {
            return Err(self.stale_stage_error(project_id, area, "assign a reviewer").await?);
        }

        let project = self.require_project(project_id).await?;
        self.notify(
            NotificationKind::ProjectAssigned,
            Some(project_id),
            recipients,
            &serde_json::json!({
                "project_code": project.code,
                "project_title": project.title,
                "area": area.as_str(),
            }),
        )
        .await;

        Ok(self.require_stage(project_id, area).await?)
    }

    /// Move a stage from `pending` to `in_review`. Calling again while
    /// already `in_review` is an idempotent no-op that keeps the original
    /// start timestamp.
    pub async fn start_review(
        &self,
        principal: &Principal,
        project_id: DbId,
        area: Area,
    ) -> Result<Stage, EngineError> {
        principal.authorize_review(area)?;
        self.require_stage(project_id, area).await?;

        if !StageRepo::start_review(&self.pool, project_id, area.as_str()).await? {
            let current = self.require_stage(project_id, area).await?;
            match StageStatus::from_str(&current.status)? {
                StageStatus::InReview => return Ok(current),
                other => {
                    return Err(CoreError::InvalidState {
                        action: "start review",
                        status: other.as_str(),
                    }
                    .into())
                }
            }
        }

        self.recompute_status(project_id).await?;
        Ok(self.require_stage(project_id, area).await?)
    }

    /// Approve a stage (`in_review → approved`). When this was the last
    /// open area, the project reaches aggregate `approved` and the
    /// approval is announced.
    pub async fn approve(
        &self,
        principal: &Principal,
        project_id: DbId,
        area: Area,
        recipients: &[Recipient],
    ) -> Result<Project, EngineError> {
        principal.authorize_review(area)?;
        let stage = self.require_stage(project_id, area).await?;
        stage::apply_approve(StageStatus::from_str(&stage.status)?)?;

        if !StageRepo::approve(&self.pool, project_id, area.as_str()).await? {
            return Err(self.stale_stage_error(project_id, area, "approve").await?);
        }

        let project = self.recompute_status(project_id).await?;
        tracing::info!(
            project_id,
            area = area.as_str(),
            next_area = area.next().map_or("none", |a| a.as_str()),
            "Stage approved"
        );

        if ProjectStatus::from_str(&project.status)? == ProjectStatus::Approved {
            self.notify(
                NotificationKind::ProjectApproved,
                Some(project_id),
                recipients,
                &serde_json::json!({
                    "project_code": project.code,
                    "project_title": project.title,
                }),
            )
            .await;
        }

        Ok(project)
    }

    /// Reject a stage (`in_review → rejected`), recording the reason as
    /// exactly one `rejection` feedback entry.
    pub async fn reject(
        &self,
        principal: &Principal,
        project_id: DbId,
        area: Area,
        reason: &str,
        recipients: &[Recipient],
    ) -> Result<Project, EngineError> {
        principal.authorize_review(area)?;
        let stage = self.require_stage(project_id, area).await?;
        stage::apply_reject(StageStatus::from_str(&stage.status)?)?;

        let rejection = CreateFeedback {
            project_id,
            area: Some(area.as_str().to_string()),
            author_id: principal.user_id,
            kind: FeedbackKind::Rejection.as_str().to_string(),
            message: reason.to_string(),
        };
        if !StageRepo::reject(&self.pool, project_id, area.as_str(), &rejection).await? {
            return Err(self.stale_stage_error(project_id, area, "reject").await?);
        }

        let project = self.recompute_status(project_id).await?;
        tracing::info!(project_id, area = area.as_str(), "Stage rejected");

        self.notify(
            NotificationKind::ProjectRejected,
            Some(project_id),
            recipients,
            &serde_json::json!({
                "project_code": project.code,
                "project_title": project.title,
                "area": area.as_str(),
                "reason": reason,
            }),
        )
        .await;

        Ok(project)
    }

    /// Re-open a rejected stage after the client resubmits. Progress
    /// resets to the in-review baseline.
    pub async fn reopen(
        &self,
        principal: &Principal,
        project_id: DbId,
        area: Area,
    ) -> Result<Stage, EngineError> {
        let project = self.require_project(project_id).await?;
        self.authorize_owner(principal, &project)?;
        let stage = self.require_stage(project_id, area).await?;
        stage::apply_reopen(StageStatus::from_str(&stage.status)?)?;

        if !StageRepo::reopen(&self.pool, project_id, area.as_str()).await? {
            return Err(self.stale_stage_error(project_id, area, "re-open").await?);
        }

        self.recompute_status(project_id).await?;
        tracing::info!(project_id, area = area.as_str(), "Stage re-opened");
        Ok(self.require_stage(project_id, area).await?)
    }

    // -- documents -----------------------------------------------------------

    /// Store an uploaded document. The checksum captured at store time
    /// becomes the stored truth the attach step verifies against.
    pub async fn upload_document(
        &self,
        project_id: DbId,
        area: Area,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<Document, EngineError> {
        self.require_project(project_id).await?;
        let stored = self.files.store(bytes).await?;
        let document = DocumentRepo::create(
            &self.pool,
            &CreateDocument {
                project_id,
                area: area.as_str().to_string(),
                storage_path: stored.path,
                original_name: original_name.to_string(),
                checksum: stored.checksum,
            },
        )
        .await?;
        Ok(document)
    }

    /// Verify a document's checksum and attach it to its stage, bumping
    /// the stage progress. Any mismatch is a security-relevant event and
    /// the document stays unattached.
    pub async fn attach_document(
        &self,
        document_id: DbId,
        recipients: &[Recipient],
    ) -> Result<Document, EngineError> {
        let document = DocumentRepo::find_by_id(&self.pool, document_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "document",
                id: document_id,
            })?;

        let bytes = self.files.read(&document.storage_path).await?;
        if !integrity::verify(&document.checksum, &bytes) {
            tracing::warn!(
                document_id,
                project_id = document.project_id,
                storage_path = %document.storage_path,
                "SECURITY: document checksum mismatch, attach refused"
            );
            return Err(CoreError::IntegrityViolation(format!(
                "checksum mismatch for document '{}'",
                document.original_name
            ))
            .into());
        }

        let area = Area::from_str(&document.area)?;
        let stage = self.require_stage(document.project_id, area).await?;

        if !DocumentRepo::attach_to_stage(&self.pool, document_id, stage.id).await? {
            return Err(CoreError::Validation(format!(
                "document {document_id} is already attached"
            ))
            .into());
        }
        StageRepo::bump_progress(
            &self.pool,
            document.project_id,
            area.as_str(),
            PROGRESS_UPLOAD_INCREMENT,
        )
        .await?;

        let project = self.require_project(document.project_id).await?;
        self.notify(
            NotificationKind::DocumentUploaded,
            Some(project.id),
            recipients,
            &serde_json::json!({
                "project_code": project.code,
                "area": area.as_str(),
                "document_name": document.original_name,
            }),
        )
        .await;

        Ok(DocumentRepo::find_by_id(&self.pool, document_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "document",
                id: document_id,
            })?)
    }

    // -- feedback ------------------------------------------------------------

    /// Append a feedback entry and announce it. Fails only when the
    /// project does not exist or the input is malformed.
    pub async fn add_feedback(
        &self,
        principal: &Principal,
        input: CreateFeedback,
        recipients: &[Recipient],
    ) -> Result<FeedbackEntry, EngineError> {
        input.validate()?;
        FeedbackKind::from_str(&input.kind)?;
        if let Some(area) = &input.area {
            Area::from_str(area)?;
        }
        let project = self.require_project(input.project_id).await?;

        let entry = FeedbackRepo::append(
            &self.pool,
            &CreateFeedback {
                author_id: principal.user_id,
                ..input
            },
        )
        .await?;

        self.notify(
            NotificationKind::FeedbackAdded,
            Some(project.id),
            recipients,
            &serde_json::json!({
                "project_code": project.code,
                "kind": entry.kind,
                "message": entry.message,
            }),
        )
        .await;

        Ok(entry)
    }

    /// All feedback for a project in append order.
    pub async fn list_feedback(&self, project_id: DbId) -> Result<Vec<FeedbackEntry>, EngineError> {
        self.require_project(project_id).await?;
        Ok(FeedbackRepo::list_by_project(&self.pool, project_id).await?)
    }

    // -- status --------------------------------------------------------------

    /// Direct status write: accepted only when it matches the derived
    /// value, otherwise `InconsistentStateError`. Stage mutation is the
    /// sole way to actually move the status.
    pub async fn change_status(
        &self,
        project_id: DbId,
        requested: ProjectStatus,
    ) -> Result<Project, EngineError> {
        let project = self.recompute_status(project_id).await?;
        let derived = ProjectStatus::from_str(&project.status)?;
        aggregate::check_direct_write(requested, derived)?;
        Ok(project)
    }

    /// Administrative override: set the status unconditionally, logged as
    /// a `comment` feedback entry.
    pub async fn force_status(
        &self,
        principal: &Principal,
        project_id: DbId,
        status: ProjectStatus,
        note: &str,
    ) -> Result<Project, EngineError> {
        principal.authorize_admin()?;
        self.require_project(project_id).await?;

        let audit = CreateFeedback {
            project_id,
            area: None,
            author_id: principal.user_id,
            kind: FeedbackKind::Comment.as_str().to_string(),
            message: format!("Administrative status override to '{}': {note}", status.as_str()),
        };
        ProjectRepo::force_status(&self.pool, project_id, status.as_str(), &audit).await?;

        tracing::warn!(project_id, status = status.as_str(), "Status forced by administrator");
        self.require_project(project_id).await
    }

    /// Overall progress: mean of the stage progress values, rounded down.
    pub async fn overall_progress(&self, project_id: DbId) -> Result<i16, EngineError> {
        let stages = StageRepo::list_for_project(&self.pool, project_id).await?;
        let progress: Vec<i16> = stages.iter().map(|s| s.progress).collect();
        Ok(aggregate::overall_progress(&progress))
    }

    // -- internals -----------------------------------------------------------

    /// Recompute the derived status from the stage set and store it.
    /// Compare-and-set with a bounded re-derive loop: losing the store
    /// race means another stage writer finished first, so the fresh rows
    /// are read and the derivation retried.
    async fn recompute_status(&self, project_id: DbId) -> Result<Project, EngineError> {
        for _ in 0..RECOMPUTE_ATTEMPTS {
            let project = self.require_project(project_id).await?;
            let stages = StageRepo::list_for_project(&self.pool, project_id).await?;
            let statuses = stages
                .iter()
                .map(|s| StageStatus::from_str(&s.status))
                .collect::<Result<Vec<_>, _>>()?;

            let derived = aggregate::derive_status(&statuses, project.submitted_at.is_some());
            if derived.as_str() == project.status {
                return Ok(project);
            }
            if ProjectRepo::store_derived_status(
                &self.pool,
                project_id,
                &project.status,
                derived.as_str(),
            )
            .await?
            {
                return self.require_project(project_id).await;
            }
        }
        Err(CoreError::InconsistentState(format!(
            "derived status for project {project_id} did not settle"
        ))
        .into())
    }

    /// Build the race-loser error from the stage's fresh status.
    async fn stale_stage_error(
        &self,
        project_id: DbId,
        area: Area,
        action: &'static str,
    ) -> Result<EngineError, EngineError> {
        let current = self.require_stage(project_id, area).await?;
        let status = StageStatus::from_str(&current.status)?;
        Ok(CoreError::InvalidState {
            action,
            status: status.as_str(),
        }
        .into())
    }

    async fn require_project(&self, project_id: DbId) -> Result<Project, EngineError> {
        ProjectRepo::find_by_id(&self.pool, project_id)
            .await?
            .ok_or_else(|| {
                CoreError::NotFound {
                    entity: "project",
                    id: project_id,
                }
                .into()
            })
    }

    async fn require_stage(&self, project_id: DbId, area: Area) -> Result<Stage, EngineError> {
        StageRepo::find(&self.pool, project_id, area.as_str())
            .await?
            .ok_or_else(|| {
                CoreError::NotFound {
                    entity: "stage",
                    id: project_id,
                }
                .into()
            })
    }

    fn authorize_owner(&self, principal: &Principal, project: &Project) -> Result<(), CoreError> {
        if principal.is_admin() || principal.user_id == project.owner_id {
            Ok(())
        } else {
            Err(CoreError::Forbidden(format!(
                "user {} does not own project {}",
                principal.user_id, project.id
            )))
        }
    }

    /// Raise a notification without letting dispatch problems affect the
    /// workflow action that triggered them.
    async fn notify(
        &self,
        kind: NotificationKind,
        project_id: Option<DbId>,
        recipients: &[Recipient],
        vars: &serde_json::Value,
    ) {
        if recipients.is_empty() {
            return;
        }
        if let Err(e) = self
            .dispatcher
            .raise(kind, project_id, recipients, vars)
            .await
        {
            tracing::error!(kind = kind.as_str(), error = %e, "Failed to record notification");
        }
    }
}
