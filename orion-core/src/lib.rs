//! Project store service: CRUD over observation projects plus the
//! exposure-progress bookkeeping that survives project edits.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use orion_calendar::CalendarNotifier;
use orion_store::{DeleteGuard, FieldUpdate, ProjectStore, StoreError};
use orion_types::{Caller, Project, ProjectChanges, ProjectKey};
use rust_decimal::Decimal;

pub mod reconcile;
pub use reconcile::reconcile_progress;

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("missing required field: {0}")]
    InvalidInput(&'static str),
    #[error("project not found")]
    NotFound,
    #[error("you may only delete your own projects")]
    Forbidden,
    #[error("exposure index {index} is out of range for a project with {len} exposures")]
    OutOfRange { index: usize, len: usize },
    #[error("failed to update project in the store: {0}")]
    StoreWriteFailure(String),
    #[error("calendar service unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error(transparent)]
    Store(StoreError),
}

fn read_err(e: StoreError) -> ProjectError {
    match e {
        StoreError::NotFound => ProjectError::NotFound,
        other => ProjectError::Store(other),
    }
}

/// Result envelope of a project modification. Mirrors what callers have
/// always seen: a not-found project is a `false` envelope, not an error.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModifyOutcome {
    pub is_successful: bool,
    pub description: String,
    pub updated_project: Option<Project>,
}

impl ModifyOutcome {
    fn not_found() -> Self {
        Self {
            is_successful: false,
            description: "The requested project does not exist.".into(),
            updated_project: None,
        }
    }
}

/// Whether an event association changed anything.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventOutcome {
    Associated,
    AlreadyAssociated,
}

impl EventOutcome {
    pub fn message(self) -> &'static str {
        match self {
            EventOutcome::Associated => "Successfully associated event with project.",
            EventOutcome::AlreadyAssociated => "Event already associated with this project",
        }
    }
}

/// The project store service. Stateless per request: the store is the only
/// shared resource, injected along with the calendar notifier.
pub struct ProjectService {
    store: Arc<dyn ProjectStore>,
    calendar: Arc<dyn CalendarNotifier>,
}

impl ProjectService {
    pub fn new(store: Arc<dyn ProjectStore>, calendar: Arc<dyn CalendarNotifier>) -> Self {
        Self { store, calendar }
    }

    /// Create a project. The store overwrites silently if the same
    /// `(project_name, created_at)` key already exists; uniqueness is the
    /// caller's concern here.
    pub async fn add_project(&self, project: Project) -> Result<Project, ProjectError> {
        require("project_name", &project.project_name)?;
        require("user_id", &project.user_id)?;
        require("created_at", &project.created_at)?;

        self.store
            .put(project.clone())
            .await
            .map_err(|e| ProjectError::StoreWriteFailure(e.to_string()))?;
        Ok(project)
    }

    pub async fn get_project(&self, key: &ProjectKey) -> Result<Project, ProjectError> {
        self.store
            .get(key)
            .await
            .map_err(read_err)?
            .ok_or(ProjectError::NotFound)
    }

    /// Full-table scan, following pagination cursors until exhausted.
    pub async fn get_all_projects(&self) -> Result<Vec<Project>, ProjectError> {
        let mut all = Vec::new();
        let mut cursor = None;
        loop {
            let page = self.store.scan(cursor).await.map_err(read_err)?;
            all.extend(page.items);
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        Ok(all)
    }

    pub async fn get_user_projects(&self, user_id: &str) -> Result<Vec<Project>, ProjectError> {
        require("user_id", user_id)?;
        self.store.query_by_user(user_id).await.map_err(read_err)
    }

    /// Associate a calendar event with a project so the project can be
    /// stripped from its events when deleted. Duplicate ids are a no-op.
    pub async fn add_project_event(
        &self,
        key: &ProjectKey,
        event_id: String,
    ) -> Result<EventOutcome, ProjectError> {
        let project = self.get_project(key).await?;

        if project.scheduled_with_events.contains(&event_id) {
            return Ok(EventOutcome::AlreadyAssociated);
        }

        let mut events = project.scheduled_with_events;
        events.push(event_id);
        self.store
            .update_fields(key, FieldUpdate::Events(events))
            .await
            .map_err(|e| ProjectError::StoreWriteFailure(e.to_string()))?;
        Ok(EventOutcome::Associated)
    }

    /// Record one captured image against an exposure request: append the
    /// filename and decrement the remaining count, with no floor at zero.
    pub async fn add_project_data(
        &self,
        key: &ProjectKey,
        exposure_index: usize,
        base_filename: String,
    ) -> Result<(), ProjectError> {
        let project = self.get_project(key).await?;

        if exposure_index >= project.project_data.len() {
            return Err(ProjectError::OutOfRange {
                index: exposure_index,
                len: project.project_data.len(),
            });
        }

        let mut project_data = project.project_data;
        let mut remaining = project.remaining;
        project_data[exposure_index].push(base_filename);
        remaining[exposure_index] -= Decimal::ONE;

        self.store
            .update_fields(
                key,
                FieldUpdate::Progress {
                    project_data,
                    remaining,
                },
            )
            .await
            .map_err(|e| ProjectError::StoreWriteFailure(e.to_string()))
    }

    /// Apply a full field replacement, carrying exposure progress forward for
    /// exposures that are unchanged (see [`reconcile_progress`]).
    ///
    /// Identity fields and the owner are retained from the existing record;
    /// persistence is a single atomic swap, so no concurrent reader observes
    /// the key absent mid-update.
    pub async fn modify_project(
        &self,
        key: &ProjectKey,
        changes: ProjectChanges,
    ) -> Result<ModifyOutcome, ProjectError> {
        let existing = match self.store.get(key).await.map_err(read_err)? {
            Some(p) => p,
            None => return Ok(ModifyOutcome::not_found()),
        };

        let (project_data, remaining) = reconcile_progress(&existing, &changes.exposures);

        let updated = Project {
            project_name: existing.project_name,
            created_at: existing.created_at,
            user_id: existing.user_id,
            project_constraints: changes.project_constraints,
            project_note: changes.project_note,
            project_targets: changes.project_targets,
            project_sites: changes.project_sites,
            project_priority: changes.project_priority,
            exposures: changes.exposures,
            project_data,
            remaining,
            scheduled_with_events: changes.scheduled_with_events,
        };

        match self.store.replace(key, updated.clone()).await {
            Ok(()) => Ok(ModifyOutcome {
                is_successful: true,
                description: "Project has been updated.".into(),
                updated_project: Some(updated),
            }),
            Err(StoreError::NotFound) => Ok(ModifyOutcome::not_found()),
            Err(e) => Err(ProjectError::StoreWriteFailure(e.to_string())),
        }
    }

    /// Delete a project, stripping it from its calendar events first.
    ///
    /// Authorization is checked twice on purpose: an in-process gate decides
    /// whether to notify the calendar, and the store evaluates the same
    /// admin-or-owner condition atomically with the delete. Only the second
    /// check gates the deletion itself.
    pub async fn delete_project(
        &self,
        key: &ProjectKey,
        caller: &Caller,
    ) -> Result<Project, ProjectError> {
        let project = self.get_project(key).await?;

        let authorized = caller.is_admin() || caller.user_id == project.user_id;
        if authorized {
            if let Err(e) = self.strip_from_calendar(&project.scheduled_with_events).await {
                // Best-effort: the delete proceeds regardless.
                eprintln!("calendar cleanup failed, continuing with delete: {e}");
            }
        }

        let guard = DeleteGuard {
            requester_id: caller.user_id.clone(),
            requester_is_admin: caller.is_admin(),
        };
        match self.store.delete(key, Some(&guard)).await {
            Ok(()) => Ok(project),
            Err(StoreError::ConditionFailed) => Err(ProjectError::Forbidden),
            Err(StoreError::NotFound) => Err(ProjectError::NotFound),
            Err(e) => Err(ProjectError::Store(e)),
        }
    }

    async fn strip_from_calendar(&self, event_ids: &[String]) -> Result<(), ProjectError> {
        self.calendar
            .remove_project_from_events(event_ids)
            .await
            .map_err(|e| ProjectError::UpstreamUnavailable(e.message))
    }
}

fn require(field: &'static str, value: &str) -> Result<(), ProjectError> {
    if value.trim().is_empty() {
        return Err(ProjectError::InvalidInput(field));
    }
    Ok(())
}
