use async_trait::async_trait;
use thiserror::Error;

use orion_types::{Project, ProjectKey};
use rust_decimal::Decimal;

pub mod mem;
pub use mem::InMemoryProjectStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// No record at the given key.
    #[error("no project at the given key")]
    NotFound,
    /// A write condition was evaluated by the store and rejected.
    #[error("store condition failed")]
    ConditionFailed,
    /// Any other backend failure.
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Store-enforced deletion condition: the requester must be an admin or the
/// record's owner. Evaluated atomically with the delete, independently of any
/// in-process authorization check the caller already made.
#[derive(Clone, Debug)]
pub struct DeleteGuard {
    pub requester_id: String,
    pub requester_is_admin: bool,
}

/// Partial-field write against an existing record.
#[derive(Clone, Debug)]
pub enum FieldUpdate {
    /// Replace `scheduled_with_events`.
    Events(Vec<String>),
    /// Replace `project_data` and `remaining` together.
    Progress {
        project_data: Vec<Vec<String>>,
        remaining: Vec<Decimal>,
    },
}

/// Opaque scan position; pass back the cursor from the previous page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanCursor(pub ProjectKey);

#[derive(Debug)]
pub struct ScanPage {
    pub items: Vec<Project>,
    pub next_cursor: Option<ScanCursor>,
}

/// The external key-value store seam. Single-key operations are atomic; the
/// service layer holds no locks of its own.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Point lookup.
    async fn get(&self, key: &ProjectKey) -> Result<Option<Project>, StoreError>;

    /// Unconditional write. Silently overwrites an existing record under the
    /// same key.
    async fn put(&self, project: Project) -> Result<(), StoreError>;

    /// Atomic conditional replace: swaps in `project` only if a record
    /// already exists at `key`, failing with `NotFound` otherwise. No reader
    /// ever observes the key absent mid-replace.
    async fn replace(&self, key: &ProjectKey, project: Project) -> Result<(), StoreError>;

    /// Delete, optionally guarded. A guard that evaluates false against the
    /// stored record fails with `ConditionFailed` and leaves the record.
    async fn delete(&self, key: &ProjectKey, guard: Option<&DeleteGuard>)
        -> Result<(), StoreError>;

    /// One page of a full-table scan. Follow `next_cursor` until `None`.
    async fn scan(&self, cursor: Option<ScanCursor>) -> Result<ScanPage, StoreError>;

    /// Secondary-index lookup by owner id.
    async fn query_by_user(&self, user_id: &str) -> Result<Vec<Project>, StoreError>;

    /// Partial-field update of an existing record.
    async fn update_fields(&self, key: &ProjectKey, update: FieldUpdate)
        -> Result<(), StoreError>;
}
