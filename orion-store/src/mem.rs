use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use orion_types::{Project, ProjectKey};

use crate::{DeleteGuard, FieldUpdate, ProjectStore, ScanCursor, ScanPage, StoreError};

const DEFAULT_PAGE_SIZE: usize = 25;

/// In-memory project store.
///
/// Backs tests, the demo CLI and local serving. Keys are ordered so scans
/// page deterministically; everything behind one mutex, so each operation is
/// atomic the way a single-key store op would be.
///
/// NOTE: not durable.
pub struct InMemoryProjectStore {
    inner: Mutex<BTreeMap<(String, String), Project>>,
    page_size: usize,
}

impl InMemoryProjectStore {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// A small page size forces callers to exercise cursor-following.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            inner: Mutex::new(BTreeMap::new()),
            page_size: page_size.max(1),
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}

impl Default for InMemoryProjectStore {
    fn default() -> Self {
        Self::new()
    }
}

fn map_key(key: &ProjectKey) -> (String, String) {
    (key.project_name.clone(), key.created_at.clone())
}

#[async_trait]
impl ProjectStore for InMemoryProjectStore {
    async fn get(&self, key: &ProjectKey) -> Result<Option<Project>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.get(&map_key(key)).cloned())
    }

    async fn put(&self, project: Project) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.insert(map_key(&project.key()), project);
        Ok(())
    }

    async fn replace(&self, key: &ProjectKey, project: Project) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let slot = inner.get_mut(&map_key(key)).ok_or(StoreError::NotFound)?;
        *slot = project;
        Ok(())
    }

    async fn delete(
        &self,
        key: &ProjectKey,
        guard: Option<&DeleteGuard>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let k = map_key(key);
        let record = inner.get(&k).ok_or(StoreError::NotFound)?;
        if let Some(guard) = guard {
            let allowed = guard.requester_is_admin || record.user_id == guard.requester_id;
            if !allowed {
                return Err(StoreError::ConditionFailed);
            }
        }
        inner.remove(&k);
        Ok(())
    }

    async fn scan(&self, cursor: Option<ScanCursor>) -> Result<ScanPage, StoreError> {
        let inner = self.inner.lock().await;
        let start = cursor.map(|ScanCursor(key)| map_key(&key));
        let items: Vec<Project> = match &start {
            // Resume strictly after the cursor key.
            Some(start) => inner
                .range((
                    std::ops::Bound::Excluded(start.clone()),
                    std::ops::Bound::Unbounded,
                ))
                .take(self.page_size)
                .map(|(_, p)| p.clone())
                .collect(),
            None => inner.values().take(self.page_size).cloned().collect(),
        };
        let next_cursor = if items.len() == self.page_size {
            items.last().map(|p| ScanCursor(p.key()))
        } else {
            None
        };
        Ok(ScanPage { items, next_cursor })
    }

    async fn query_by_user(&self, user_id: &str) -> Result<Vec<Project>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn update_fields(
        &self,
        key: &ProjectKey,
        update: FieldUpdate,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let record = inner.get_mut(&map_key(key)).ok_or(StoreError::NotFound)?;
        match update {
            FieldUpdate::Events(events) => record.scheduled_with_events = events,
            FieldUpdate::Progress {
                project_data,
                remaining,
            } => {
                record.project_data = project_data;
                record.remaining = remaining;
            }
        }
        Ok(())
    }
}
