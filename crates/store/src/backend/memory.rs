//! In-memory backend.
//!
//! Keeps current and history rows in `BTreeMap`s behind a
//! `parking_lot::RwLock`. Always compiled; used by tests and as a
//! development default. Satisfies the same conditional-write contract as
//! the durable backends because every mutation holds the write lock.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::error::{ResourceError, StoreResult};
use crate::kind::ResourceKind;
use crate::types::{OwnerRef, Resource};

use super::IndexBackend;

type Identity = (ResourceKind, String);

#[derive(Default)]
struct MemoryState {
    current: BTreeMap<Identity, Resource>,
    history: BTreeMap<(ResourceKind, String, u64), Resource>,
}

/// An in-memory [`IndexBackend`].
///
/// # Examples
///
/// ```
/// use chartstore::{MemoryBackend, ResourceStore, StoreConfig};
///
/// let store = ResourceStore::new(MemoryBackend::new(), StoreConfig::default());
/// ```
#[derive(Default)]
pub struct MemoryBackend {
    state: RwLock<MemoryState>,
}

impl MemoryBackend {
    /// Creates an empty in-memory backend.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IndexBackend for MemoryBackend {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn get_current(&self, kind: ResourceKind, id: &str) -> StoreResult<Option<Resource>> {
        let state = self.state.read();
        Ok(state.current.get(&(kind, id.to_string())).cloned())
    }

    async fn insert_current(&self, resource: &Resource) -> StoreResult<()> {
        let mut state = self.state.write();
        let identity = (resource.kind(), resource.id().to_string());
        if state.current.contains_key(&identity) {
            return Err(ResourceError::AlreadyExists {
                kind: resource.kind(),
                id: resource.id().to_string(),
            }
            .into());
        }
        state.current.insert(identity, resource.clone());
        Ok(())
    }

    async fn replace_current(
        &self,
        resource: &Resource,
        expected_version: u64,
    ) -> StoreResult<bool> {
        let mut state = self.state.write();
        let identity = (resource.kind(), resource.id().to_string());
        match state.current.get(&identity) {
            Some(current) if current.version() == expected_version => {
                state.current.insert(identity, resource.clone());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn put_history(&self, resource: &Resource) -> StoreResult<()> {
        let mut state = self.state.write();
        state.history.insert(
            (resource.kind(), resource.id().to_string(), resource.version()),
            resource.clone(),
        );
        Ok(())
    }

    async fn get_version(
        &self,
        kind: ResourceKind,
        id: &str,
        version: u64,
    ) -> StoreResult<Option<Resource>> {
        let state = self.state.read();
        Ok(state.history.get(&(kind, id.to_string(), version)).cloned())
    }

    async fn list_versions(&self, kind: ResourceKind, id: &str) -> StoreResult<Vec<Resource>> {
        let state = self.state.read();
        let lower = (kind, id.to_string(), 0);
        let upper = (kind, id.to_string(), u64::MAX);
        Ok(state
            .history
            .range(lower..=upper)
            .rev()
            .map(|(_, resource)| resource.clone())
            .collect())
    }

    async fn scan_by_recency(
        &self,
        kind: ResourceKind,
        updated_after: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<Resource>> {
        let state = self.state.read();
        let mut matches: Vec<Resource> = state
            .current
            .values()
            .filter(|r| r.kind() == kind)
            .filter(|r| updated_after.is_none_or(|after| r.last_modified() > after))
            .cloned()
            .collect();
        sort_by_recency(&mut matches);
        Ok(matches)
    }

    async fn scan_by_owner(
        &self,
        owner: &OwnerRef,
        kind: ResourceKind,
    ) -> StoreResult<Vec<Resource>> {
        let state = self.state.read();
        let mut matches: Vec<Resource> = state
            .current
            .values()
            .filter(|r| r.kind() == kind)
            .filter(|r| r.owner() == Some(owner))
            .cloned()
            .collect();
        sort_by_recency(&mut matches);
        Ok(matches)
    }
}

/// Most recently modified first, id as a stable tie-break.
fn sort_by_recency(resources: &mut [Resource]) {
    resources.sort_by(|a, b| {
        b.last_modified()
            .cmp(&a.last_modified())
            .then_with(|| a.id().cmp(b.id()))
    });
}
