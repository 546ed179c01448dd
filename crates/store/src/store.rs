//! The versioned resource store.
//!
//! This module implements the five store operations plus the version
//! supplements (vread, history, exists). The store is stateless per call:
//! all durable state lives behind the injected [`IndexBackend`], and many
//! store instances can safely share one backend.

use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::IndexBackend;
use crate::config::StoreConfig;
use crate::error::{ConcurrencyError, ResourceError, StoreResult, ValidationError};
use crate::kind::ResourceKind;
use crate::types::{OwnerRef, Resource, ResultEntry, ResultSet, SearchQuery};

/// The versioned resource store.
///
/// Owns identity generation, metadata stamping, versioning, the CRUD
/// operations, and index-aware search. Constructed explicitly from a
/// backend handle and a [`StoreConfig`]; holds no locks and no shared
/// mutable state.
///
/// # Write ordering
///
/// Mutations condition on the current row first and append the history
/// row second. Create uses the backend's insert-if-absent; update and
/// delete compare-and-swap on the previously read version and retry a
/// bounded number of times, so history rows never carry duplicate version
/// numbers. A failure between the two writes leaves a current row whose
/// history row is missing; the error is surfaced, never swallowed.
///
/// # Examples
///
/// ```no_run
/// use chartstore::{MemoryBackend, ResourceKind, ResourceStore, SearchQuery, StoreConfig};
/// use serde_json::json;
///
/// # async fn example() -> chartstore::StoreResult<()> {
/// let store = ResourceStore::new(MemoryBackend::new(), StoreConfig::default());
///
/// let patient = store
///     .create(ResourceKind::Patient, json!({"name": [{"family": "Smith"}]}))
///     .await?;
///
/// let updated = store
///     .update(ResourceKind::Patient, patient.id(), json!({"name": [{"family": "Jones"}]}))
///     .await?;
/// assert_eq!(updated.version(), 2);
///
/// let results = store.search(ResourceKind::Patient, SearchQuery::new()).await?;
/// assert_eq!(results.total_hint, 1);
/// # Ok(())
/// # }
/// ```
pub struct ResourceStore<B> {
    backend: B,
    config: StoreConfig,
}

impl<B: IndexBackend> ResourceStore<B> {
    /// Creates a store over the given backend and configuration.
    pub fn new(backend: B, config: StoreConfig) -> Self {
        Self { backend, config }
    }

    /// Returns the backend handle.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns the store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Creates a new resource of the given kind.
    ///
    /// The id is taken from the payload if present (caller-supplied ids
    /// are trusted; the conditional insert is the arbiter of collisions),
    /// otherwise freshly generated. The result is stamped at version 1.
    ///
    /// # Errors
    ///
    /// * [`ValidationError::InvalidPayload`] / [`ValidationError::KindMismatch`] /
    ///   [`ValidationError::MissingOwner`] - payload validation failures
    /// * [`ResourceError::AlreadyExists`] - the identity already has a current row
    /// * `StoreError::Backend` - transport/storage failure, not retried
    pub async fn create(&self, kind: ResourceKind, payload: Value) -> StoreResult<Resource> {
        validate_payload(kind, &payload)?;
        let owner = extract_owner(kind, &payload)?;
        let id = payload_id(&payload)?.unwrap_or_else(|| Uuid::new_v4().to_string());

        let resource = Resource::new(kind, id, payload, owner);
        self.backend.insert_current(&resource).await?;
        self.backend.put_history(&resource).await?;

        info!(kind = %kind, id = resource.id(), "created resource");
        Ok(resource)
    }

    /// Reads the current version of a resource.
    ///
    /// Tombstoned resources are returned as stored; direct reads by id do
    /// not filter tombstones.
    pub async fn read(&self, kind: ResourceKind, id: &str) -> StoreResult<Resource> {
        ensure_id(id)?;
        self.backend
            .get_current(kind, id)
            .await?
            .ok_or_else(|| not_found(kind, id).into())
    }

    /// Updates an existing resource, producing the next version.
    ///
    /// The write is a compare-and-swap keyed on the previously read
    /// version, retried up to the configured bound; exhaustion surfaces
    /// [`ConcurrencyError::Conflict`]. Tombstoned identities are absent
    /// for mutation: updating one fails with [`ResourceError::NotFound`],
    /// never resurrects it.
    pub async fn update(&self, kind: ResourceKind, id: &str, payload: Value) -> StoreResult<Resource> {
        ensure_id(id)?;
        validate_payload(kind, &payload)?;
        if let Some(payload_id) = payload_id(&payload)? {
            if payload_id != id {
                return Err(ValidationError::InvalidPayload {
                    reason: format!("payload id {payload_id} does not match {id}"),
                }
                .into());
            }
        }
        let owner = extract_owner(kind, &payload)?;

        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let current = self
                .backend
                .get_current(kind, id)
                .await?
                .ok_or_else(|| not_found(kind, id))?;
            if current.is_deleted() {
                // Tombstones only move forward; no resurrection through update.
                return Err(not_found(kind, id).into());
            }
            let expected = current.version();
            let next = current.new_version(payload.clone(), owner.clone());

            if self.backend.replace_current(&next, expected).await? {
                self.backend.put_history(&next).await?;
                debug!(kind = %kind, id, version = next.version(), "updated resource");
                return Ok(next);
            }
            if attempts >= self.config.max_write_retries {
                return Err(ConcurrencyError::Conflict {
                    kind,
                    id: id.to_string(),
                    attempts,
                }
                .into());
            }
            warn!(kind = %kind, id, attempts, "lost version race on update, retrying");
        }
    }

    /// Soft-deletes a resource.
    ///
    /// Produces a tombstone version: same body, `deleted` set, version
    /// incremented. The identity's row and history remain; a subsequent
    /// read still succeeds.
    pub async fn delete(&self, kind: ResourceKind, id: &str) -> StoreResult<()> {
        ensure_id(id)?;

        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let current = self
                .backend
                .get_current(kind, id)
                .await?
                .ok_or_else(|| not_found(kind, id))?;
            let expected = current.version();
            let tombstone = current.mark_deleted();

            if self.backend.replace_current(&tombstone, expected).await? {
                self.backend.put_history(&tombstone).await?;
                info!(kind = %kind, id, version = tombstone.version(), "tombstoned resource");
                return Ok(());
            }
            if attempts >= self.config.max_write_retries {
                return Err(ConcurrencyError::Conflict {
                    kind,
                    id: id.to_string(),
                    attempts,
                }
                .into());
            }
            warn!(kind = %kind, id, attempts, "lost version race on delete, retrying");
        }
    }

    /// Searches resources of a kind.
    ///
    /// Selects the owner index when an owner filter is present and the
    /// kind is not itself the owner kind; otherwise the kind-wide recency
    /// index. Tombstones are filtered out unless the query asks for them.
    /// Results are most-recently-modified first, truncated to the limit;
    /// `total_hint` counts matches before truncation.
    pub async fn search(&self, kind: ResourceKind, query: SearchQuery) -> StoreResult<ResultSet> {
        let owner_path = query.owner.as_ref().filter(|_| !kind.is_owner_kind());
        let mut matches = match owner_path {
            Some(owner) => {
                let mut rows = self.backend.scan_by_owner(owner, kind).await?;
                if let Some(after) = query.updated_after {
                    rows.retain(|r| r.last_modified() > after);
                }
                rows
            }
            None => self.backend.scan_by_recency(kind, query.updated_after).await?,
        };

        if !query.include_deleted {
            matches.retain(|r| !r.is_deleted());
        }

        let total_hint = matches.len() as u64;
        let limit = query.limit.unwrap_or(self.config.default_page_limit) as usize;
        matches.truncate(limit);

        debug!(kind = %kind, total_hint, returned = matches.len(), "search complete");
        Ok(ResultSet {
            total_hint,
            items: matches.into_iter().map(ResultEntry::new).collect(),
        })
    }

    /// Reads one historical version of a resource.
    pub async fn vread(&self, kind: ResourceKind, id: &str, version: u64) -> StoreResult<Resource> {
        ensure_id(id)?;
        self.backend
            .get_version(kind, id, version)
            .await?
            .ok_or_else(|| {
                ResourceError::VersionNotFound {
                    kind,
                    id: id.to_string(),
                    version,
                }
                .into()
            })
    }

    /// Returns every version of a resource, newest first.
    pub async fn history(&self, kind: ResourceKind, id: &str) -> StoreResult<Vec<Resource>> {
        ensure_id(id)?;
        let versions = self.backend.list_versions(kind, id).await?;
        if versions.is_empty() {
            return Err(not_found(kind, id).into());
        }
        Ok(versions)
    }

    /// Returns `true` if the identity has a current row (tombstoned or not).
    pub async fn exists(&self, kind: ResourceKind, id: &str) -> StoreResult<bool> {
        ensure_id(id)?;
        Ok(self.backend.get_current(kind, id).await?.is_some())
    }
}

fn not_found(kind: ResourceKind, id: &str) -> ResourceError {
    ResourceError::NotFound {
        kind,
        id: id.to_string(),
    }
}

fn ensure_id(id: &str) -> Result<(), ValidationError> {
    if id.is_empty() {
        return Err(ValidationError::InvalidPayload {
            reason: "id must be non-empty".to_string(),
        });
    }
    Ok(())
}

/// Checks the payload is a structured object whose kind tag, if present,
/// matches the operation's kind.
fn validate_payload(kind: ResourceKind, payload: &Value) -> Result<(), ValidationError> {
    let obj = payload
        .as_object()
        .ok_or_else(|| ValidationError::InvalidPayload {
            reason: "payload must be a JSON object".to_string(),
        })?;

    if let Some(tag) = obj.get("resourceType") {
        let tag = tag.as_str().ok_or_else(|| ValidationError::InvalidPayload {
            reason: "resourceType must be a string".to_string(),
        })?;
        if tag != kind.as_str() {
            return Err(ValidationError::KindMismatch {
                expected: kind,
                found: tag.to_string(),
            });
        }
    }
    Ok(())
}

/// Extracts the caller-supplied id, if any.
fn payload_id(payload: &Value) -> Result<Option<String>, ValidationError> {
    match payload.get("id") {
        None => Ok(None),
        Some(Value::String(id)) if !id.is_empty() => Ok(Some(id.clone())),
        Some(_) => Err(ValidationError::InvalidPayload {
            reason: "id must be a non-empty string".to_string(),
        }),
    }
}

/// Validated owner extraction. Fails closed: kinds that require an owner
/// reject payloads without a well-formed `subject.reference`.
fn extract_owner(kind: ResourceKind, payload: &Value) -> Result<Option<OwnerRef>, ValidationError> {
    if !kind.requires_owner() {
        return Ok(None);
    }
    let reference = payload
        .get("subject")
        .and_then(|subject| subject.get("reference"))
        .and_then(Value::as_str)
        .ok_or(ValidationError::MissingOwner { kind })?;
    Ok(Some(OwnerRef::parse(reference)?))
}
