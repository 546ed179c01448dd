//! The stamped resource record.
//!
//! This module defines [`Resource`], the schema-tagged record the store
//! persists, and [`OwnerRef`], the validated cross-reference used for
//! owner-index placement.

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::ValidationError;
use crate::kind::ResourceKind;

/// A versioned, schema-tagged record of a declared kind.
///
/// The (`kind`, `id`) pair is the resource's identity and is immutable
/// across all versions. `version` starts at 1 and increments by exactly 1
/// on every successful write; the sequence is gap-free because the store
/// guards the current row with a compare-and-swap. A tombstoned resource
/// (`deleted == true`) stays readable by id but is hidden from searches
/// by default, and never transitions back.
///
/// # Examples
///
/// ```no_run
/// use chartstore::{MemoryBackend, ResourceKind, ResourceStore, StoreConfig};
/// use serde_json::json;
///
/// # async fn example() -> chartstore::StoreResult<()> {
/// let store = ResourceStore::new(MemoryBackend::new(), StoreConfig::default());
/// let patient = store
///     .create(ResourceKind::Patient, json!({"name": [{"family": "Smith"}]}))
///     .await?;
///
/// assert_eq!(patient.version(), 1);
/// assert!(!patient.is_deleted());
/// assert_eq!(patient.full_reference(), format!("Patient/{}", patient.id()));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    /// The kind tag; immutable after creation.
    kind: ResourceKind,

    /// The resource's opaque identifier, unique within a kind.
    id: String,

    /// Monotonically increasing version number, starting at 1.
    version: u64,

    /// Timestamp of the write that produced this version.
    last_modified: DateTime<Utc>,

    /// Tombstone flag. One-way transition `false -> true`.
    deleted: bool,

    /// The kind-specific payload; opaque to the store beyond shape checks.
    body: Value,

    /// Owner cross-reference used purely for index placement.
    #[serde(skip_serializing_if = "Option::is_none")]
    owner: Option<OwnerRef>,
}

impl Resource {
    /// Stamps a brand-new resource at version 1.
    pub(crate) fn new(kind: ResourceKind, id: String, mut body: Value, owner: Option<OwnerRef>) -> Self {
        normalize_body(kind, &id, &mut body);
        Self {
            kind,
            id,
            version: 1,
            last_modified: Utc::now(),
            deleted: false,
            body,
            owner,
        }
    }

    /// Stamps the next version of this resource with replacement content.
    ///
    /// Only valid on a live resource; the store never routes a tombstone
    /// here, since `deleted` must not transition back to `false`.
    pub(crate) fn new_version(self, mut body: Value, owner: Option<OwnerRef>) -> Self {
        debug_assert!(!self.deleted, "tombstones cannot take new content");
        normalize_body(self.kind, &self.id, &mut body);
        Self {
            kind: self.kind,
            id: self.id,
            version: self.version + 1,
            last_modified: Utc::now(),
            deleted: false,
            body,
            owner,
        }
    }

    /// Stamps a tombstone version: same body, `deleted` set, version bumped.
    pub(crate) fn mark_deleted(self) -> Self {
        Self {
            kind: self.kind,
            id: self.id,
            version: self.version + 1,
            last_modified: Utc::now(),
            deleted: true,
            body: self.body,
            owner: self.owner,
        }
    }

    /// Reconstructs a resource from a stored row.
    ///
    /// Backends use this when loading current or history rows; no stamping
    /// happens here.
    pub fn from_row(
        kind: ResourceKind,
        id: impl Into<String>,
        version: u64,
        last_modified: DateTime<Utc>,
        deleted: bool,
        body: Value,
        owner: Option<OwnerRef>,
    ) -> Self {
        Self {
            kind,
            id: id.into(),
            version,
            last_modified,
            deleted,
            body,
            owner,
        }
    }

    /// Returns the kind tag.
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Returns the resource's identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the version number.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Returns the timestamp of the write that produced this version.
    pub fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }

    /// Returns `true` if this resource has been tombstoned.
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Returns the payload.
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Consumes self and returns the payload.
    pub fn into_body(self) -> Value {
        self.body
    }

    /// Returns the owner cross-reference, if the kind carries one.
    pub fn owner(&self) -> Option<&OwnerRef> {
        self.owner.as_ref()
    }

    /// Returns the full reference for this resource (e.g., `Patient/123`).
    pub fn full_reference(&self) -> String {
        format!("{}/{}", self.kind, self.id)
    }

    /// Returns the weak ETag for this version (e.g., `W/"3"`).
    ///
    /// The routing collaborator uses this for conditional requests; the
    /// store itself keys its compare-and-swap on the raw version number.
    pub fn etag(&self) -> String {
        format!("W/\"{}\"", self.version)
    }
}

/// Ensures the payload's tag and id fields mirror the stamped identity.
fn normalize_body(kind: ResourceKind, id: &str, body: &mut Value) {
    if let Some(obj) = body.as_object_mut() {
        obj.insert(
            "resourceType".to_string(),
            Value::String(kind.as_str().to_string()),
        );
        obj.insert("id".to_string(), Value::String(id.to_string()));
    }
}

/// A validated cross-reference to an owning resource.
///
/// Owners are used purely for index placement; the store does not check
/// that the referenced resource exists. The reference format is
/// `{kind}/{id}`, and the kind must be an owner kind.
///
/// # Examples
///
/// ```
/// use chartstore::OwnerRef;
///
/// let owner = OwnerRef::parse("Patient/p-1").unwrap();
/// assert_eq!(owner.reference(), "Patient/p-1");
/// assert!(OwnerRef::parse("Observation/o-1").is_err());
/// assert!(OwnerRef::parse("not-a-reference").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OwnerRef {
    kind: ResourceKind,
    id: String,
}

impl OwnerRef {
    /// Builds an owner reference directly from a kind and id.
    ///
    /// Fails if `kind` is not an owner kind or `id` is empty.
    pub fn new(kind: ResourceKind, id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if !kind.is_owner_kind() {
            return Err(ValidationError::InvalidPayload {
                reason: format!("{kind} is not an owner kind"),
            });
        }
        if id.is_empty() {
            return Err(ValidationError::InvalidPayload {
                reason: "owner reference id must be non-empty".to_string(),
            });
        }
        Ok(Self { kind, id })
    }

    /// Parses a `{kind}/{id}` reference string.
    pub fn parse(reference: &str) -> Result<Self, ValidationError> {
        let (tag, id) = reference.split_once('/').ok_or_else(|| {
            ValidationError::InvalidPayload {
                reason: format!("malformed owner reference: {reference}"),
            }
        })?;
        let kind = ResourceKind::parse(tag).map_err(|_| ValidationError::InvalidPayload {
            reason: format!("owner reference names unsupported kind: {tag}"),
        })?;
        Self::new(kind, id)
    }

    /// Returns the owner's kind.
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Returns the owner's id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the reference string (e.g., `Patient/123`).
    pub fn reference(&self) -> String {
        format!("{}/{}", self.kind, self.id)
    }
}

impl Serialize for OwnerRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.reference())
    }
}

impl<'de> Deserialize<'de> for OwnerRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        OwnerRef::parse(&s).map_err(D::Error::custom)
    }
}
