//! Search query and result-set types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::resource::{OwnerRef, Resource};

/// Recognized query options for a search.
///
/// All fields are optional; a default query returns the most recently
/// modified resources of the kind, tombstones excluded, capped at the
/// store's default page limit.
///
/// # Examples
///
/// ```
/// use chartstore::{OwnerRef, SearchQuery};
///
/// let query = SearchQuery::new()
///     .with_limit(50)
///     .with_owner(OwnerRef::parse("Patient/p-1").unwrap())
///     .with_deleted(true);
///
/// assert_eq!(query.limit, Some(50));
/// assert!(query.include_deleted);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Maximum number of results to return. Falls back to the store's
    /// configured default page limit when absent.
    pub limit: Option<u32>,

    /// Restrict results to resources owned by this reference. Ignored
    /// when searching the owner kind itself.
    pub owner: Option<OwnerRef>,

    /// Only return resources modified strictly after this instant.
    pub updated_after: Option<DateTime<Utc>>,

    /// Include tombstoned resources in the results. Defaults to `false`.
    pub include_deleted: bool,
}

impl SearchQuery {
    /// Creates an empty query with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the result limit.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the owner filter.
    pub fn with_owner(mut self, owner: OwnerRef) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Sets the modification-time lower bound (exclusive).
    pub fn with_updated_after(mut self, instant: DateTime<Utc>) -> Self {
        self.updated_after = Some(instant);
        self
    }

    /// Sets whether tombstoned resources are included.
    pub fn with_deleted(mut self, include_deleted: bool) -> Self {
        self.include_deleted = include_deleted;
        self
    }
}

/// The paginated, ordered envelope returned by search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultSet {
    /// Count of matching resources after tombstone filtering, before
    /// truncation to the limit. Monotonically non-decreasing as more
    /// matching resources are created.
    #[serde(rename = "totalHint")]
    pub total_hint: u64,

    /// Matching resources, most recently modified first, at most `limit`.
    pub items: Vec<ResultEntry>,
}

impl ResultSet {
    /// Returns the number of items in this page.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the page is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates over the resources in order.
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.items.iter().map(|entry| &entry.resource)
    }
}

/// One entry of a result set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultEntry {
    /// Convenience reference string (`kind/id`) for the entry.
    #[serde(rename = "fullReference")]
    pub full_reference: String,

    /// The matching resource.
    pub resource: Resource,
}

impl ResultEntry {
    /// Wraps a resource into a result entry.
    pub fn new(resource: Resource) -> Self {
        Self {
            full_reference: resource.full_reference(),
            resource,
        }
    }
}
