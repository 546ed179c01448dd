//! Key-value/index backend contract and implementations.
//!
//! The store owns identity, stamping, and invariants; everything durable
//! lives behind the [`IndexBackend`] trait. A backend keeps one mutable
//! "current" row per identity plus one immutable history row per version,
//! and serves two secondary-index scans: kind-wide by recency and by
//! owner reference.
//!
//! # Available backends
//!
//! | Backend | Feature | Description |
//! |---------|---------|-------------|
//! | Memory | always | `parking_lot` maps, for tests and development |
//! | SQLite | `sqlite` (default) | Durable embedded database via `rusqlite` |

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreResult;
use crate::kind::ResourceKind;
use crate::types::{OwnerRef, Resource};

mod memory;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use memory::MemoryBackend;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteBackend;

/// Durable row storage with conditional writes and two index scans.
///
/// # Row layout
///
/// Each identity occupies one current row, overwritten in place through
/// [`replace_current`](IndexBackend::replace_current), plus one history
/// row per version ever written. History rows are immutable once written.
///
/// # Write conditions
///
/// Two operations carry conditions, and they are the only concurrency
/// control the store relies on:
///
/// - [`insert_current`](IndexBackend::insert_current) must reject an
///   identity that already has a current row, so a create race has
///   exactly one winner.
/// - [`replace_current`](IndexBackend::replace_current) must only apply
///   when the current row still holds the expected version, so the
///   store's read-modify-write never loses an update silently.
#[async_trait]
pub trait IndexBackend: Send + Sync {
    /// Returns a human-readable name for this backend.
    fn backend_name(&self) -> &'static str;

    /// Looks up the current row for an identity.
    async fn get_current(&self, kind: ResourceKind, id: &str) -> StoreResult<Option<Resource>>;

    /// Inserts a current row, failing with `AlreadyExists` if the
    /// identity already has one.
    async fn insert_current(&self, resource: &Resource) -> StoreResult<()>;

    /// Replaces the current row only if it still holds `expected_version`.
    ///
    /// Returns `false` when the condition did not hold; the caller decides
    /// whether to re-read and retry.
    async fn replace_current(
        &self,
        resource: &Resource,
        expected_version: u64,
    ) -> StoreResult<bool>;

    /// Appends an immutable history row for this version.
    async fn put_history(&self, resource: &Resource) -> StoreResult<()>;

    /// Looks up one historical version of an identity.
    async fn get_version(
        &self,
        kind: ResourceKind,
        id: &str,
        version: u64,
    ) -> StoreResult<Option<Resource>>;

    /// Returns every version of an identity, newest first.
    async fn list_versions(&self, kind: ResourceKind, id: &str) -> StoreResult<Vec<Resource>>;

    /// Scans the kind-wide index, most recently modified first.
    ///
    /// When `updated_after` is set, only rows modified strictly after that
    /// instant are returned.
    async fn scan_by_recency(
        &self,
        kind: ResourceKind,
        updated_after: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<Resource>>;

    /// Scans the owner index for rows of `kind` owned by `owner`, most
    /// recently modified first.
    async fn scan_by_owner(
        &self,
        owner: &OwnerRef,
        kind: ResourceKind,
    ) -> StoreResult<Vec<Resource>>;
}
