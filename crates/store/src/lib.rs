//! Versioned clinical resource store.
//!
//! This crate persists clinical resources (patients, encounters, and
//! similar entities) as versioned, schema-tagged records and answers
//! point lookups and filtered searches across them. The store owns
//! identity generation, metadata stamping, versioning, the CRUD
//! invariants, and index-aware search; everything durable lives behind
//! the [`IndexBackend`] trait.
//!
//! # Model
//!
//! - **Identity**: the immutable (`kind`, `id`) pair naming a resource
//!   across all its versions.
//! - **Versioning**: versions start at 1 and increment by exactly 1 on
//!   every successful write; the sequence is gap-free because the current
//!   row is guarded by a compare-and-swap.
//! - **Tombstones**: delete is logical. A tombstoned resource stays
//!   readable by id, is hidden from searches by default, and never comes
//!   back.
//! - **History**: every version ever written is retained as an immutable
//!   history row.
//!
//! # Backends
//!
//! | Backend | Feature | Description |
//! |---------|---------|-------------|
//! | [`MemoryBackend`] | always | In-memory maps, for tests and development |
//! | `SqliteBackend` | `sqlite` (default) | Durable embedded database |
//!
//! # Quick start
//!
//! ```no_run
//! use chartstore::{MemoryBackend, ResourceKind, ResourceStore, SearchQuery, StoreConfig};
//! use serde_json::json;
//!
//! # async fn example() -> chartstore::StoreResult<()> {
//! let store = ResourceStore::new(MemoryBackend::new(), StoreConfig::default());
//!
//! // Create: id assigned, version stamped at 1
//! let patient = store
//!     .create(ResourceKind::Patient, json!({"name": [{"family": "Smith"}]}))
//!     .await?;
//! assert_eq!(patient.version(), 1);
//!
//! // Clinical-event kinds carry an owner reference for index placement
//! let observation = store
//!     .create(
//!         ResourceKind::Observation,
//!         json!({
//!             "subject": {"reference": format!("Patient/{}", patient.id())},
//!             "code": {"text": "heart rate"}
//!         }),
//!     )
//!     .await?;
//!
//! // Owner-filtered search, most recently modified first
//! let owned = store
//!     .search(
//!         ResourceKind::Observation,
//!         SearchQuery::new().with_owner(observation.owner().unwrap().clone()),
//!     )
//!     .await?;
//! assert_eq!(owned.total_hint, 1);
//! # Ok(())
//! # }
//! ```
//!
//! # Concurrency
//!
//! The store is stateless per call and holds no locks; run as many
//! instances over one backend as you like. Create races are decided by
//! the backend's insert-if-absent: exactly one winner, the loser sees
//! `AlreadyExists`. Update and delete compare-and-swap on the previously
//! read version, retried a bounded number of times before surfacing a
//! conflict. Backend outages are never retried internally and never
//! masked as `NotFound`.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backend;
pub mod config;
pub mod error;
pub mod kind;
pub mod store;
pub mod types;

// Re-export commonly used types at crate root
pub use backend::{IndexBackend, MemoryBackend};
#[cfg(feature = "sqlite")]
pub use backend::SqliteBackend;
pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use kind::ResourceKind;
pub use store::ResourceStore;
pub use types::{OwnerRef, Resource, ResultEntry, ResultSet, SearchQuery};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
