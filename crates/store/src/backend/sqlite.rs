//! SQLite backend.
//!
//! Durable [`IndexBackend`] over `rusqlite` with an `r2d2` connection
//! pool. Current rows live in `resources` keyed on (`kind`, `id`);
//! history rows live in `resource_history` keyed on (`kind`, `id`,
//! `version`). The create-path condition rides on the `resources` primary
//! key; the compare-and-swap rides on `WHERE version = ?`.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension, Row};
use serde_json::Value;

use crate::error::{BackendError, ResourceError, StoreError, StoreResult};
use crate::kind::ResourceKind;
use crate::types::{OwnerRef, Resource};

use super::IndexBackend;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS resources (
    kind          TEXT    NOT NULL,
    id            TEXT    NOT NULL,
    version       INTEGER NOT NULL,
    last_modified TEXT    NOT NULL,
    is_deleted    INTEGER NOT NULL DEFAULT 0,
    owner_ref     TEXT,
    body          TEXT    NOT NULL,
    PRIMARY KEY (kind, id)
);

CREATE TABLE IF NOT EXISTS resource_history (
    kind          TEXT    NOT NULL,
    id            TEXT    NOT NULL,
    version       INTEGER NOT NULL,
    last_modified TEXT    NOT NULL,
    is_deleted    INTEGER NOT NULL DEFAULT 0,
    owner_ref     TEXT,
    body          TEXT    NOT NULL,
    PRIMARY KEY (kind, id, version)
);

CREATE INDEX IF NOT EXISTS idx_resources_recency
    ON resources (kind, last_modified DESC);
CREATE INDEX IF NOT EXISTS idx_resources_owner
    ON resources (owner_ref, kind);
";

/// A durable [`IndexBackend`] backed by SQLite.
///
/// # Examples
///
/// ```no_run
/// use chartstore::SqliteBackend;
///
/// # fn example() -> chartstore::StoreResult<()> {
/// // File-backed database
/// let backend = SqliteBackend::open("./data/resources.db")?;
///
/// // Or in-memory, for development
/// let backend = SqliteBackend::in_memory()?;
/// # Ok(())
/// # }
/// ```
pub struct SqliteBackend {
    pool: r2d2::Pool<SqliteConnectionManager>,
}

impl SqliteBackend {
    /// Opens (or creates) a file-backed database and initializes the schema.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let manager = SqliteConnectionManager::file(path);
        let pool = r2d2::Pool::builder().build(manager)?;
        let backend = Self { pool };
        backend.init_schema()?;
        Ok(backend)
    }

    /// Opens an in-memory database.
    ///
    /// The pool is capped at a single connection; every pooled connection
    /// would otherwise see its own private in-memory database.
    pub fn in_memory() -> StoreResult<Self> {
        let manager = SqliteConnectionManager::memory();
        let pool = r2d2::Pool::builder().max_size(1).build(manager)?;
        let backend = Self { pool };
        backend.init_schema()?;
        Ok(backend)
    }

    /// Creates the tables and indexes. Idempotent.
    pub fn init_schema(&self) -> StoreResult<()> {
        let conn = self.pool.get()?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    fn row_to_resource(kind: ResourceKind, row: &Row<'_>) -> rusqlite::Result<RawRow> {
        Ok(RawRow {
            kind,
            id: row.get("id")?,
            version: row.get::<_, i64>("version")? as u64,
            last_modified: row.get("last_modified")?,
            is_deleted: row.get("is_deleted")?,
            owner_ref: row.get("owner_ref")?,
            body: row.get("body")?,
        })
    }
}

/// A row as read from SQLite, before field-level decoding.
struct RawRow {
    kind: ResourceKind,
    id: String,
    version: u64,
    last_modified: String,
    is_deleted: bool,
    owner_ref: Option<String>,
    body: String,
}

impl RawRow {
    fn decode(self) -> StoreResult<Resource> {
        let last_modified: DateTime<Utc> = DateTime::parse_from_rfc3339(&self.last_modified)
            .map_err(|e| BackendError::Serialization {
                message: format!("bad timestamp in stored row: {e}"),
            })?
            .with_timezone(&Utc);
        let body: Value = serde_json::from_str(&self.body)?;
        let owner = match self.owner_ref {
            Some(reference) => Some(OwnerRef::parse(&reference).map_err(|e| {
                BackendError::Serialization {
                    message: format!("bad owner reference in stored row: {e}"),
                }
            })?),
            None => None,
        };
        Ok(Resource::from_row(
            self.kind,
            self.id,
            self.version,
            last_modified,
            self.is_deleted,
            body,
            owner,
        ))
    }
}

/// Fixed-width RFC 3339 so the recency index sorts lexicographically.
fn encode_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn encode_body(resource: &Resource) -> StoreResult<String> {
    serde_json::to_string(resource.body()).map_err(StoreError::from)
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

#[async_trait]
impl IndexBackend for SqliteBackend {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn get_current(&self, kind: ResourceKind, id: &str) -> StoreResult<Option<Resource>> {
        let conn = self.pool.get()?;
        let raw = conn
            .query_row(
                "SELECT id, version, last_modified, is_deleted, owner_ref, body
                 FROM resources WHERE kind = ?1 AND id = ?2",
                params![kind.as_str(), id],
                |row| Self::row_to_resource(kind, row),
            )
            .optional()?;
        raw.map(RawRow::decode).transpose()
    }

    async fn insert_current(&self, resource: &Resource) -> StoreResult<()> {
        let conn = self.pool.get()?;
        let result = conn.execute(
            "INSERT INTO resources (kind, id, version, last_modified, is_deleted, owner_ref, body)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                resource.kind().as_str(),
                resource.id(),
                resource.version() as i64,
                encode_timestamp(resource.last_modified()),
                resource.is_deleted(),
                resource.owner().map(OwnerRef::reference),
                encode_body(resource)?,
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => Err(ResourceError::AlreadyExists {
                kind: resource.kind(),
                id: resource.id().to_string(),
            }
            .into()),
            Err(e) => Err(e.into()),
        }
    }

    async fn replace_current(
        &self,
        resource: &Resource,
        expected_version: u64,
    ) -> StoreResult<bool> {
        let conn = self.pool.get()?;
        let changed = conn.execute(
            "UPDATE resources
             SET version = ?1, last_modified = ?2, is_deleted = ?3, owner_ref = ?4, body = ?5
             WHERE kind = ?6 AND id = ?7 AND version = ?8",
            params![
                resource.version() as i64,
                encode_timestamp(resource.last_modified()),
                resource.is_deleted(),
                resource.owner().map(OwnerRef::reference),
                encode_body(resource)?,
                resource.kind().as_str(),
                resource.id(),
                expected_version as i64,
            ],
        )?;
        Ok(changed == 1)
    }

    async fn put_history(&self, resource: &Resource) -> StoreResult<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO resource_history
                 (kind, id, version, last_modified, is_deleted, owner_ref, body)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                resource.kind().as_str(),
                resource.id(),
                resource.version() as i64,
                encode_timestamp(resource.last_modified()),
                resource.is_deleted(),
                resource.owner().map(OwnerRef::reference),
                encode_body(resource)?,
            ],
        )?;
        Ok(())
    }

    async fn get_version(
        &self,
        kind: ResourceKind,
        id: &str,
        version: u64,
    ) -> StoreResult<Option<Resource>> {
        let conn = self.pool.get()?;
        let raw = conn
            .query_row(
                "SELECT id, version, last_modified, is_deleted, owner_ref, body
                 FROM resource_history WHERE kind = ?1 AND id = ?2 AND version = ?3",
                params![kind.as_str(), id, version as i64],
                |row| Self::row_to_resource(kind, row),
            )
            .optional()?;
        raw.map(RawRow::decode).transpose()
    }

    async fn list_versions(&self, kind: ResourceKind, id: &str) -> StoreResult<Vec<Resource>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT id, version, last_modified, is_deleted, owner_ref, body
             FROM resource_history WHERE kind = ?1 AND id = ?2
             ORDER BY version DESC",
        )?;
        let rows = stmt.query_map(params![kind.as_str(), id], |row| {
            Self::row_to_resource(kind, row)
        })?;
        rows.map(|raw| raw.map_err(StoreError::from).and_then(RawRow::decode))
            .collect()
    }

    async fn scan_by_recency(
        &self,
        kind: ResourceKind,
        updated_after: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<Resource>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT id, version, last_modified, is_deleted, owner_ref, body
             FROM resources
             WHERE kind = ?1 AND (?2 IS NULL OR last_modified > ?2)
             ORDER BY last_modified DESC, id ASC",
        )?;
        let after = updated_after.map(encode_timestamp);
        let rows = stmt.query_map(params![kind.as_str(), after], |row| {
            Self::row_to_resource(kind, row)
        })?;
        rows.map(|raw| raw.map_err(StoreError::from).and_then(RawRow::decode))
            .collect()
    }

    async fn scan_by_owner(
        &self,
        owner: &OwnerRef,
        kind: ResourceKind,
    ) -> StoreResult<Vec<Resource>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT id, version, last_modified, is_deleted, owner_ref, body
             FROM resources
             WHERE owner_ref = ?1 AND kind = ?2
             ORDER BY last_modified DESC, id ASC",
        )?;
        let rows = stmt.query_map(params![owner.reference(), kind.as_str()], |row| {
            Self::row_to_resource(kind, row)
        })?;
        rows.map(|raw| raw.map_err(StoreError::from).and_then(RawRow::decode))
            .collect()
    }
}
