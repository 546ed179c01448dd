//! Core types for stored resources and search.

mod query;
mod resource;

pub use query::{ResultEntry, ResultSet, SearchQuery};
pub use resource::{OwnerRef, Resource};
