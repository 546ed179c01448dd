//! Store configuration.
//!
//! Configuration is constructed explicitly and injected at store
//! construction; there are no process-wide singletons or ambient table
//! handles.

/// Configuration for a [`ResourceStore`](crate::ResourceStore) instance.
///
/// # Examples
///
/// ```
/// use chartstore::StoreConfig;
///
/// let config = StoreConfig::default()
///     .with_default_page_limit(50)
///     .with_max_write_retries(5);
///
/// assert_eq!(config.default_page_limit, 50);
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Result limit applied when a search query does not supply one.
    pub default_page_limit: u32,

    /// Bound on compare-and-swap attempts for update and delete before
    /// the operation surfaces a conflict.
    pub max_write_retries: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_page_limit: 20,
            max_write_retries: 3,
        }
    }
}

impl StoreConfig {
    /// Sets the default page limit.
    pub fn with_default_page_limit(mut self, limit: u32) -> Self {
        self.default_page_limit = limit;
        self
    }

    /// Sets the compare-and-swap retry bound. Clamped to at least 1.
    pub fn with_max_write_retries(mut self, retries: u32) -> Self {
        self.max_write_retries = retries.max(1);
        self
    }
}
