use crate::core::{RepositoryError, Result};

/// The database id used when none is configured.
pub const DEFAULT_DATABASE_ID: &str = "database";

/// Repository configuration, supplied once when the factory is constructed.
///
/// # Examples
///
/// ```
/// use docrepo::RepositoryOptions;
///
/// let options = RepositoryOptions::new("memory://local")
///     .database_id("inventory")
///     .optimize_bandwidth(true);
///
/// assert_eq!(options.database_id, "inventory");
/// ```
#[derive(Debug, Clone)]
pub struct RepositoryOptions {
    /// Connection string for the store account. Interpreted by the
    /// configured connector, not by this crate.
    pub connection_string: String,

    /// Name identifier for the database. Defaults to `"database"`.
    pub database_id: String,

    /// When true, write operations request header-only responses from the
    /// store and return the caller's entity instead of the stored body.
    pub optimize_bandwidth: bool,

    /// Opt in to the store's bulk execution mode where supported.
    pub allow_bulk_execution: bool,
}

impl RepositoryOptions {
    /// Creates options for the given connection string with defaults for
    /// everything else.
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            database_id: DEFAULT_DATABASE_ID.to_string(),
            optimize_bandwidth: false,
            allow_bulk_execution: false,
        }
    }

    /// Sets the database id.
    pub fn database_id(mut self, database_id: impl Into<String>) -> Self {
        self.database_id = database_id.into();
        self
    }

    /// Sets the bandwidth optimization flag.
    pub fn optimize_bandwidth(mut self, optimize: bool) -> Self {
        self.optimize_bandwidth = optimize;
        self
    }

    /// Sets the bulk execution flag.
    pub fn allow_bulk_execution(mut self, allow: bool) -> Self {
        self.allow_bulk_execution = allow;
        self
    }

    /// Validates that required options are present.
    pub fn validate(&self) -> Result<()> {
        if self.connection_string.is_empty() {
            return Err(RepositoryError::Configuration(
                "the repository option connection_string is required".to_string(),
            ));
        }
        if self.database_id.is_empty() {
            return Err(RepositoryError::Configuration(
                "the repository option database_id is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Options handed to the store connector when the client handle is built.
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    pub allow_bulk_execution: bool,
}
