use std::sync::Arc;

use tracing::debug;

use crate::client::memory::MemoryStore;
use crate::client::{StoreClient, StoreConnector, StoreDatabase};
use crate::core::{ClientOptions, RepositoryOptions, Result};
use crate::lazy::LazyShared;

/// Builds and shares the client and database handles repositories operate
/// through.
///
/// The factory owns the first two tiers of the lazy initialization chain:
/// the client handle and the database handle (which provisions the database
/// if absent). Each repository instance adds the third tier, its container
/// handle, so the first data operation walks container -> database ->
/// client with each step executed exactly once.
pub struct DocumentFactory {
    options: RepositoryOptions,
    connector: Arc<dyn StoreConnector>,
    client: LazyShared<Arc<dyn StoreClient>>,
    database: LazyShared<Arc<dyn StoreDatabase>>,
}

impl DocumentFactory {
    /// Creates a factory over the given connector.
    ///
    /// Fails with a configuration error when a required option is missing.
    pub fn new(options: RepositoryOptions, connector: Arc<dyn StoreConnector>) -> Result<Self> {
        options.validate()?;

        Ok(Self {
            options,
            connector,
            client: LazyShared::new(),
            database: LazyShared::new(),
        })
    }

    /// Creates a factory backed by the in-process memory store.
    pub fn in_memory(options: RepositoryOptions) -> Result<Self> {
        Self::new(options, Arc::new(MemoryStore::new()))
    }

    pub fn options(&self) -> &RepositoryOptions {
        &self.options
    }

    /// The shared client handle, connecting on first use.
    pub async fn client(&self) -> Result<Arc<dyn StoreClient>> {
        self.client
            .get_or_init(|| async {
                debug!("initializing store client");

                let client_options = self.client_options();
                self.connector
                    .connect(&self.options.connection_string, &client_options)
                    .await
            })
            .await
    }

    /// The shared database handle, provisioning the database on first use.
    pub async fn database(&self) -> Result<Arc<dyn StoreDatabase>> {
        self.database
            .get_or_init(|| async {
                let client = self.client().await?;

                debug!(database = %self.options.database_id, "initializing database");

                client
                    .create_database_if_not_exists(&self.options.database_id)
                    .await
            })
            .await
    }

    fn client_options(&self) -> ClientOptions {
        ClientOptions {
            allow_bulk_execution: self.options.allow_bulk_execution,
        }
    }
}
