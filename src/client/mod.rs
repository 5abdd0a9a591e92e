pub mod memory;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::container::ContainerSpec;
use crate::core::{ClientOptions, Result};
use crate::keys::PartitionKey;
use crate::query::{QueryOptions, StoreQuery};

/// Observational metadata attached to every store response.
#[derive(Debug, Clone)]
pub struct ResponseMeta {
    /// HTTP-style status code reported by the store.
    pub status: u16,
    /// Cost of the operation in the store's charge units.
    pub request_charge: f64,
    /// Time the store spent serving the request.
    pub elapsed: Duration,
}

/// Response to a point operation.
#[derive(Debug, Clone)]
pub struct ItemResponse {
    /// The stored document. `None` for a not-found point read, and for
    /// writes when the content response is suppressed.
    pub document: Option<Value>,
    pub meta: ResponseMeta,
}

/// One page of query results.
#[derive(Debug, Clone)]
pub struct QueryPage {
    pub documents: Vec<Value>,
    /// Token for the next page, absent on the last one.
    pub continuation: Option<String>,
    pub meta: ResponseMeta,
}

/// Per-operation options for point writes.
#[derive(Debug, Clone)]
pub struct ItemOptions {
    /// When false the store returns headers only and no document body.
    pub enable_content_response: bool,
}

impl Default for ItemOptions {
    fn default() -> Self {
        Self {
            enable_content_response: true,
        }
    }
}

/// Builds store clients from connection configuration.
///
/// Implement this trait to plug a real document store SDK under the
/// repository; [`memory::MemoryStore`] is the in-process implementation.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(
        &self,
        connection_string: &str,
        options: &ClientOptions,
    ) -> Result<Arc<dyn StoreClient>>;
}

/// An account-level handle to the document store.
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Provisions the database if absent and returns its handle.
    async fn create_database_if_not_exists(
        &self,
        database_id: &str,
    ) -> Result<Arc<dyn StoreDatabase>>;
}

/// A database handle capable of provisioning containers.
#[async_trait]
pub trait StoreDatabase: Send + Sync {
    fn id(&self) -> &str;

    /// Provisions the container if absent and returns its handle. The call
    /// is idempotent on the remote side.
    async fn create_container_if_not_exists(
        &self,
        spec: &ContainerSpec,
    ) -> Result<Arc<dyn StoreContainer>>;
}

/// A container handle exposing point operations and paged queries.
#[async_trait]
pub trait StoreContainer: Send + Sync {
    fn spec(&self) -> &ContainerSpec;

    /// Point read. A missing item is reported through
    /// [`ItemResponse::document`] being `None`, not as an error.
    async fn read_item(&self, id: &str, partition_key: &PartitionKey) -> Result<ItemResponse>;

    /// Inserts a new document; fails with a conflict when the id already
    /// exists in the partition.
    async fn create_item(
        &self,
        document: Value,
        partition_key: &PartitionKey,
        options: &ItemOptions,
    ) -> Result<ItemResponse>;

    /// Inserts or replaces a document.
    async fn upsert_item(
        &self,
        document: Value,
        partition_key: &PartitionKey,
        options: &ItemOptions,
    ) -> Result<ItemResponse>;

    /// Deletes a document; a missing item is an error.
    async fn delete_item(&self, id: &str, partition_key: &PartitionKey) -> Result<ItemResponse>;

    /// Executes one page of a query across all partitions.
    async fn query_page(&self, query: &StoreQuery, options: &QueryOptions) -> Result<QueryPage>;
}
