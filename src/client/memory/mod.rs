//! An in-process document store implementing the client traits.
//!
//! Useful for tests and local development: documents live in process
//! memory, system properties (`_etag`, `_ts`) are assigned on write, and
//! provisioning calls are counted so initialization behavior can be
//! observed.

mod sql;

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::client::{
    ItemOptions, ItemResponse, QueryPage, ResponseMeta, StoreClient, StoreConnector,
    StoreContainer, StoreDatabase,
};
use crate::container::ContainerSpec;
use crate::core::{ClientOptions, RepositoryError, Result};
use crate::keys::PartitionKey;
use crate::query::{QueryOptions, StoreQuery};

const DEFAULT_PAGE_SIZE: usize = 100;

const READ_CHARGE: f64 = 1.0;
const WRITE_CHARGE: f64 = 5.0;
const QUERY_CHARGE: f64 = 2.3;

/// The in-memory store account. Cloning shares the underlying state, so a
/// test can keep a handle for inspection while a factory connects through
/// the same instance.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    databases: RwLock<HashMap<String, Arc<MemoryDatabase>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a provisioned database by id.
    pub fn database(&self, database_id: &str) -> Option<Arc<MemoryDatabase>> {
        self.state
            .databases
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(database_id)
            .cloned()
    }
}

#[async_trait]
impl StoreConnector for MemoryStore {
    async fn connect(
        &self,
        _connection_string: &str,
        _options: &ClientOptions,
    ) -> Result<Arc<dyn StoreClient>> {
        Ok(Arc::new(MemoryClient {
            state: self.state.clone(),
        }) as Arc<dyn StoreClient>)
    }
}

struct MemoryClient {
    state: Arc<MemoryState>,
}

#[async_trait]
impl StoreClient for MemoryClient {
    async fn create_database_if_not_exists(
        &self,
        database_id: &str,
    ) -> Result<Arc<dyn StoreDatabase>> {
        let mut databases = self
            .state
            .databases
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let database = databases
            .entry(database_id.to_string())
            .or_insert_with(|| Arc::new(MemoryDatabase::new(database_id)))
            .clone();
        Ok(database as Arc<dyn StoreDatabase>)
    }
}

/// An in-memory database holding provisioned containers.
pub struct MemoryDatabase {
    id: String,
    containers: RwLock<HashMap<String, Arc<MemoryContainer>>>,
    provision_calls: AtomicUsize,
}

impl MemoryDatabase {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            containers: RwLock::new(HashMap::new()),
            provision_calls: AtomicUsize::new(0),
        }
    }

    /// Number of container provisioning calls this database has served.
    pub fn provision_calls(&self) -> usize {
        self.provision_calls.load(Ordering::SeqCst)
    }

    /// Looks up a provisioned container by name.
    pub fn container(&self, name: &str) -> Option<Arc<MemoryContainer>> {
        self.containers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }
}

#[async_trait]
impl StoreDatabase for MemoryDatabase {
    fn id(&self) -> &str {
        &self.id
    }

    async fn create_container_if_not_exists(
        &self,
        spec: &ContainerSpec,
    ) -> Result<Arc<dyn StoreContainer>> {
        self.provision_calls.fetch_add(1, Ordering::SeqCst);

        let mut containers = self
            .containers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let container = containers
            .entry(spec.name.clone())
            .or_insert_with(|| Arc::new(MemoryContainer::new(spec.clone())))
            .clone();
        Ok(container as Arc<dyn StoreContainer>)
    }
}

/// An in-memory container keyed by (partition key, id).
pub struct MemoryContainer {
    spec: ContainerSpec,
    items: RwLock<BTreeMap<(String, String), Value>>,
}

impl MemoryContainer {
    fn new(spec: ContainerSpec) -> Self {
        Self {
            spec,
            items: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of stored documents across all partitions.
    pub fn len(&self) -> usize {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl StoreContainer for MemoryContainer {
    fn spec(&self) -> &ContainerSpec {
        &self.spec
    }

    async fn read_item(&self, id: &str, partition_key: &PartitionKey) -> Result<ItemResponse> {
        let started = Instant::now();
        let key = (partition_key.as_str().to_string(), id.to_string());

        let items = self.items.read().unwrap_or_else(PoisonError::into_inner);
        match items.get(&key) {
            Some(document) => Ok(ItemResponse {
                document: Some(document.clone()),
                meta: meta(200, READ_CHARGE, started),
            }),
            None => Ok(ItemResponse {
                document: None,
                meta: meta(404, READ_CHARGE, started),
            }),
        }
    }

    async fn create_item(
        &self,
        document: Value,
        partition_key: &PartitionKey,
        options: &ItemOptions,
    ) -> Result<ItemResponse> {
        let started = Instant::now();
        let id = document_id(&document)?;
        let key = (partition_key.as_str().to_string(), id.clone());

        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        if items.contains_key(&key) {
            return Err(RepositoryError::Conflict(format!(
                "item '{id}' already exists in partition '{partition_key}'"
            )));
        }

        let stored = stamp_system_properties(document);
        items.insert(key, stored.clone());

        Ok(ItemResponse {
            document: options.enable_content_response.then_some(stored),
            meta: meta(201, WRITE_CHARGE, started),
        })
    }

    async fn upsert_item(
        &self,
        document: Value,
        partition_key: &PartitionKey,
        options: &ItemOptions,
    ) -> Result<ItemResponse> {
        let started = Instant::now();
        let id = document_id(&document)?;
        let key = (partition_key.as_str().to_string(), id);

        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        let status = if items.contains_key(&key) { 200 } else { 201 };

        let stored = stamp_system_properties(document);
        items.insert(key, stored.clone());

        Ok(ItemResponse {
            document: options.enable_content_response.then_some(stored),
            meta: meta(status, WRITE_CHARGE, started),
        })
    }

    async fn delete_item(&self, id: &str, partition_key: &PartitionKey) -> Result<ItemResponse> {
        let started = Instant::now();
        let key = (partition_key.as_str().to_string(), id.to_string());

        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        match items.remove(&key) {
            Some(_) => Ok(ItemResponse {
                document: None,
                meta: meta(204, WRITE_CHARGE, started),
            }),
            None => Err(RepositoryError::NotFound(format!(
                "item '{id}' was not found in partition '{partition_key}'"
            ))),
        }
    }

    async fn query_page(&self, query: &StoreQuery, options: &QueryOptions) -> Result<QueryPage> {
        let started = Instant::now();

        let filter = match query.filter() {
            Some(filter) => Some(filter.clone()),
            None => sql::filter_from_query(query)?,
        };

        let offset = match options.continuation.as_deref() {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| RepositoryError::Query("invalid continuation token".to_string()))?,
            None => 0,
        };
        let page_size = options
            .max_item_count
            .filter(|count| *count > 0)
            .map(|count| count as usize)
            .unwrap_or(DEFAULT_PAGE_SIZE);

        let items = self.items.read().unwrap_or_else(PoisonError::into_inner);
        let matched: Vec<&Value> = items
            .values()
            .filter(|document| filter.as_ref().is_none_or(|f| f.matches(document)))
            .collect();

        let documents: Vec<Value> = matched
            .iter()
            .skip(offset)
            .take(page_size)
            .map(|document| (*document).clone())
            .collect();

        let next = offset + documents.len();
        let continuation = (next < matched.len()).then(|| next.to_string());

        Ok(QueryPage {
            documents,
            continuation,
            meta: meta(200, QUERY_CHARGE, started),
        })
    }
}

fn meta(status: u16, request_charge: f64, started: Instant) -> ResponseMeta {
    ResponseMeta {
        status,
        request_charge,
        elapsed: started.elapsed(),
    }
}

/// Extracts the serialized `id` property a document must carry.
fn document_id(document: &Value) -> Result<String> {
    match document.get("id").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => Ok(id.to_string()),
        _ => Err(RepositoryError::Request {
            status: 400,
            message: "document requires a non-empty string 'id' property".to_string(),
        }),
    }
}

fn stamp_system_properties(mut document: Value) -> Value {
    if let Some(object) = document.as_object_mut() {
        object.insert("_etag".to_string(), Value::from(Uuid::new_v4().to_string()));
        object.insert("_ts".to_string(), Value::from(Utc::now().timestamp()));
    }
    document
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec() -> ContainerSpec {
        ContainerSpec {
            name: "Things".to_string(),
            partition_key_path: "/id".to_string(),
        }
    }

    #[tokio::test]
    async fn create_then_read_round_trips() {
        let container = MemoryContainer::new(spec());
        let pk = PartitionKey::from("t-1");

        container
            .create_item(json!({"id": "t-1", "name": "thing"}), &pk, &ItemOptions::default())
            .await
            .unwrap();

        let response = container.read_item("t-1", &pk).await.unwrap();
        let document = response.document.unwrap();
        assert_eq!(document["name"], "thing");
        assert!(document["_etag"].is_string());
        assert!(document["_ts"].is_i64());
    }

    #[tokio::test]
    async fn create_twice_conflicts() {
        let container = MemoryContainer::new(spec());
        let pk = PartitionKey::from("t-1");
        let doc = json!({"id": "t-1"});

        container
            .create_item(doc.clone(), &pk, &ItemOptions::default())
            .await
            .unwrap();
        let err = container
            .create_item(doc, &pk, &ItemOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn query_pages_with_continuation() {
        let container = MemoryContainer::new(spec());
        for index in 0..5 {
            let id = format!("t-{index}");
            let pk = PartitionKey::from(id.as_str());
            container
                .create_item(json!({ "id": id }), &pk, &ItemOptions::default())
                .await
                .unwrap();
        }

        let query = StoreQuery::new("SELECT * FROM c");
        let first = container
            .query_page(
                &query,
                &QueryOptions {
                    max_item_count: Some(2),
                    continuation: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(first.documents.len(), 2);

        let second = container
            .query_page(
                &query,
                &QueryOptions {
                    max_item_count: Some(2),
                    continuation: first.continuation.clone(),
                },
            )
            .await
            .unwrap();
        assert_eq!(second.documents.len(), 2);

        let third = container
            .query_page(
                &query,
                &QueryOptions {
                    max_item_count: Some(2),
                    continuation: second.continuation.clone(),
                },
            )
            .await
            .unwrap();
        assert_eq!(third.documents.len(), 1);
        assert!(third.continuation.is_none());
    }
}
