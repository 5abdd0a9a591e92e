use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{Level, debug, enabled};

use crate::client::{ItemOptions, ResponseMeta, StoreContainer};
use crate::container::{ContainerSpec, resolve_container_spec};
use crate::core::{RepositoryError, Result};
use crate::entity::{EntityModel, new_entity_id};
use crate::factory::DocumentFactory;
use crate::keys::{AccessorCache, KeyResolver, PartitionKey, cache};
use crate::lazy::LazyShared;
use crate::query::{Criteria, QueryOptions, StoreQuery};

/// Hook invoked before every mutating operation.
pub type BeforeSaveHook<T> = Arc<dyn Fn(&mut T) + Send + Sync>;

/// Hook invoked after every mutating operation completes.
pub type AfterSaveHook<T> = Arc<dyn Fn(&T) + Send + Sync>;

enum WriteMode {
    Insert,
    Upsert,
}

/// A repository over one entity type's container.
///
/// Keys resolve through the entity's registered capability, compiled
/// accessors, or convention; the container is provisioned lazily on first
/// use and shared by every operation on this instance.
///
/// # Examples
///
/// ```
/// use docrepo::{DocumentFactory, Entity, Repository, RepositoryOptions};
/// use serde::{Deserialize, Serialize};
/// use std::sync::Arc;
///
/// #[derive(Entity, Serialize, Deserialize, Clone)]
/// #[serde(rename_all = "camelCase")]
/// struct Comment {
///     id: String,
///     #[partition_key]
///     owner_id: String,
///     body: String,
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> docrepo::Result<()> {
/// let factory = Arc::new(DocumentFactory::in_memory(
///     RepositoryOptions::new("memory://local"),
/// )?);
/// let repository: Repository<Comment> = Repository::new(factory)?;
///
/// let comment = Comment {
///     id: "c-1".to_string(),
///     owner_id: "owner-42".to_string(),
///     body: "first".to_string(),
/// };
/// repository.create(comment.clone()).await?;
///
/// let found = repository.find("c-1", Some("owner-42".into())).await?;
/// assert!(found.is_some());
/// # Ok(())
/// # }
/// ```
pub struct Repository<T>
where
    T: EntityModel + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    factory: Arc<DocumentFactory>,
    container_spec: ContainerSpec,
    container: LazyShared<Arc<dyn StoreContainer>>,
    resolver: KeyResolver<T>,
    before_save: BeforeSaveHook<T>,
    after_save: AfterSaveHook<T>,
}

impl<T> Repository<T>
where
    T: EntityModel + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Creates a repository using the process-wide accessor cache.
    pub fn new(factory: Arc<DocumentFactory>) -> Result<Self> {
        Self::with_accessor_cache(factory, cache::global())
    }

    /// Creates a repository resolving accessors through the given cache.
    /// Intended for tests that need cache isolation.
    pub fn with_accessor_cache(
        factory: Arc<DocumentFactory>,
        accessor_cache: &AccessorCache,
    ) -> Result<Self> {
        let resolver = KeyResolver::<T>::from_cache(accessor_cache);
        let container_spec = resolve_container_spec::<T>()?;

        Ok(Self {
            factory,
            container_spec,
            container: LazyShared::new(),
            resolver,
            before_save: Arc::new(default_before_save::<T>),
            after_save: Arc::new(|_| {}),
        })
    }

    /// Replaces the before-save hook. The default generates a new id for a
    /// self-describing entity whose id is empty.
    pub fn with_before_save(mut self, hook: impl Fn(&mut T) + Send + Sync + 'static) -> Self {
        self.before_save = Arc::new(hook);
        self
    }

    /// Replaces the after-save hook. The default does nothing.
    pub fn with_after_save(mut self, hook: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.after_save = Arc::new(hook);
        self
    }

    /// The container descriptor this repository provisions with.
    pub fn container_spec(&self) -> &ContainerSpec {
        &self.container_spec
    }

    /// Resolves the entity's logical id.
    pub fn entity_key(&self, entity: &T) -> Result<String> {
        self.resolver.entity_key(entity)
    }

    /// Resolves the entity's partition key.
    pub fn partition_key(&self, entity: &T) -> Result<PartitionKey> {
        self.resolver.partition_key(entity)
    }

    /// Finds an entity by id. The partition key defaults to the id.
    ///
    /// Returns `Ok(None)` when the store reports the item absent.
    pub async fn find(&self, id: &str, partition_key: Option<PartitionKey>) -> Result<Option<T>> {
        if id.is_empty() {
            return Err(RepositoryError::InvalidArgument(
                "id must not be empty".to_string(),
            ));
        }

        let container = self.container().await?;
        let partition_key = partition_key.unwrap_or_else(|| PartitionKey::from(id));

        let response = container.read_item(id, &partition_key).await?;
        self.log_response("find", &response.meta);

        match response.document {
            Some(document) => Ok(Some(serde_json::from_value(document)?)),
            None => Ok(None),
        }
    }

    /// Finds all entities matching the criteria.
    pub async fn find_all(&self, criteria: &Criteria) -> Result<Vec<T>> {
        self.query_items("find_all", &criteria.to_query(), None, false)
            .await
    }

    /// Finds all entities returned by a raw query, which passes through to
    /// the store unmodified.
    pub async fn find_all_query(&self, query: &StoreQuery) -> Result<Vec<T>> {
        self.query_items("find_all_query", query, None, false).await
    }

    /// Finds the first entity matching the criteria, requesting at most one
    /// item from the store.
    pub async fn find_one(&self, criteria: &Criteria) -> Result<Option<T>> {
        let mut items = self
            .query_items("find_one", &criteria.to_query(), Some(1), true)
            .await?;
        Ok(items.drain(..).next())
    }

    /// Finds the first entity returned by a raw query, requesting at most
    /// one item from the store.
    pub async fn find_one_query(&self, query: &StoreQuery) -> Result<Option<T>> {
        let mut items = self
            .query_items("find_one_query", query, Some(1), true)
            .await?;
        Ok(items.drain(..).next())
    }

    /// Saves the entity, inserting or replacing as needed.
    pub async fn save(&self, entity: T) -> Result<T> {
        self.write_item("save", entity, WriteMode::Upsert).await
    }

    /// Inserts the entity; fails with a conflict if the id already exists.
    pub async fn create(&self, entity: T) -> Result<T> {
        self.write_item("create", entity, WriteMode::Insert).await
    }

    /// Updates the entity in the store.
    pub async fn update(&self, entity: T) -> Result<T> {
        self.write_item("update", entity, WriteMode::Upsert).await
    }

    /// Deletes the entity, resolving its id and partition key.
    pub async fn delete(&self, entity: &T) -> Result<()> {
        let partition_key = self.resolver.partition_key(entity)?;
        let id = self.resolver.entity_key(entity)?;
        self.delete_by_id(&id, Some(partition_key)).await
    }

    /// Deletes an entity by id. The partition key defaults to the id.
    pub async fn delete_by_id(&self, id: &str, partition_key: Option<PartitionKey>) -> Result<()> {
        if id.is_empty() {
            return Err(RepositoryError::InvalidArgument(
                "id must not be empty".to_string(),
            ));
        }

        let container = self.container().await?;
        let partition_key = partition_key.unwrap_or_else(|| PartitionKey::from(id));

        let response = container.delete_item(id, &partition_key).await?;
        self.log_response("delete", &response.meta);
        Ok(())
    }

    /// The container handle, provisioning it on first use.
    async fn container(&self) -> Result<Arc<dyn StoreContainer>> {
        self.container
            .get_or_init(|| async {
                let database = self.factory.database().await?;

                debug!(container = %self.container_spec.name, "initializing container");

                database
                    .create_container_if_not_exists(&self.container_spec)
                    .await
            })
            .await
    }

    async fn write_item(&self, operation: &'static str, mut entity: T, mode: WriteMode) -> Result<T> {
        (self.before_save)(&mut entity);

        let partition_key = self.resolver.partition_key(&entity)?;
        let options = self.item_options();
        let container = self.container().await?;

        let document = serde_json::to_value(&entity)?;
        let response = match mode {
            WriteMode::Insert => {
                container
                    .create_item(document, &partition_key, &options)
                    .await?
            }
            WriteMode::Upsert => {
                container
                    .upsert_item(document, &partition_key, &options)
                    .await?
            }
        };
        self.log_response(operation, &response.meta);

        let result = match response.document {
            Some(document) if options.enable_content_response => serde_json::from_value(document)?,
            _ => entity,
        };

        (self.after_save)(&result);
        Ok(result)
    }

    async fn query_items(
        &self,
        operation: &'static str,
        query: &StoreQuery,
        max_item_count: Option<i32>,
        single_page: bool,
    ) -> Result<Vec<T>> {
        let container = self.container().await?;

        let mut items = Vec::new();
        let mut continuation = None;

        loop {
            let options = QueryOptions {
                max_item_count,
                continuation: continuation.take(),
            };

            let page = container.query_page(query, &options).await?;
            self.log_response(operation, &page.meta);

            for document in page.documents {
                items.push(serde_json::from_value(document)?);
            }

            match page.continuation {
                Some(token) if !single_page => continuation = Some(token),
                _ => break,
            }
        }

        Ok(items)
    }

    fn item_options(&self) -> ItemOptions {
        ItemOptions {
            enable_content_response: !self.factory.options().optimize_bandwidth,
        }
    }

    fn log_response(&self, operation: &str, meta: &ResponseMeta) {
        if !enabled!(Level::DEBUG) {
            return;
        }

        debug!(
            operation,
            status = meta.status,
            charge = meta.request_charge,
            elapsed_ms = meta.elapsed.as_millis() as u64,
            "store response"
        );
    }
}

/// Default before-save behavior: a self-describing entity with an empty id
/// receives a freshly generated one.
fn default_before_save<T: EntityModel>(entity: &mut T) {
    if let Some(document) = T::document_accessors() {
        if (document.id)(entity).is_empty() {
            (document.set_id)(entity, new_entity_id());
        }
    }
}
