// ============================================================================
// docrepo Library
// ============================================================================

pub mod client;
pub mod container;
pub mod core;
pub mod entity;
pub mod keys;
pub mod lazy;
pub mod query;

mod factory;
mod repository;

// Re-export main types for convenience
pub use crate::core::{
    ClientOptions, DEFAULT_DATABASE_ID, RepositoryError, RepositoryOptions, Result,
};

pub use crate::container::{ContainerSpec, resolve_container_spec};
pub use crate::entity::{
    AsKeyValue, ContainerMeta, DocumentAccessors, DocumentEntity, DocumentFields, EntityModel,
    KeyValue, ObjectId, Property, new_entity_id,
};
pub use crate::keys::{AccessorCache, KeyAccessor, KeyResolver, PartitionKey};
pub use crate::lazy::LazyShared;
pub use crate::query::{
    CompareOp, Criteria, FieldCriteria, FilterNode, QueryOptions, QueryParameter, StoreQuery,
};

// Store client surface
pub use crate::client::memory::MemoryStore;
pub use crate::client::{
    ItemOptions, ItemResponse, QueryPage, ResponseMeta, StoreClient, StoreConnector,
    StoreContainer, StoreDatabase,
};

pub use crate::factory::DocumentFactory;
pub use crate::repository::{AfterSaveHook, BeforeSaveHook, Repository};

// Derive macro for entity metadata
pub use docrepo_derive::Entity;
