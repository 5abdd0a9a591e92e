use crate::core::{RepositoryError, Result};
use crate::entity::{DocumentAccessors, EntityModel};
use crate::keys::PartitionKey;
use crate::keys::accessor::KeyAccessor;
use crate::keys::cache::AccessorCache;

/// Resolves an entity instance's logical id and partition key.
///
/// Precedence, applied identically by every repository operation:
/// 1. the type's registered `DocumentEntity` capability;
/// 2. the cached compiled accessor for the role;
/// 3. for the partition key only, the resolved id.
///
/// A type with neither the capability nor a resolvable primary key property
/// is a structural error, reported as [`RepositoryError::Unsupported`].
pub struct KeyResolver<T: EntityModel> {
    primary: Option<KeyAccessor<T>>,
    partition: Option<KeyAccessor<T>>,
    document: Option<DocumentAccessors<T>>,
}

impl<T> KeyResolver<T>
where
    T: EntityModel + 'static,
{
    /// Builds a resolver backed by the given accessor cache.
    ///
    /// Accessors are shared: resolvers built from the same cache hold the
    /// same compiled functions.
    pub fn from_cache(cache: &AccessorCache) -> Self {
        Self {
            primary: cache.primary_key_accessor::<T>(),
            partition: cache.partition_key_accessor::<T>(),
            document: T::document_accessors(),
        }
    }

    /// The entity's logical id.
    pub fn entity_key(&self, entity: &T) -> Result<String> {
        if let Some(document) = &self.document {
            return Ok((document.id)(entity));
        }

        match &self.primary {
            Some(accessor) => Ok(accessor(entity)),
            None => Err(RepositoryError::Unsupported(format!(
                "no entity key for type '{}': implement DocumentEntity or add an 'id' property",
                T::type_name()
            ))),
        }
    }

    /// The entity's partition key.
    pub fn partition_key(&self, entity: &T) -> Result<PartitionKey> {
        if let Some(document) = &self.document {
            return Ok((document.partition_key)(entity));
        }

        if let Some(accessor) = &self.partition {
            return Ok(PartitionKey::from(accessor(entity)));
        }

        Ok(PartitionKey::from(self.entity_key(entity)?))
    }

    /// The capability table, when the type registered one.
    pub fn document_accessors(&self) -> Option<&DocumentAccessors<T>> {
        self.document.as_ref()
    }
}

impl<T: EntityModel> Clone for KeyResolver<T> {
    fn clone(&self) -> Self {
        Self {
            primary: self.primary.clone(),
            partition: self.partition.clone(),
            document: self.document,
        }
    }
}
