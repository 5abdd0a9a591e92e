use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use lazy_static::lazy_static;

use crate::entity::EntityModel;
use crate::keys::accessor::{
    KeyAccessor, compile_partition_key_accessor, compile_primary_key_accessor,
};

type ErasedAccessor = std::sync::Arc<dyn Any + Send + Sync>;
type AccessorMap = RwLock<HashMap<TypeId, Option<ErasedAccessor>>>;

lazy_static! {
    static ref GLOBAL_ACCESSOR_CACHE: AccessorCache = AccessorCache::new();
}

/// Returns the process-wide accessor cache shared by all repositories.
pub fn global() -> &'static AccessorCache {
    &GLOBAL_ACCESSOR_CACHE
}

/// Memoizes compiled key accessors per entity type.
///
/// Metadata inspection and accessor compilation happen at most once per
/// (type, role); "no accessor" is itself a cached result. Compilation runs
/// under the write lock, so every caller observes the same compiled
/// function for the life of the cache.
///
/// Repositories use the [`global`] instance by default; tests that need
/// isolation can construct their own and pass it through
/// `Repository::with_accessor_cache`.
pub struct AccessorCache {
    primary: AccessorMap,
    partition: AccessorMap,
}

impl AccessorCache {
    pub fn new() -> Self {
        Self {
            primary: RwLock::new(HashMap::new()),
            partition: RwLock::new(HashMap::new()),
        }
    }

    /// The compiled primary key accessor for `T`, if the type has one.
    pub fn primary_key_accessor<T>(&self) -> Option<KeyAccessor<T>>
    where
        T: EntityModel + 'static,
    {
        Self::resolve(&self.primary, compile_primary_key_accessor::<T>)
    }

    /// The compiled partition key accessor for `T`, if the type has one.
    pub fn partition_key_accessor<T>(&self) -> Option<KeyAccessor<T>>
    where
        T: EntityModel + 'static,
    {
        Self::resolve(&self.partition, compile_partition_key_accessor::<T>)
    }

    fn resolve<T: 'static>(
        map: &AccessorMap,
        compile: fn() -> Option<KeyAccessor<T>>,
    ) -> Option<KeyAccessor<T>> {
        let key = TypeId::of::<T>();

        {
            let read = map.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(entry) = read.get(&key) {
                return entry.as_ref().and_then(Self::downcast::<T>);
            }
        }

        let mut write = map.write().unwrap_or_else(PoisonError::into_inner);
        let entry = write
            .entry(key)
            .or_insert_with(|| compile().map(|accessor| {
                std::sync::Arc::new(accessor) as ErasedAccessor
            }));
        entry.as_ref().and_then(Self::downcast::<T>)
    }

    fn downcast<T: 'static>(erased: &ErasedAccessor) -> Option<KeyAccessor<T>> {
        erased.downcast_ref::<KeyAccessor<T>>().cloned()
    }
}

impl Default for AccessorCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{AsKeyValue, Property};
    use std::sync::Arc;

    struct Ticket {
        id: String,
    }

    impl EntityModel for Ticket {
        fn type_name() -> &'static str {
            "Ticket"
        }

        fn properties() -> Vec<Property<Self>> {
            vec![Property {
                name: "id",
                serialized_name: "id",
                partition_key: false,
                getter: Some(|e: &Self| e.id.as_key_value()),
            }]
        }
    }

    struct Blank;

    impl EntityModel for Blank {
        fn type_name() -> &'static str {
            "Blank"
        }

        fn properties() -> Vec<Property<Self>> {
            Vec::new()
        }
    }

    #[test]
    fn repeated_lookups_share_one_compiled_accessor() {
        let cache = AccessorCache::new();
        let first = cache.primary_key_accessor::<Ticket>().unwrap();
        let second = cache.primary_key_accessor::<Ticket>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn absence_is_cached_without_error() {
        let cache = AccessorCache::new();
        assert!(cache.primary_key_accessor::<Blank>().is_none());
        assert!(cache.primary_key_accessor::<Blank>().is_none());
        assert!(cache.partition_key_accessor::<Blank>().is_none());
    }
}
