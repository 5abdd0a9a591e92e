use crate::entity::document::DocumentEntity;
use crate::entity::key_value::KeyValue;
use crate::keys::PartitionKey;

/// Declarative metadata for one entity property.
///
/// Produced by `#[derive(Entity)]`; only key candidate properties carry an
/// extraction function.
pub struct Property<T> {
    /// Declared field name.
    pub name: &'static str,
    /// Name of the field as it appears in the serialized document.
    pub serialized_name: &'static str,
    /// Whether the field carries the partition key marker.
    pub partition_key: bool,
    /// Typed extraction function, present for key candidate fields.
    pub getter: Option<fn(&T) -> KeyValue>,
}

impl<T> Clone for Property<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Property<T> {}

/// Explicit per-type container metadata declared with `#[container(...)]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerMeta {
    pub name: &'static str,
    pub partition_key_path: Option<&'static str>,
}

/// Function table bridging a [`DocumentEntity`] implementation into the
/// runtime resolution engine.
pub struct DocumentAccessors<T> {
    pub id: fn(&T) -> String,
    pub set_id: fn(&mut T, String),
    pub partition_key: fn(&T) -> PartitionKey,
}

impl<T: DocumentEntity> DocumentAccessors<T> {
    /// Builds the accessor table from the type's `DocumentEntity`
    /// implementation.
    pub fn resolve() -> Self {
        Self {
            id: |entity| entity.document_id().to_string(),
            set_id: |entity, id| entity.set_document_id(id),
            partition_key: |entity| entity.partition_key(),
        }
    }
}

impl<T> Clone for DocumentAccessors<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for DocumentAccessors<T> {}

/// Static metadata describing an entity type to the resolution engine.
///
/// Implementations are generated by `#[derive(Entity)]`; the trait can also
/// be implemented by hand when a type needs metadata the derive cannot
/// express.
pub trait EntityModel: Sized {
    /// The entity type's name, used as the conventional container name.
    fn type_name() -> &'static str;

    /// Declared properties in declaration order.
    fn properties() -> Vec<Property<Self>>;

    /// Explicit container metadata, if declared.
    fn container() -> Option<ContainerMeta> {
        None
    }

    /// The self-describing capability table, when the type registers its
    /// `DocumentEntity` implementation. Always takes precedence over marker
    /// and convention based resolution.
    fn document_accessors() -> Option<DocumentAccessors<Self>> {
        None
    }
}
