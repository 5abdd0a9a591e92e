pub mod document;
pub mod key_value;
pub mod model;
pub mod object_id;

pub use document::{DocumentEntity, DocumentFields, new_entity_id};
pub use key_value::{AsKeyValue, KeyValue};
pub use model::{ContainerMeta, DocumentAccessors, EntityModel, Property};
pub use object_id::ObjectId;
