use crate::core::{RepositoryError, Result};
use crate::entity::EntityModel;

/// The resolved container descriptor used when provisioning the container
/// for an entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    pub partition_key_path: String,
}

/// Resolves the container name and partition key path for `T`.
///
/// Name: explicit `#[container(name = "...")]` metadata, otherwise the type
/// name. Path: explicit metadata path (must start with `/`), otherwise the
/// serialized name of the partition key property, otherwise `/id`.
///
/// Resolution feeds container provisioning and runs once per repository
/// instance, never per operation.
pub fn resolve_container_spec<T: EntityModel>() -> Result<ContainerSpec> {
    let meta = T::container();

    let name = meta
        .map(|m| m.name.to_string())
        .unwrap_or_else(|| T::type_name().to_string());

    let partition_key_path = match meta.and_then(|m| m.partition_key_path) {
        Some(path) => {
            if !path.starts_with('/') {
                return Err(RepositoryError::Configuration(format!(
                    "partition key path must start with '/': {path}"
                )));
            }
            path.to_string()
        }
        None => match T::properties().iter().find(|p| p.partition_key) {
            Some(property) => format!("/{}", property.serialized_name),
            None => "/id".to_string(),
        },
    };

    Ok(ContainerSpec {
        name,
        partition_key_path,
    })
}
