use std::sync::Arc;

use crate::entity::EntityModel;

/// A compiled key extraction function for one property of one type.
///
/// Invoking an accessor is a plain typed call; all metadata inspection
/// happens once, when the accessor is compiled.
pub type KeyAccessor<T> = Arc<dyn Fn(&T) -> String + Send + Sync>;

/// Compiles the partition key accessor for `T`.
///
/// Scans declared properties for the one carrying the partition key marker.
/// Returns `None` when no marked property exists or the marked property has
/// no extraction function; the caller falls back to the identity key.
pub(crate) fn compile_partition_key_accessor<T: EntityModel + 'static>() -> Option<KeyAccessor<T>> {
    let property = T::properties().into_iter().find(|p| p.partition_key)?;
    let getter = property.getter?;
    Some(Arc::new(move |entity: &T| getter(entity).into_key_string()))
}

/// Compiles the primary key accessor for `T`.
///
/// Selects the first declared property named `id`, `key`, or
/// `<type_name>_id`. Returns `None` when no candidate exists.
pub(crate) fn compile_primary_key_accessor<T: EntityModel + 'static>() -> Option<KeyAccessor<T>> {
    let type_candidate = format!("{}_id", to_snake_case(T::type_name()));

    let property = T::properties().into_iter().find(|p| {
        p.name == "id" || p.name == "key" || p.name == type_candidate
    })?;
    let getter = property.getter?;
    Some(Arc::new(move |entity: &T| getter(entity).into_key_string()))
}

fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for (index, ch) in name.chars().enumerate() {
        if ch.is_uppercase() {
            if index > 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{AsKeyValue, Property};

    struct Gauge {
        serial: String,
        reading: i64,
    }

    impl EntityModel for Gauge {
        fn type_name() -> &'static str {
            "Gauge"
        }

        fn properties() -> Vec<Property<Self>> {
            vec![
                Property {
                    name: "serial",
                    serialized_name: "serial",
                    partition_key: false,
                    getter: Some(|e: &Self| e.serial.as_key_value()),
                },
                Property {
                    name: "reading",
                    serialized_name: "reading",
                    partition_key: true,
                    getter: Some(|e: &Self| e.reading.as_key_value()),
                },
            ]
        }
    }

    #[test]
    fn partition_accessor_extracts_marked_property() {
        let accessor = compile_partition_key_accessor::<Gauge>().unwrap();
        let gauge = Gauge {
            serial: "g-1".to_string(),
            reading: 118,
        };
        assert_eq!(accessor(&gauge), "118");
    }

    #[test]
    fn primary_accessor_is_absent_without_candidates() {
        assert!(compile_primary_key_accessor::<Gauge>().is_none());
    }

    #[test]
    fn snake_case_conversion() {
        assert_eq!(to_snake_case("UserProfile"), "user_profile");
        assert_eq!(to_snake_case("Item"), "item");
    }
}
