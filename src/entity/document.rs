use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::keys::PartitionKey;

/// The self-describing entity capability.
///
/// A type implementing this trait reports its own id and partition key,
/// which always wins over marker attributes and naming conventions. Register
/// the implementation with the resolution engine via `#[entity(document)]`
/// on the `Entity` derive.
pub trait DocumentEntity {
    /// The entity's identifier. Empty means not yet assigned.
    fn document_id(&self) -> &str;

    /// Assigns the entity's identifier. Called by the default before-save
    /// hook when the id is empty.
    fn set_document_id(&mut self, id: String);

    /// The entity's partition key. Defaults to the id.
    fn partition_key(&self) -> PartitionKey {
        PartitionKey::from(self.document_id())
    }
}

/// Generates a new unique entity id (32 lowercase hex characters).
pub fn new_entity_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Common document bookkeeping fields, intended to be embedded with
/// `#[serde(flatten)]`.
///
/// `etag` and `updated` map onto the store's system properties and are
/// populated from read responses; `updated` is carried as unix seconds on
/// the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentFields {
    pub id: String,

    #[serde(rename = "ttl", default, skip_serializing_if = "Option::is_none")]
    pub time_to_live: Option<i64>,

    #[serde(rename = "_etag", default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,

    pub created: DateTime<Utc>,

    #[serde(
        rename = "_ts",
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_seconds_option"
    )]
    pub updated: Option<DateTime<Utc>>,
}

impl Default for DocumentFields {
    fn default() -> Self {
        Self {
            id: new_entity_id(),
            time_to_live: None,
            etag: None,
            created: Utc::now(),
            updated: None,
        }
    }
}
