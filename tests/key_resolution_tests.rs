use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use docrepo::{AccessorCache, DocumentEntity, Entity, KeyResolver, PartitionKey, RepositoryError};
use serde::{Deserialize, Serialize};

#[derive(Entity, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
struct Comment {
    id: String,
    name: String,
    #[partition_key]
    owner_id: String,
}

#[derive(Entity, Serialize, Deserialize)]
struct Meter {
    id: String,
    #[partition_key]
    reading: i64,
}

#[derive(Entity, Serialize, Deserialize)]
struct Entry {
    id: String,
    #[partition_key]
    entry_date: DateTime<Utc>,
}

// The capability deliberately disagrees with the marker so precedence is
// observable.
#[derive(Entity, Serialize, Deserialize)]
#[entity(document)]
struct Account {
    id: String,
    #[partition_key]
    region: String,
}

impl DocumentEntity for Account {
    fn document_id(&self) -> &str {
        &self.id
    }

    fn set_document_id(&mut self, id: String) {
        self.id = id;
    }

    fn partition_key(&self) -> PartitionKey {
        PartitionKey::from(format!("acct:{}", self.region))
    }
}

#[derive(Entity, Serialize, Deserialize)]
struct Role {
    id: String,
    name: String,
}

#[derive(Entity, Serialize, Deserialize)]
struct UserProfile {
    user_profile_id: String,
    display_name: String,
}

#[derive(Entity, Serialize, Deserialize)]
struct Setting {
    key: String,
    value: String,
}

#[derive(Entity, Serialize, Deserialize)]
struct Orphan {
    label: String,
}

#[test]
fn self_description_wins_over_marker_and_convention() {
    let resolver = KeyResolver::<Account>::from_cache(&AccessorCache::new());
    let account = Account {
        id: "a-1".to_string(),
        region: "eu".to_string(),
    };

    assert_eq!(resolver.entity_key(&account).unwrap(), "a-1");
    assert_eq!(
        resolver.partition_key(&account).unwrap(),
        PartitionKey::from("acct:eu")
    );
}

#[test]
fn marked_string_property_becomes_the_partition_key() {
    let resolver = KeyResolver::<Comment>::from_cache(&AccessorCache::new());
    let comment = Comment {
        id: "c-1".to_string(),
        name: "first".to_string(),
        owner_id: "owner-42".to_string(),
    };

    assert_eq!(resolver.entity_key(&comment).unwrap(), "c-1");
    assert_eq!(
        resolver.partition_key(&comment).unwrap(),
        PartitionKey::from("owner-42")
    );
}

#[test]
fn marked_integer_property_converts_to_its_display_form() {
    let resolver = KeyResolver::<Meter>::from_cache(&AccessorCache::new());
    let meter = Meter {
        id: "m-1".to_string(),
        reading: 118,
    };

    assert_eq!(
        resolver.partition_key(&meter).unwrap(),
        PartitionKey::from("118")
    );
}

#[test]
fn marked_timestamp_property_converts_to_its_display_form() {
    let resolver = KeyResolver::<Entry>::from_cache(&AccessorCache::new());
    let entry = Entry {
        id: "e-1".to_string(),
        entry_date: Utc.with_ymd_and_hms(2023, 4, 5, 6, 7, 8).unwrap(),
    };

    assert_eq!(
        resolver.partition_key(&entry).unwrap(),
        PartitionKey::from("2023-04-05T06:07:08+00:00")
    );
}

#[test]
fn unmarked_types_fall_back_to_the_id() {
    let resolver = KeyResolver::<Role>::from_cache(&AccessorCache::new());
    let role = Role {
        id: "abc123".to_string(),
        name: "admin".to_string(),
    };

    assert_eq!(resolver.entity_key(&role).unwrap(), "abc123");
    assert_eq!(
        resolver.partition_key(&role).unwrap(),
        PartitionKey::from("abc123")
    );
}

#[test]
fn type_named_id_property_is_a_primary_key_candidate() {
    let resolver = KeyResolver::<UserProfile>::from_cache(&AccessorCache::new());
    let profile = UserProfile {
        user_profile_id: "u-9".to_string(),
        display_name: "Sam".to_string(),
    };

    assert_eq!(resolver.entity_key(&profile).unwrap(), "u-9");
}

#[test]
fn key_named_property_is_a_primary_key_candidate() {
    let resolver = KeyResolver::<Setting>::from_cache(&AccessorCache::new());
    let setting = Setting {
        key: "retention".to_string(),
        value: "30d".to_string(),
    };

    assert_eq!(resolver.entity_key(&setting).unwrap(), "retention");
}

#[test]
fn unresolvable_types_fail_with_a_structural_error() {
    let resolver = KeyResolver::<Orphan>::from_cache(&AccessorCache::new());
    let orphan = Orphan {
        label: "stray".to_string(),
    };

    let err = resolver.entity_key(&orphan).unwrap_err();
    assert!(matches!(err, RepositoryError::Unsupported(_)));

    // The partition key fallback runs through the id, so it fails the same way.
    let err = resolver.partition_key(&orphan).unwrap_err();
    assert!(matches!(err, RepositoryError::Unsupported(_)));
}

#[test]
fn resolution_is_idempotent() {
    let resolver = KeyResolver::<Comment>::from_cache(&AccessorCache::new());
    let comment = Comment {
        id: "c-2".to_string(),
        name: "again".to_string(),
        owner_id: "owner-7".to_string(),
    };

    let first = (
        resolver.entity_key(&comment).unwrap(),
        resolver.partition_key(&comment).unwrap(),
    );
    let second = (
        resolver.entity_key(&comment).unwrap(),
        resolver.partition_key(&comment).unwrap(),
    );
    assert_eq!(first, second);
}

#[test]
fn cache_returns_the_same_compiled_accessor() {
    let cache = AccessorCache::new();

    let first = cache.primary_key_accessor::<Role>().unwrap();
    let second = cache.primary_key_accessor::<Role>().unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let first = cache.partition_key_accessor::<Comment>().unwrap();
    let second = cache.partition_key_accessor::<Comment>().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn missing_accessors_are_cached_without_error() {
    let cache = AccessorCache::new();

    assert!(cache.partition_key_accessor::<Role>().is_none());
    assert!(cache.partition_key_accessor::<Role>().is_none());
    assert!(cache.primary_key_accessor::<Orphan>().is_none());
    assert!(cache.primary_key_accessor::<Orphan>().is_none());
}

#[tokio::test]
async fn concurrent_first_access_compiles_one_accessor() {
    let cache = Arc::new(AccessorCache::new());

    let mut handles = Vec::new();
    for _ in 0..16 {
        let cache = cache.clone();
        handles.push(tokio::spawn(async move {
            cache.primary_key_accessor::<Role>().unwrap()
        }));
    }

    let accessors = futures::future::join_all(handles).await;
    let first = accessors[0].as_ref().unwrap();
    for accessor in &accessors {
        let accessor = accessor.as_ref().unwrap();
        assert!(Arc::ptr_eq(first, accessor));

        let role = Role {
            id: "r-1".to_string(),
            name: "x".to_string(),
        };
        assert_eq!(accessor(&role), "r-1");
    }
}
