use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use docrepo::{
    ClientOptions, DocumentFactory, Entity, LazyShared, MemoryStore, Repository, RepositoryError,
    RepositoryOptions, StoreClient, StoreConnector,
};
use serde::{Deserialize, Serialize};

#[derive(Entity, Serialize, Deserialize, Clone)]
struct Widget {
    id: String,
    name: String,
}

#[tokio::test]
async fn fifty_concurrent_callers_share_one_initialization() {
    let cell: Arc<LazyShared<u64>> = Arc::new(LazyShared::new());
    let runs = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..50 {
        let cell = cell.clone();
        let runs = runs.clone();
        handles.push(tokio::spawn(async move {
            cell.get_or_init(|| async {
                runs.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(7)
            })
            .await
        }));
    }

    for handle in futures::future::join_all(handles).await {
        assert_eq!(handle.unwrap().unwrap(), 7);
    }
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

struct FlakyConnector {
    attempts: AtomicUsize,
}

#[async_trait]
impl StoreConnector for FlakyConnector {
    async fn connect(
        &self,
        _connection_string: &str,
        _options: &ClientOptions,
    ) -> docrepo::Result<Arc<dyn StoreClient>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(RepositoryError::Request {
            status: 503,
            message: "store unavailable".to_string(),
        })
    }
}

#[tokio::test]
async fn failed_client_initialization_replays_without_retry() {
    let connector = Arc::new(FlakyConnector {
        attempts: AtomicUsize::new(0),
    });
    let factory = DocumentFactory::new(
        RepositoryOptions::new("memory://flaky"),
        connector.clone(),
    )
    .unwrap();

    let first = factory.client().await.err().expect("connect fails");
    let second = factory.client().await.err().expect("connect fails");

    // The connector ran once; later callers observe the stored failure.
    assert_eq!(first, second);
    assert_eq!(connector.attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn concurrent_first_operations_provision_the_container_once() {
    let store = MemoryStore::new();
    let factory = Arc::new(
        DocumentFactory::new(
            RepositoryOptions::new("memory://local"),
            Arc::new(store.clone()),
        )
        .unwrap(),
    );
    let repository: Arc<Repository<Widget>> = Arc::new(Repository::new(factory).unwrap());

    let mut handles = Vec::new();
    for index in 0..50 {
        let repository = repository.clone();
        handles.push(tokio::spawn(async move {
            repository.find(&format!("missing-{index}"), None).await
        }));
    }

    for handle in futures::future::join_all(handles).await {
        assert!(handle.unwrap().unwrap().is_none());
    }

    let database = store.database("database").expect("database provisioned");
    assert_eq!(database.provision_calls(), 1);
    assert!(database.container("Widget").is_some());
}
