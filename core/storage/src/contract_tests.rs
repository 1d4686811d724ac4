//! Behaviour every built-in provider must share.

use std::sync::Arc;
use tempfile::TempDir;

use crate::local::LocalStorage;
use crate::memory::MemoryStorage;
use crate::provider::StorageOps;
use invest_common::{Error, StorageKey};

fn key(s: &str) -> StorageKey {
    StorageKey::parse(s).unwrap()
}

/// One instance of each built-in provider; the TempDir keeps `local` alive.
fn providers() -> (TempDir, Vec<Arc<dyn StorageOps>>) {
    let temp = TempDir::new().unwrap();
    let local = LocalStorage::new(temp.path()).unwrap();
    (temp, vec![Arc::new(MemoryStorage::new()), Arc::new(local)])
}

#[tokio::test]
async fn test_put_overwrites_existing_key() {
    let (_temp, providers) = providers();
    for storage in providers {
        storage.put(&key("/quotes/AAPL"), vec![1]).await.unwrap();
        let info = storage.put(&key("/quotes/AAPL"), vec![2, 3]).await.unwrap();

        assert_eq!(info.size, 2, "{}", storage.name());
        assert_eq!(storage.get(&key("/quotes/AAPL")).await.unwrap(), vec![2, 3]);
    }
}

#[tokio::test]
async fn test_key_cannot_nest_under_object() {
    let (_temp, providers) = providers();
    for storage in providers {
        storage.put(&key("/a"), vec![1]).await.unwrap();

        let result = storage.put(&key("/a/b"), vec![2]).await;
        match result {
            Err(Error::InvalidInput(msg)) => assert!(msg.contains("/a"), "{}", storage.name()),
            other => panic!("{}: expected InvalidInput, got {:?}", storage.name(), other),
        }
        assert_eq!(storage.get(&key("/a")).await.unwrap(), vec![1]);
    }
}

#[tokio::test]
async fn test_key_cannot_shadow_nested_objects() {
    let (_temp, providers) = providers();
    for storage in providers {
        storage.put(&key("/a/b/c"), vec![1]).await.unwrap();

        let result = storage.put(&key("/a"), vec![2]).await;
        match result {
            Err(Error::InvalidInput(msg)) => {
                assert!(msg.contains("/a/b/c"), "{}: {}", storage.name(), msg)
            }
            other => panic!("{}: expected InvalidInput, got {:?}", storage.name(), other),
        }
        assert!(!storage.exists(&key("/a")).await.unwrap());
    }
}

#[tokio::test]
async fn test_sibling_keys_with_shared_text_prefix() {
    let (_temp, providers) = providers();
    for storage in providers {
        storage.put(&key("/a"), vec![1]).await.unwrap();
        storage.put(&key("/ab/c"), vec![2]).await.unwrap();

        let listed: Vec<String> = storage
            .list(None)
            .await
            .unwrap()
            .into_iter()
            .map(|info| info.key.to_string())
            .collect();
        assert_eq!(listed, vec!["/a", "/ab/c"], "{}", storage.name());
    }
}

#[tokio::test]
async fn test_key_reusable_after_delete() {
    let (_temp, providers) = providers();
    for storage in providers {
        storage.put(&key("/a/b"), vec![1]).await.unwrap();
        storage.delete(&key("/a/b")).await.unwrap();

        storage.put(&key("/a"), vec![2]).await.unwrap();
        assert_eq!(storage.get(&key("/a")).await.unwrap(), vec![2], "{}", storage.name());
        assert!(matches!(
            storage.get(&key("/a/b")).await,
            Err(Error::NotFound(_))
        ));
    }
}
