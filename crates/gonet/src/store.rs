use gonet_store::{FileStore, KeyValueStore, MemoryStore, StoreError};

/// The storage backend picked by configuration.
///
/// Lets the hosting app choose memory or file storage from a config file
/// while keeping a single concrete store type.
#[derive(Debug, Clone)]
pub enum StoreBackend {
    Memory(MemoryStore),
    File(FileStore),
}

impl KeyValueStore for StoreBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        match self {
            Self::Memory(store) => store.get(key).await,
            Self::File(store) => store.get(key).await,
        }
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        match self {
            Self::Memory(store) => store.put(key, value).await,
            Self::File(store) => store.put(key, value).await,
        }
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        match self {
            Self::Memory(store) => store.remove(key).await,
            Self::File(store) => store.remove(key).await,
        }
    }
}
