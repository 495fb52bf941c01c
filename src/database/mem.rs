//! In-process store, handy to run the demo without Redis.
use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CounterStore, StoreError};

/// Values live as long as the process. Nothing ever expires.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

#[async_trait]
impl CounterStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.values.write().await.insert(key.to_owned(), value);
        Ok(())
    }
}
