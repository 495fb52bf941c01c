//! Named counters kept in an external key-value store.
pub mod mem;
pub mod redis;

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRef;
use serde::Deserialize;
use thiserror::Error;

use crate::AppState;

/// Errors raised while talking to the key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key-value store unavailable: {0}")]
    Unavailable(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("stored value `{0}` is not an integer")]
    NotAnInteger(String),
}

impl StoreError {
    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::Unavailable(_) => "unavailable",
            StoreError::NotAnInteger(_) => "not_an_integer",
        }
    }
}

impl From<::redis::RedisError> for StoreError {
    fn from(err: ::redis::RedisError) -> Self {
        StoreError::Unavailable(Box::new(err))
    }
}

/// Backend selection.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Redis,
    Memory,
}

/// Minimal get/set surface of a key-value store, without expiry.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Fetch a value, `None` if the key was never set.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store a value with no expiry.
    async fn set(&self, key: &str, value: String) -> Result<(), StoreError>;
}

/// Client exposing counter semantics on top of a [`CounterStore`].
#[derive(Clone)]
pub struct Counter {
    store: Arc<dyn CounterStore>,
}

impl Counter {
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self { store }
    }

    /// Increment the counter stored under `key`, creating it with `1` when
    /// absent.
    ///
    /// The fetch and the store are two separate round trips: two callers
    /// racing on the same key can both read `n` and both write `n + 1`.
    pub async fn increment_or_init(&self, key: &str) -> Result<(), StoreError> {
        let value = match self.read(key).await? {
            None => 1,
            Some(current) => current
                .parse::<i64>()
                .ok()
                .and_then(|n| n.checked_add(1))
                .ok_or(StoreError::NotAnInteger(current))?,
        };

        self.store.set(key, value.to_string()).await?;
        tracing::debug!(%key, %value, "counter updated");

        Ok(())
    }

    /// Current raw value of `key`. An empty stored string counts as absent.
    pub async fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .store
            .get(key)
            .await?
            .filter(|value| !value.is_empty()))
    }
}

impl FromRef<AppState> for Counter {
    fn from_ref(app_state: &AppState) -> Counter {
        app_state.counter.clone()
    }
}

/// Store that refuses every call, as a stopped Redis would.
#[cfg(test)]
pub(crate) struct UnreachableStore;

#[cfg(test)]
#[async_trait]
impl CounterStore for UnreachableStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Unavailable(Box::new(std::io::Error::from(
            std::io::ErrorKind::ConnectionRefused,
        ))))
    }

    async fn set(&self, _key: &str, _value: String) -> Result<(), StoreError> {
        Err(StoreError::Unavailable(Box::new(std::io::Error::from(
            std::io::ErrorKind::ConnectionRefused,
        ))))
    }
}
