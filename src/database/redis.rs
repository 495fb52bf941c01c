//! Redis backend.
use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tokio::sync::OnceCell;

use super::{CounterStore, StoreError};

/// Redis connection opened on first use.
///
/// The service must start, and answer `/health`, while Redis is down, so
/// nothing is dialed at construction. A failed attempt is retried on the
/// next call.
pub struct RedisStore {
    address: String,
    manager: OnceCell<ConnectionManager>,
}

impl RedisStore {
    /// `address` is a `host:port` pair, e.g. `127.0.0.1:6379`.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            manager: OnceCell::new(),
        }
    }

    fn url(&self) -> String {
        format!("redis://{}/", self.address)
    }

    async fn connection(&self) -> Result<ConnectionManager, StoreError> {
        let manager = self
            .manager
            .get_or_try_init(|| async {
                let client = redis::Client::open(self.url())?;
                let manager = ConnectionManager::new(client).await?;
                tracing::info!(address = %self.address, "redis connected");

                Ok::<_, redis::RedisError>(manager)
            })
            .await
            .inspect_err(|err| {
                tracing::error!(address = %self.address, error = %err, "cannot connect to redis")
            })?;

        Ok(manager.clone())
    }
}

#[async_trait]
impl CounterStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.connection().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        conn.set::<_, _, ()>(key, value).await?;
        Ok(())
    }
}
