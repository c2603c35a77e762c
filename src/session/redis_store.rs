use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands};
use tracing::{debug, info};

use super::KeyValueStore;
use crate::error::QuizError;

/// Redis-backed session store. Every failure surfaces as
/// [`QuizError::SessionStoreUnavailable`].
#[derive(Clone)]
pub struct RedisStore {
    connection: MultiplexedConnection,
}

impl RedisStore {
    pub async fn connect(url: &str) -> Result<Self, QuizError> {
        let client = redis::Client::open(url).map_err(QuizError::session_store)?;
        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(QuizError::session_store)?;
        info!("Connected to Redis session store");
        Ok(Self { connection })
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, QuizError> {
        let mut connection = self.connection.clone();
        connection
            .get::<_, Option<String>>(key)
            .await
            .map_err(QuizError::session_store)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), QuizError> {
        debug!("SET {key}");
        let mut connection = self.connection.clone();
        connection
            .set::<_, _, ()>(key, value)
            .await
            .map_err(QuizError::session_store)
    }

    async fn delete(&self, key: &str) -> Result<(), QuizError> {
        debug!("DEL {key}");
        let mut connection = self.connection.clone();
        connection
            .del::<_, ()>(key)
            .await
            .map_err(QuizError::session_store)
    }
}
