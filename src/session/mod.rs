//! Per-user pending answers.
//!
//! The raw store is a plain string key-value service ([`KeyValueStore`]);
//! [`Sessions`] is the typed layer the controller talks to, and the only place
//! where a [`PendingAnswer`] is turned into a string and back.

use std::{fmt, sync::Arc};

use async_trait::async_trait;

use crate::error::QuizError;

pub mod memory;
pub mod redis_store;

/// Minimal contract of the external session store. No TTLs, no transactions.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, QuizError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), QuizError>;

    async fn delete(&self, key: &str) -> Result<(), QuizError>;
}

/// `"<platform>-quiz:<user id>:answer"`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn new(platform: &str, user_id: &str) -> Self {
        Self(format!("{platform}-quiz:{user_id}:answer"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The answer to the question a user was asked last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAnswer {
    answer: String,
}

impl PendingAnswer {
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
        }
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn into_answer(self) -> String {
        self.answer
    }
}

#[derive(Clone)]
pub struct Sessions {
    store: Arc<dyn KeyValueStore>,
}

impl Sessions {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn pending(&self, key: &SessionKey) -> Result<Option<PendingAnswer>, QuizError> {
        Ok(self.store.get(key.as_str()).await?.map(PendingAnswer::new))
    }

    /// Overwrites whatever was pending before.
    pub async fn set_pending(
        &self,
        key: &SessionKey,
        pending: &PendingAnswer,
    ) -> Result<(), QuizError> {
        self.store.set(key.as_str(), pending.answer()).await
    }

    pub async fn clear(&self, key: &SessionKey) -> Result<(), QuizError> {
        self.store.delete(key.as_str()).await
    }
}
