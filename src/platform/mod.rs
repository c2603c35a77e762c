//! Chat platform adapters. Each adapter turns platform events into
//! [`Intent`]s and renders [`Reply`]s; the quiz logic itself lives in
//! [`QuizController`] and is shared by all of them.

use std::{error::Error, fmt::Display};

use async_trait::async_trait;
use tracing::error;

use crate::controller::{Intent, QuizController, Reply, APOLOGY};

pub mod telegram;
pub mod vk;

pub type AdapterError = Box<dyn Error + Send + Sync + 'static>;

#[async_trait]
pub trait ChatAdapter: Send + Sync {
    /// Session namespace prefix, e.g. `tg` for `tg-quiz:<user>:answer`.
    const PLATFORM: &'static str;

    type UserId: Display + Copy + Send + Sync;

    fn map_intent(&self, text: &str) -> Intent {
        Intent::from_text(text)
    }

    async fn send_reply(&self, user_id: Self::UserId, reply: &Reply) -> Result<(), AdapterError>;
}

/// Runs one inbound message through the controller and sends the result.
///
/// Controller failures never escape: they are logged with the user id and
/// answered with an apology, leaving the session as it was. Only a failure to
/// deliver the reply is returned.
pub async fn respond<A: ChatAdapter>(
    adapter: &A,
    quiz: &QuizController,
    user_id: A::UserId,
    intent: Intent,
) -> Result<(), AdapterError> {
    let reply = match quiz.handle(&user_id.to_string(), intent).await {
        Ok(reply) => reply,
        Err(e) => {
            error!(
                platform = A::PLATFORM,
                "Failed to handle message from {user_id}: {e}"
            );
            Reply::text(APOLOGY)
        }
    };

    adapter.send_reply(user_id, &reply).await
}
