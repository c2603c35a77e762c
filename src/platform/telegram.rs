use std::{fmt, sync::Arc};

use async_trait::async_trait;
use teloxide::{
    dispatching::{UpdateFilterExt, UpdateHandler},
    dptree,
    error_handlers::LoggingErrorHandler,
    payloads::SendMessageSetters,
    prelude::{Dispatcher, Requester},
    types::{ChatId, Message, Update},
    update_listeners::webhooks::{self, Options},
    Bot,
};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::{respond, AdapterError, ChatAdapter};
use crate::{
    commands::{help, start, Command},
    config::TelegramConfig,
    controller::{QuizController, Reply},
    keyboard::quiz_keyboard,
    HandlerResult,
};

/// Sender of a message and the chat to answer in. Sessions are keyed by the
/// sender, so members of one group chat don't share a pending answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelegramUser {
    pub chat_id: i64,
    pub user_id: u64,
}

impl TelegramUser {
    /// `None` for messages without a sender, such as channel posts.
    pub fn sender_of(msg: &Message) -> Option<Self> {
        msg.from.as_ref().map(|user| Self {
            chat_id: msg.chat.id.0,
            user_id: user.id.0,
        })
    }
}

impl fmt::Display for TelegramUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_id)
    }
}

#[derive(Clone)]
pub struct TelegramAdapter {
    bot: Bot,
}

impl TelegramAdapter {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl ChatAdapter for TelegramAdapter {
    const PLATFORM: &'static str = "tg";
    type UserId = TelegramUser;

    async fn send_reply(&self, user: TelegramUser, reply: &Reply) -> Result<(), AdapterError> {
        let request = self.bot.send_message(ChatId(user.chat_id), reply.text.clone());
        if reply.show_keyboard {
            request.reply_markup(quiz_keyboard()).await?;
        } else {
            request.await?;
        }
        Ok(())
    }
}

pub fn schema() -> UpdateHandler<AdapterError> {
    use dptree::case;

    let command_handler = teloxide::filter_command::<Command, _>()
        .branch(case![Command::Help].endpoint(help))
        .branch(case![Command::Start].endpoint(start));

    Update::filter_message()
        .branch(command_handler)
        .endpoint(receive_text)
}

#[instrument(
    level = "info",
    skip(bot, msg, quiz),
    fields(
        event_id = %Uuid::new_v4(),
        chat_id = msg.chat.id.0,
        user_id = msg.from.as_ref().map(|user| user.id.0)
    )
)]
async fn receive_text(bot: Bot, msg: Message, quiz: Arc<QuizController>) -> HandlerResult {
    let (Some(text), Some(user)) = (msg.text(), TelegramUser::sender_of(&msg)) else {
        debug!("Ignoring a message without text or sender");
        return Ok(());
    };

    if text.starts_with('/') {
        warn!("Unrecognized command '{text}', treating it as an answer");
    }

    let adapter = TelegramAdapter::new(bot);
    let intent = adapter.map_intent(text);
    respond(&adapter, &quiz, user, intent).await
}

/// Serves Telegram updates until the dispatcher is stopped. Uses a webhook
/// when one is configured, long polling otherwise.
pub async fn run(config: TelegramConfig, quiz: Arc<QuizController>) -> Result<(), AdapterError> {
    let bot = Bot::new(config.token);
    info!("Starting Telegram bot...");

    let mut dispatcher = Dispatcher::builder(bot.clone(), schema())
        .dependencies(dptree::deps![quiz])
        .build();

    match config.webhook {
        Some(webhook) => {
            info!("Listening for Telegram webhooks on {}", webhook.addr);
            let listener = webhooks::axum(bot, Options::new(webhook.addr, webhook.url)).await?;
            dispatcher
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("An error from the webhook listener"),
                )
                .await;
        }
        None => dispatcher.dispatch().await,
    }

    Ok(())
}
