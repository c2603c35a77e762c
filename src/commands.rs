use std::sync::Arc;

use teloxide::{prelude::Requester, types::Message, utils::command::BotCommands, Bot};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::{
    controller::{Intent, QuizController},
    platform::{
        respond,
        telegram::{TelegramAdapter, TelegramUser},
    },
    HandlerResult,
};

#[derive(Debug, Clone, BotCommands)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    #[command(description = "display help.")]
    Help,
    #[command(description = "start the quiz")]
    Start,
}

pub(crate) async fn help(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, Command::descriptions().to_string())
        .await?;
    Ok(())
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
pub(crate) async fn start(bot: Bot, msg: Message, quiz: Arc<QuizController>) -> HandlerResult {
    let Some(user) = TelegramUser::sender_of(&msg) else {
        debug!("Ignoring /start without a sender");
        return Ok(());
    };

    respond(&TelegramAdapter::new(bot), &quiz, user, Intent::Start).await
}
