//! Telegram transport: long polling in, replies and chat actions out.
use std::sync::Arc;

use courier_core::Msg;
use courier_logging::{courier_debug, courier_info, courier_warn};
use teloxide::prelude::*;
use teloxide::types::ChatAction;

use super::effects::{ChatSink, EffectRunner};

pub struct TelegramSink {
    bot: Bot,
}

impl TelegramSink {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait::async_trait]
impl ChatSink for TelegramSink {
    async fn reply(&self, chat_id: i64, text: &str) {
        if let Err(err) = self.bot.send_message(ChatId(chat_id), text.to_string()).await {
            courier_warn!("Failed to send reply to chat {}: {}", chat_id, err);
        }
    }

    async fn typing(&self, chat_id: i64) {
        if let Err(err) = self
            .bot
            .send_chat_action(ChatId(chat_id), ChatAction::Typing)
            .await
        {
            courier_debug!("Failed to send typing action to chat {}: {}", chat_id, err);
        }
    }
}

/// Polls for messages until the process is stopped.
///
/// The dispatcher keeps each chat's messages in order and serves chats
/// concurrently. Conversions are detached by the runner, so the handler
/// returns before the article is delivered.
pub async fn run(bot: Bot, runner: Arc<EffectRunner>) {
    if let Ok(me) = bot.get_me().await {
        courier_info!("Polling as @{}", me.username());
    }

    teloxide::repl(bot, move |msg: Message| {
        let runner = runner.clone();
        async move {
            let chat_id = msg.chat.id.0;
            match msg.text() {
                Some(text) => {
                    courier_debug!("Chat {} sent {} chars", chat_id, text.len());
                    runner
                        .handle(chat_id, Msg::TextReceived(text.to_string()))
                        .await;
                }
                None => courier_debug!("Ignoring non-text message in chat {}", chat_id),
            }
            respond(())
        }
    })
    .await;
}
