//! Telegram delivery channel.
//!
//! Sends engine notifications (budget alerts, badge awards) to the chat stored
//! in `users.telegram_id`. Rich messages use HTML parse mode; the plain
//! fallback is sent without any parse mode so markup errors cannot reject it.

use async_trait::async_trait;
use engine::notify::{
    MessageFormat, NotificationChannel, NotificationError, OutgoingMessage, Recipient,
};
use teloxide::{RequestError, prelude::*, types::ParseMode};

mod render;

pub struct TelegramChannel {
    bot: teloxide::Bot,
}

impl TelegramChannel {
    pub fn new(token: &str) -> Self {
        Self {
            bot: teloxide::Bot::new(token),
        }
    }

    pub fn builder() -> TelegramChannelBuilder {
        TelegramChannelBuilder::default()
    }
}

#[async_trait]
impl NotificationChannel for TelegramChannel {
    async fn deliver(
        &self,
        recipient: &Recipient,
        message: &OutgoingMessage,
    ) -> Result<(), NotificationError> {
        let chat_id = render::chat_id(recipient)?;
        let text = render::text(message);

        let request = self.bot.send_message(chat_id, text);
        let result = match message.format {
            MessageFormat::Rich => request.parse_mode(ParseMode::Html).await,
            MessageFormat::Plain => request.await,
        };

        match result {
            Ok(_) => {
                tracing::debug!(
                    user = %recipient.user_id,
                    chat = ?chat_id,
                    "telegram message sent"
                );
                Ok(())
            }
            Err(RequestError::Api(err)) => Err(NotificationError::Rejected(err.to_string())),
            Err(err) => Err(NotificationError::Transport(err.to_string())),
        }
    }
}

#[derive(Default, Debug)]
pub struct TelegramChannelBuilder {
    token: String,
}

impl TelegramChannelBuilder {
    pub fn token(mut self, token: &str) -> TelegramChannelBuilder {
        self.token = token.to_string();
        self
    }

    pub fn build(self) -> Result<TelegramChannel, String> {
        if self.token.trim().is_empty() {
            return Err("telegram token must not be empty".to_string());
        }
        tracing::info!("Initializing telegram notifier...");
        Ok(TelegramChannel::new(self.token.trim()))
    }
}
