use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use teloxide::{
    prelude::*,
    types::{AllowedUpdate, BotCommand, MessageId, UpdateKind},
    ApiError, RequestError,
};
use tracing::{debug, info, warn};

use formpilot_conversation::{ChatOutbound, Collector, MessageRef, SessionId};
use formpilot_core::Registrar;

const POLL_TIMEOUT_SECS: u32 = 30;
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Sends and edits bot messages through the Bot API.
pub struct TelegramOutbound {
    bot: Bot,
}

#[async_trait]
impl ChatOutbound for TelegramOutbound {
    async fn send_text(&self, session: SessionId, text: &str) -> Result<MessageRef> {
        let sent = self.bot.send_message(ChatId(session.0), text).await?;
        Ok(MessageRef(sent.id.0))
    }

    async fn edit_text(&self, session: SessionId, message: MessageRef, text: &str) -> Result<()> {
        self.bot
            .edit_message_text(ChatId(session.0), MessageId(message.0), text)
            .await?;
        Ok(())
    }
}

/// Connect with `token` and long-poll until ctrl-c.
///
/// Incoming text is queued per chat: one chat's turns are applied in order,
/// and a registration in one chat never stalls the others.
pub async fn run(
    token: SecretString,
    registrar: Arc<dyn Registrar>,
    login_url: String,
) -> Result<()> {
    // Client timeout must outlive the long-poll timeout.
    let client = teloxide::net::default_reqwest_settings()
        .timeout(Duration::from_secs(POLL_TIMEOUT_SECS as u64 + 15))
        .build()?;
    let bot = Bot::with_client(token.expose_secret(), client);

    let me = bot.get_me().await?;

    // Long polling does not work while a webhook is set.
    bot.delete_webhook().send().await?;

    let commands = vec![
        BotCommand::new("start", "About this bot"),
        BotCommand::new("new", "Start a new registration"),
        BotCommand::new("cancel", "Cancel the current registration"),
    ];
    if let Err(e) = bot.set_my_commands(commands).await {
        warn!("failed to register bot commands: {e}");
    }

    info!(username = ?me.username, "telegram bot connected (webhook cleared)");

    let outbound = Arc::new(TelegramOutbound { bot: bot.clone() });
    let collector = Arc::new(Collector::new(registrar, outbound, login_url));

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut offset: i32 = 0;
    loop {
        let result = tokio::select! {
            _ = &mut shutdown => {
                info!("shutdown requested, stopping polling");
                break;
            }
            result = bot
                .get_updates()
                .offset(offset)
                .timeout(POLL_TIMEOUT_SECS)
                .allowed_updates(vec![AllowedUpdate::Message])
                .send() => result,
        };

        match result {
            Ok(updates) => {
                debug!(count = updates.len(), "got telegram updates");
                for update in updates {
                    offset = update.id.as_offset();
                    let UpdateKind::Message(msg) = update.kind else {
                        debug!("ignoring non-message update");
                        continue;
                    };
                    let Some(text) = msg.text().map(str::to_string) else {
                        debug!(chat_id = msg.chat.id.0, "ignoring non-text message");
                        continue;
                    };

                    collector.dispatch(SessionId(msg.chat.id.0), text);
                }
            }
            Err(RequestError::Api(ApiError::TerminatedByOtherGetUpdates)) => {
                anyhow::bail!("another bot instance is already polling with this token");
            }
            Err(e) => {
                warn!(error = %e, "telegram getUpdates failed");
                tokio::time::sleep(RETRY_DELAY).await;
            }
        }
    }

    Ok(())
}
