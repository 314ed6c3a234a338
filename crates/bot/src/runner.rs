//! The polling loop.
//!
//! Each update is handled on its own task so a slow weather lookup does not
//! hold up other chats. On shutdown the loop stops polling, gives in-flight
//! handlers a bounded time to finish, then closes the bot.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use skycast_common::InboundMessage;
use skycast_coordinator::{ChatPlatform, WeatherBot};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::commands::parse_command;
use crate::telegram::{TelegramClient, Update};

const POLL_RETRY_DELAY: Duration = Duration::from_secs(3);

pub struct Runner {
    telegram: Arc<TelegramClient>,
    bot: Arc<WeatherBot>,
    drain_timeout: Duration,
}

impl Runner {
    pub fn new(telegram: Arc<TelegramClient>, bot: Arc<WeatherBot>, drain_timeout: Duration) -> Self {
        Self {
            telegram,
            bot,
            drain_timeout,
        }
    }

    /// Poll until `shutdown` resolves, then drain and close the bot.
    pub async fn run(self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        let mut tasks = JoinSet::new();
        let mut offset: Option<i64> = None;
        // Outlives loop iterations so finished handlers don't restart the long poll.
        let mut poll = None;

        info!("Starting bot");

        loop {
            let pending_poll =
                poll.get_or_insert_with(|| Box::pin(self.telegram.get_updates(offset)));

            tokio::select! {
                _ = &mut shutdown => {
                    info!("Received shutdown signal");
                    break;
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "Message handler panicked");
                    }
                }
                polled = pending_poll => {
                    poll = None;
                    match polled {
                        Ok(updates) => {
                            for update in updates {
                                offset = Some(update.update_id + 1);
                                let telegram = self.telegram.clone();
                                let bot = self.bot.clone();
                                tasks.spawn(async move {
                                    handle_update(&bot, &telegram, update).await;
                                });
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "Polling failed, retrying");
                            tokio::select! {
                                _ = &mut shutdown => {
                                    info!("Received shutdown signal");
                                    break;
                                }
                                _ = tokio::time::sleep(POLL_RETRY_DELAY) => {}
                            }
                        }
                    }
                }
            }
        }

        self.drain(tasks).await;
        self.bot.shutdown().await;
        info!("Bot shutdown complete");
    }

    async fn drain(&self, mut tasks: JoinSet<()>) {
        if tasks.is_empty() {
            return;
        }
        info!(in_flight = tasks.len(), "Waiting for in-flight messages");

        let drained = tokio::time::timeout(self.drain_timeout, async {
            while let Some(joined) = tasks.join_next().await {
                if let Err(e) = joined {
                    error!(error = %e, "Message handler panicked");
                }
            }
        })
        .await;

        if drained.is_err() {
            warn!(
                remaining = tasks.len(),
                "Drain timed out, abandoning in-flight messages"
            );
            tasks.abort_all();
        }
    }
}

/// Dispatch one update: commands get fixed replies, other text goes to the bot.
pub async fn handle_update(bot: &WeatherBot, telegram: &TelegramClient, update: Update) {
    let Some(message) = update.message else {
        debug!(update_id = update.update_id, "Ignoring non-message update");
        return;
    };
    let Some(text) = message.text.clone() else {
        debug!(update_id = update.update_id, "Ignoring message without text");
        return;
    };
    let target = message.reply_target();

    match parse_command(&text) {
        Some(command) => match command.reply() {
            Some(reply) => {
                if let Err(e) = telegram.send_text(&target, reply).await {
                    error!(error = %e, ?command, "Failed to answer command");
                }
            }
            None => debug!(?command, "Ignoring unknown command"),
        },
        None => {
            let mut inbound = InboundMessage::new(text, target);
            if let Some(sender) = message.sender_name() {
                inbound = inbound.with_sender(sender);
            }
            bot.handle_message(telegram, &inbound).await;
        }
    }
}
