use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use courier_relay::broadcast::BroadcastDispatcher;
use courier_relay::engine::RelayEngine;
use courier_types::models::{MEDIA_PLACEHOLDER, UserRecord};
use courier_types::outcome::RelayOutcome;

use crate::commands::{self, CommandError, OperatorCommand};
use crate::telegram::{
    CallbackQuery, InlineKeyboardButton, InlineKeyboardMarkup, TelegramClient, TgMessage, TgUser,
    Update,
};

/// Pause before retrying after a failed poll, so a dead network does not
/// turn into a hot loop.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Classifies each inbound update against the configured operator identity
/// and drives the relay engine, rendering outcomes back into chat messages.
pub struct Router {
    client: Arc<TelegramClient>,
    engine: RelayEngine,
    dispatcher: BroadcastDispatcher,
}

impl Router {
    pub fn new(
        client: Arc<TelegramClient>,
        engine: RelayEngine,
        dispatcher: BroadcastDispatcher,
    ) -> Self {
        Self {
            client,
            engine,
            dispatcher,
        }
    }

    /// Long-poll loop. Failures inside the loop are logged and polling
    /// continues; nothing in here terminates the process.
    pub async fn run(&self, poll_timeout_secs: u64) {
        let mut offset = 0i64;

        loop {
            let updates = match self.client.get_updates(offset, poll_timeout_secs).await {
                Ok(updates) => updates,
                Err(e) => {
                    error!("getUpdates failed: {}", e);
                    tokio::time::sleep(POLL_RETRY_DELAY).await;
                    continue;
                }
            };

            for update in updates {
                offset = offset.max(update.update_id + 1);
                self.handle_update(update).await;
            }
        }
    }

    pub async fn handle_update(&self, update: Update) {
        if let Some(message) = update.message {
            self.handle_message(message).await;
        } else if let Some(query) = update.callback_query {
            self.handle_callback(query).await;
        }
    }

    async fn handle_message(&self, message: TgMessage) {
        let Some(sender) = message.from.clone() else {
            return;
        };

        // Non-text payloads are recorded as a fixed placeholder, never the
        // raw payload.
        let text = message
            .text
            .as_deref()
            .or(message.caption.as_deref())
            .unwrap_or(MEDIA_PLACEHOLDER)
            .to_string();

        let result = if self.engine.is_operator(sender.id) {
            self.handle_operator_message(&text).await
        } else {
            self.handle_client_message(&sender, &text).await
        };

        if let Err(e) = result {
            error!("Failed handling message from {}: {}", sender.id, e);
        }
    }

    async fn handle_client_message(&self, sender: &TgUser, text: &str) -> anyhow::Result<()> {
        if text == "/start" {
            let user = self
                .engine
                .register_user(sender.id, Some(&sender.first_name), sender.username.as_deref())
                .await?;
            self.client
                .send_message(sender.id, &commands::client_welcome(user.name()))
                .await?;
            return Ok(());
        }

        if text == "/help" {
            self.client.send_message(sender.id, commands::CLIENT_HELP).await?;
            return Ok(());
        }

        let outcome = self
            .engine
            .handle_client_message(
                sender.id,
                Some(&sender.first_name),
                sender.username.as_deref(),
                text,
            )
            .await?;

        let notice = match outcome {
            RelayOutcome::Rejected => commands::BLOCKED_NOTICE,
            RelayOutcome::Forwarded => commands::FORWARD_CONFIRMATION,
            RelayOutcome::ForwardFailed { .. } => commands::FORWARD_FAILURE_NOTICE,
            _ => return Ok(()),
        };
        self.client.send_message(sender.id, notice).await?;
        Ok(())
    }

    async fn handle_operator_message(&self, text: &str) -> anyhow::Result<()> {
        if !text.starts_with('/') {
            return self.handle_bare_operator_message(text).await;
        }

        match OperatorCommand::parse(text) {
            Ok(command) => self.execute_command(command).await,
            Err(e) => {
                if let CommandError::Unknown(cmd) = &e {
                    warn!("Operator sent unknown command {}", cmd);
                }
                self.client
                    .send_message(self.engine.operator_id(), &e.guidance())
                    .await?;
                Ok(())
            }
        }
    }

    async fn execute_command(&self, command: OperatorCommand) -> anyhow::Result<()> {
        let operator = self.engine.operator_id();

        match command {
            OperatorCommand::Start => {
                self.client.send_message(operator, commands::ADMIN_PANEL).await?;
            }

            OperatorCommand::Help => {
                self.client.send_message(operator, commands::ADMIN_HELP).await?;
            }

            OperatorCommand::Users => {
                let users = self.engine.list_users().await;
                self.client
                    .send_chunked(operator, &commands::render_user_list(&users))
                    .await?;
            }

            OperatorCommand::Stats => {
                let stats = self.engine.stats().await;
                self.client
                    .send_message(operator, &commands::render_stats(&stats))
                    .await?;
            }

            OperatorCommand::Reply { target, text } => {
                let feedback = match self.engine.handle_operator_reply(target, &text).await {
                    Ok(RelayOutcome::Delivered { target }) => commands::reply_sent(target),
                    Ok(RelayOutcome::DeliveryFailed { target, reason }) => {
                        commands::reply_failed(target, &reason)
                    }
                    Ok(_) => return Ok(()),
                    Err(e) if e.is_unknown_user() => commands::user_not_found(target),
                    Err(e) => return Err(e.into()),
                };
                self.client.send_message(operator, &feedback).await?;
            }

            OperatorCommand::Broadcast { text } => {
                let report = self
                    .dispatcher
                    .broadcast(&commands::broadcast_envelope(&text))
                    .await;
                self.client
                    .send_message(operator, &commands::render_broadcast_report(&report))
                    .await?;
            }

            OperatorCommand::Block(id) => {
                let feedback = match self.engine.block_user(id).await {
                    Ok(()) => commands::user_blocked(id),
                    Err(e) if e.is_unknown_user() => commands::user_not_found(id),
                    Err(e) => return Err(e.into()),
                };
                self.client.send_message(operator, &feedback).await?;
            }

            OperatorCommand::Unblock(id) => {
                let feedback = match self.engine.unblock_user(id).await {
                    Ok(()) => commands::user_unblocked(id),
                    Err(e) if e.is_unknown_user() => commands::user_not_found(id),
                    Err(e) => return Err(e.into()),
                };
                self.client.send_message(operator, &feedback).await?;
            }
        }

        Ok(())
    }

    /// A bare operator message either goes to the selected reply target or
    /// turns into a selection keyboard of recent users.
    async fn handle_bare_operator_message(&self, text: &str) -> anyhow::Result<()> {
        let operator = self.engine.operator_id();

        match self.engine.handle_bare_operator_message(text).await {
            Ok(RelayOutcome::NeedsTarget { candidates }) => {
                if candidates.is_empty() {
                    self.client
                        .send_message(operator, commands::NO_USERS_TO_REPLY)
                        .await?;
                    return Ok(());
                }
                self.client
                    .send_message_with_keyboard(
                        operator,
                        commands::SELECT_PROMPT,
                        &selection_keyboard(&candidates),
                    )
                    .await?;
            }
            Ok(RelayOutcome::Delivered { target }) => {
                self.client
                    .send_message(operator, &commands::reply_sent(target))
                    .await?;
            }
            Ok(RelayOutcome::DeliveryFailed { target, reason }) => {
                self.client
                    .send_message(operator, &commands::reply_failed(target, &reason))
                    .await?;
            }
            Ok(_) => {}
            Err(e) if e.is_unknown_user() => {
                self.client
                    .send_message(operator, commands::TARGET_NOT_FOUND)
                    .await?;
            }
            Err(e) => return Err(e.into()),
        }

        Ok(())
    }

    /// `reply_<id>` button press: bind the reply target, acknowledge the
    /// press, and rewrite the prompt so the operator sees who they picked.
    async fn handle_callback(&self, query: CallbackQuery) {
        if !self.engine.is_operator(query.from.id) {
            return;
        }

        if let Err(e) = self.client.answer_callback_query(&query.id).await {
            warn!("answerCallbackQuery failed: {}", e);
        }

        let Some(target) = query
            .data
            .as_deref()
            .and_then(|data| data.strip_prefix("reply_"))
            .and_then(|id| id.parse::<i64>().ok())
        else {
            return;
        };

        let ack = match self.engine.select_reply_target(target).await {
            Ok(user) => commands::selection_ack(&user),
            Err(e) if e.is_unknown_user() => commands::TARGET_NOT_FOUND.to_string(),
            Err(e) => {
                error!("Failed to select reply target {}: {}", target, e);
                return;
            }
        };

        if let Some(message) = &query.message {
            if let Err(e) = self
                .client
                .edit_message_text(message.chat.id, message.message_id, &ack)
                .await
            {
                warn!("editMessageText failed: {}", e);
            }
        } else if let Err(e) = self
            .client
            .send_message(self.engine.operator_id(), &ack)
            .await
        {
            warn!("Selection ack failed: {}", e);
        }

        info!("Operator selected reply target {}", target);
    }
}

fn selection_keyboard(candidates: &[UserRecord]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: candidates
            .iter()
            .map(|user| {
                vec![InlineKeyboardButton {
                    text: format!("{} ({})", user.name(), user.id),
                    callback_data: format!("reply_{}", user.id),
                }]
            })
            .collect(),
    }
}
