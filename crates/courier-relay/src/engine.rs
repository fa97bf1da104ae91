use std::sync::Arc;

use tracing::{info, warn};

use courier_store::Registry;
use courier_types::models::{RegistryStats, UserId, UserRecord};
use courier_types::outcome::RelayOutcome;

use crate::error::RelayError;
use crate::session::ReplySession;
use crate::transport::Transport;

/// How many candidates a reply-target selection offers the operator.
pub const SELECTION_LIMIT: usize = 5;

/// Routes inbound traffic between clients and the single operator,
/// consulting and mutating the registry and asking the transport to carry
/// outbound messages. All user-visible rendering of outcomes belongs to
/// the caller.
pub struct RelayEngine {
    registry: Arc<Registry>,
    transport: Arc<dyn Transport>,
    operator_id: UserId,
    session: ReplySession,
}

impl RelayEngine {
    pub fn new(registry: Arc<Registry>, transport: Arc<dyn Transport>, operator_id: UserId) -> Self {
        Self {
            registry,
            transport,
            operator_id,
            session: ReplySession::new(),
        }
    }

    pub fn operator_id(&self) -> UserId {
        self.operator_id
    }

    /// A single configured identity separates operator events from client
    /// events; everything else is a client.
    pub fn is_operator(&self, id: UserId) -> bool {
        id == self.operator_id
    }

    /// Register a client on first contact. Idempotent: an existing record
    /// is returned unmodified.
    pub async fn register_user(
        &self,
        id: UserId,
        display_name: Option<&str>,
        handle: Option<&str>,
    ) -> Result<UserRecord, RelayError> {
        Ok(self.registry.upsert_user(id, display_name, handle).await?)
    }

    /// Client -> operator path. The message is recorded before the forward
    /// is attempted: a client's words are never lost just because delivery
    /// to the operator failed.
    pub async fn handle_client_message(
        &self,
        id: UserId,
        display_name: Option<&str>,
        handle: Option<&str>,
        text: &str,
    ) -> Result<RelayOutcome, RelayError> {
        let user = self.registry.upsert_user(id, display_name, handle).await?;

        if !user.is_active {
            info!("Dropping message from blocked user {}", id);
            return Ok(RelayOutcome::Rejected);
        }

        self.registry.append_message(id, text, false).await?;

        let envelope = forward_envelope(&user, text);
        match self.transport.deliver(self.operator_id, &envelope).await {
            Ok(()) => Ok(RelayOutcome::Forwarded),
            Err(e) => {
                warn!("Failed to forward message from user {} to operator: {}", id, e);
                Ok(RelayOutcome::ForwardFailed {
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Operator -> client path. Delivery comes first and the append only
    /// happens on success, so the ledger never shows a reply the client
    /// did not receive.
    pub async fn handle_operator_reply(
        &self,
        target: UserId,
        text: &str,
    ) -> Result<RelayOutcome, RelayError> {
        if self.registry.get_user(target).await.is_none() {
            return Err(RelayError::InvalidTarget(target));
        }

        // The wire carries the decorated form; the ledger keeps the bare
        // reply text, and only if it actually arrived.
        match self.transport.deliver(target, &reply_envelope(text)).await {
            Ok(()) => {
                self.registry.append_message(target, text, true).await?;
                info!("Reply delivered to user {}", target);
                Ok(RelayOutcome::Delivered { target })
            }
            Err(e) => {
                warn!("Failed to deliver reply to user {}: {}", target, e);
                Ok(RelayOutcome::DeliveryFailed {
                    target,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// A non-command operator message: reply to the current target if one
    /// is selected, otherwise hand back candidates so the caller can
    /// present a selection affordance.
    pub async fn handle_bare_operator_message(
        &self,
        text: &str,
    ) -> Result<RelayOutcome, RelayError> {
        match self.session.target() {
            Some(target) => self.handle_operator_reply(target, text).await,
            None => {
                let candidates = self.registry.recent_active_users(SELECTION_LIMIT).await;
                Ok(RelayOutcome::NeedsTarget { candidates })
            }
        }
    }

    /// Bind the operator's next bare message to `id`. The target must
    /// resolve to a known user; on `InvalidTarget` the previous binding is
    /// left untouched.
    pub async fn select_reply_target(&self, id: UserId) -> Result<UserRecord, RelayError> {
        let user = self
            .registry
            .get_user(id)
            .await
            .ok_or(RelayError::InvalidTarget(id))?;

        self.session.set_target(id);
        info!("Reply target set to user {}", id);
        Ok(user)
    }

    /// Blocked users keep their record and history; they just stop being
    /// forwarded, listed or broadcast to. A targeted reply by id still
    /// reaches them.
    pub async fn block_user(&self, id: UserId) -> Result<(), RelayError> {
        self.registry.set_active(id, false).await?;
        info!("User {} blocked", id);
        Ok(())
    }

    pub async fn unblock_user(&self, id: UserId) -> Result<(), RelayError> {
        self.registry.set_active(id, true).await?;
        info!("User {} unblocked", id);
        Ok(())
    }

    pub async fn list_users(&self) -> Vec<UserRecord> {
        self.registry.list_active_users().await
    }

    pub async fn stats(&self) -> RegistryStats {
        self.registry.stats().await
    }
}

/// How a delivered operator reply reads on the client's side.
fn reply_envelope(text: &str) -> String {
    format!("💬 Reply from our team:\n\n{text}")
}

/// The envelope the operator sees for a forwarded client message: sender
/// identity, id and text, plus the command that answers it.
fn forward_envelope(user: &UserRecord, text: &str) -> String {
    format!(
        "📨 New message from user:\n\n\
         👤 User: {} (@{})\n\
         🆔 ID: {}\n\
         💬 Message: {}\n\n\
         Reply with: /reply {} <your message>",
        user.name(),
        user.handle.as_deref().unwrap_or("No username"),
        user.id,
        text,
        user.id,
    )
}
