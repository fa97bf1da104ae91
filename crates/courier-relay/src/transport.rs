use async_trait::async_trait;
use thiserror::Error;

use courier_types::models::UserId;

/// Why a delivery attempt failed, as reported by the chat network.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct DeliveryError(pub String);

/// Outbound seam to the chat network. The relay decides what to persist and
/// whom to notify; implementations own wire formats, rate limits and any
/// transport-level timeouts. A hung delivery must be bounded here — the
/// engine treats every failure uniformly and never retries.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn deliver(&self, target: UserId, text: &str) -> Result<(), DeliveryError>;
}
