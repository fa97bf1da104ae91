use crate::models::{UserId, UserRecord};

/// What the relay decided to do with one inbound message. The caller owns
/// all user-visible rendering of these outcomes.
#[derive(Debug, Clone)]
pub enum RelayOutcome {
    /// Sender is blocked: nothing was recorded, nothing was forwarded.
    Rejected,

    /// Client message recorded and forwarded to the operator.
    Forwarded,

    /// Client message recorded, but the forward to the operator failed.
    /// The ledger keeps the message either way — the sender's intent is
    /// not lost because delivery failed.
    ForwardFailed { reason: String },

    /// Operator reply delivered to the target and recorded.
    Delivered { target: UserId },

    /// Delivery to the target failed; the reply was NOT recorded, so the
    /// ledger only ever contains operator messages that actually arrived.
    DeliveryFailed { target: UserId, reason: String },

    /// Bare operator message with no reply target selected. Candidates are
    /// the most-recently-active users, most recent first, bounded.
    NeedsTarget { candidates: Vec<UserRecord> },
}

/// Aggregate result of a broadcast fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}
