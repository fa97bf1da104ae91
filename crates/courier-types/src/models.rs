use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User ids come from the chat network and are signed 64-bit integers.
pub type UserId = i64;

/// Recorded in place of photos, documents, stickers and anything else that
/// is not plain text. The raw payload is never stored.
pub const MEDIA_PLACEHOLDER: &str = "Media message";

/// A registered client and their full message history.
/// Records are never deleted — blocking only flips `is_active`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub display_name: Option<String>,
    pub handle: Option<String>,
    pub joined_at: DateTime<Utc>,
    pub is_active: bool,
    pub messages: Vec<StoredMessage>,
}

impl UserRecord {
    /// Timestamp of the user's latest message, or their join time if the
    /// timeline is empty. Used to rank reply-target candidates.
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.messages
            .last()
            .map(|m| m.timestamp)
            .unwrap_or(self.joined_at)
    }

    /// Best-effort human-readable name for listings and envelopes.
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or("Unknown")
    }
}

/// One entry in a user's timeline. Append-only: entries are never edited,
/// removed or reordered once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub from_operator: bool,
}

/// Aggregate registry figures for the operator's /stats view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegistryStats {
    pub total_users: usize,
    pub total_messages: usize,
    pub average_messages: f64,
}
