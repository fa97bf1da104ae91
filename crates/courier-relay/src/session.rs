use std::sync::RwLock;

use courier_types::models::UserId;

/// The single ephemeral binding from "the operator's next bare message" to
/// a user id. Overwritten on each selection, read (not cleared) by the next
/// bare message, never expires, never persisted. One slot is enough: the
/// system supports exactly one operator identity.
#[derive(Debug, Default)]
pub struct ReplySession {
    target: RwLock<Option<UserId>>,
}

impl ReplySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_target(&self, id: UserId) {
        *self.target.write().expect("reply session lock poisoned") = Some(id);
    }

    pub fn target(&self) -> Option<UserId> {
        *self.target.read().expect("reply session lock poisoned")
    }
}
