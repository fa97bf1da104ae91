use thiserror::Error;

use courier_store::StoreError;
use courier_types::models::UserId;

#[derive(Debug, Error)]
pub enum RelayError {
    /// Operator addressed a user id with no registry record. A caller input
    /// error, never fatal to the process.
    #[error("no user with id {0}")]
    InvalidTarget(UserId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RelayError {
    /// True for errors caused by referencing an unknown user id, regardless
    /// of which call site produced them.
    pub fn is_unknown_user(&self) -> bool {
        matches!(
            self,
            RelayError::InvalidTarget(_) | RelayError::Store(StoreError::NotFound(_))
        )
    }
}
