//! Error types for referral storage.

use savings_referral_core::ReferralError;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The entity type.
        entity: &'static str,
        /// The lookup key.
        id: String,
    },

    /// The referral code is already owned by another wallet.
    #[error("referral code already taken: {code}")]
    CodeTaken {
        /// The colliding code.
        code: String,
    },
}

impl From<StoreError> for ReferralError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound {
                entity: "user", id
            } => Self::UserNotFound { wallet: id },
            other => Self::StoreUnavailable(other.to_string()),
        }
    }
}
