//! Error types for the referral ledger.

use crate::ids::IdError;

/// Result type for referral ledger operations.
pub type Result<T> = std::result::Result<T, ReferralError>;

/// Errors that can occur in referral ledger operations.
///
/// Validation and resolution errors are raised before any write happens.
#[derive(Debug, thiserror::Error)]
pub enum ReferralError {
    /// A required field was missing or malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A visit was tracked without a referral code.
    #[error("referral code is required")]
    MissingReferralCode,

    /// No user owns the supplied referral code.
    #[error("unknown referral code: {code}")]
    UnknownReferralCode {
        /// The code that was looked up.
        code: String,
    },

    /// The referrer and the referred user are the same wallet.
    #[error("self-referral is not allowed")]
    SelfReferralRejected,

    /// No user record exists for the wallet.
    #[error("user not found: {wallet}")]
    UserNotFound {
        /// The wallet that was looked up.
        wallet: String,
    },

    /// Every generated code collided with an existing one.
    #[error("could not generate a unique referral code after {attempts} attempts")]
    CodeGenerationExhausted {
        /// Number of attempts made.
        attempts: u32,
    },

    /// The persistent store failed or could not be reached.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// The transactions-history lookup failed. Never surfaced to callers.
    #[error("eligibility check failed: {0}")]
    EligibilityCheckFailed(String),
}

impl From<IdError> for ReferralError {
    fn from(err: IdError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}
