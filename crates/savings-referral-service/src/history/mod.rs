//! Transactions-history integration for the new-user eligibility check.
//!
//! A wallet that already has savings-plan transactions is not a new user and
//! earns its referrer nothing. The check is best-effort: when the history
//! service errors or times out, conversion proceeds as if the wallet were new.

pub mod best_effort;
pub mod client;
pub mod types;

use async_trait::async_trait;

use savings_referral_core::WalletAddress;

pub use best_effort::BestEffortCheck;
pub use client::{HistoryError, TransactionsClient};

/// Read-only view of a wallet's savings-plan transaction history.
#[async_trait]
pub trait TransactionHistory: Send + Sync {
    /// Whether the wallet has any prior savings-plan transactions.
    async fn has_prior_transactions(&self, wallet: &WalletAddress) -> Result<bool, HistoryError>;
}
