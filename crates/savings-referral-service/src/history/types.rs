//! Transactions-history API types.

use serde::Deserialize;

/// Response of `GET /transactions?userAddress=...`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionsResponse {
    /// The wallet's transactions; only their presence matters here.
    #[serde(default)]
    pub transactions: Vec<serde_json::Value>,
}

/// Error body returned by the transactions-history API.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryErrorResponse {
    /// Error message.
    #[serde(alias = "message")]
    pub error: String,
}
