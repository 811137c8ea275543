//! Transactions-history API client implementation.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use savings_referral_core::WalletAddress;

use super::types::{HistoryErrorResponse, TransactionsResponse};
use super::TransactionHistory;

/// Error type for transactions-history operations.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API returned an error.
    #[error("transactions API error: {status} - {error}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message.
        error: String,
    },
}

/// Transactions-history API client.
#[derive(Debug, Clone)]
pub struct TransactionsClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl TransactionsClient {
    /// Create a new transactions-history client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - API URL (e.g., `"http://transactions:8080"`)
    /// * `api_key` - Optional bearer token
    /// * `timeout` - Per-request timeout
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, HistoryError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Fetch the transactions recorded for a wallet.
    ///
    /// A 404 is treated as an empty history.
    pub async fn list_transactions(
        &self,
        wallet: &WalletAddress,
    ) -> Result<TransactionsResponse, HistoryError> {
        let url = format!("{}/transactions", self.base_url);

        let mut request = self
            .client
            .get(&url)
            .query(&[("userAddress", wallet.as_str())]);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let response = request.send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(TransactionsResponse::default());
        }

        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let error_body: Result<HistoryErrorResponse, _> = response.json().await;
        Err(HistoryError::Api {
            status: status.as_u16(),
            error: error_body.map_or_else(|_| format!("HTTP {status}"), |body| body.error),
        })
    }
}

#[async_trait]
impl TransactionHistory for TransactionsClient {
    async fn has_prior_transactions(&self, wallet: &WalletAddress) -> Result<bool, HistoryError> {
        let history = self.list_transactions(wallet).await?;

        tracing::debug!(
            wallet = %wallet,
            transactions = history.transactions.len(),
            "Fetched transaction history"
        );

        Ok(!history.transactions.is_empty())
    }
}
