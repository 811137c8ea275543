//! Application state.

use std::sync::Arc;
use std::time::Duration;

use savings_referral_store::Store;

use crate::config::ServiceConfig;
use crate::history::TransactionsClient;
use crate::ledger::ReferralLedger;

/// Application state shared across handlers.
pub struct AppState {
    /// The referral ledger.
    pub ledger: ReferralLedger,

    /// Service configuration.
    pub config: ServiceConfig,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: ServiceConfig) -> Self {
        let mut ledger = ReferralLedger::new(store, config.app_base_url.clone());
        let timeout = Duration::from_millis(config.eligibility_timeout_ms);

        // Create transactions-history client if configured
        let history = config.transactions_api_url.as_ref().and_then(|url| {
            match TransactionsClient::new(url, config.transactions_api_key.clone(), timeout) {
                Ok(client) => {
                    tracing::info!(transactions_url = %url, "New-user eligibility check enabled");
                    Some(Arc::new(client))
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to create transactions client");
                    None
                }
            }
        });

        match history {
            Some(client) => ledger = ledger.with_history(client, timeout),
            None => tracing::warn!(
                "Transactions service not configured - every conversion is treated as a new user"
            ),
        }

        Self { ledger, config }
    }
}
