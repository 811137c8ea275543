//! Referral HTTP client implementation.

use reqwest::Client;
use std::time::Duration;

use crate::error::ClientError;
use crate::types::{
    ApiErrorResponse, ConvertRequest, ConvertResponse, ConvertResult, GenerateCodeRequest,
    GenerateCodeResponse, LeaderboardEntry, LeaderboardResponse, StatsResponse,
    TrackVisitRequest, TrackVisitResponse,
};

/// Referral API client.
#[derive(Debug, Clone)]
pub struct ReferralClient {
    client: Client,
    base_url: String,
}

impl ReferralClient {
    /// Create a new referral client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the referral service (e.g., `"http://savings-referral:8080"`)
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_options(base_url, ClientOptions::default())
    }

    /// Create a new referral client with custom options.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_options(
        base_url: impl Into<String>,
        options: ClientOptions,
    ) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Get or create the referral code for a wallet.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn generate_code(
        &self,
        wallet_address: impl Into<String>,
    ) -> Result<GenerateCodeResponse, ClientError> {
        let url = format!("{}/referrals/generate", self.base_url);
        let request = GenerateCodeRequest {
            wallet_address: wallet_address.into(),
        };

        let response = self.client.post(&url).json(&request).send().await?;

        self.handle_response(response).await
    }

    /// Track a visit through a referral link.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn track_visit(
        &self,
        request: &TrackVisitRequest,
    ) -> Result<TrackVisitResponse, ClientError> {
        let url = format!("{}/referrals/track", self.base_url);

        let response = self.client.post(&url).json(request).send().await?;

        self.handle_response(response).await
    }

    /// Get referral stats for a wallet.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] if the wallet has no record.
    pub async fn get_stats(&self, wallet_address: &str) -> Result<StatsResponse, ClientError> {
        let url = format!("{}/referrals/track", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("walletAddress", wallet_address)])
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Record a conversion for a newly connected wallet.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::BadRequest`] for self-referrals and
    /// [`ClientError::NotFound`] for unknown codes.
    pub async fn record_conversion(
        &self,
        new_user_wallet_address: impl Into<String>,
        referral_code: impl Into<String>,
    ) -> Result<ConvertResult, ClientError> {
        let url = format!("{}/referrals/convert", self.base_url);
        let request = ConvertRequest {
            new_user_wallet_address: new_user_wallet_address.into(),
            referral_code: referral_code.into(),
        };

        let response = self.client.post(&url).json(&request).send().await?;

        let body: ConvertResponse = self.handle_response(response).await?;
        Ok(body.into_result())
    }

    /// Get the top referrers.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn leaderboard(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<LeaderboardEntry>, ClientError> {
        let url = format!("{}/referrals/leaderboard", self.base_url);

        let mut request = self.client.get(&url);
        if let Some(limit) = limit {
            request = request.query(&[("limit", limit)]);
        }

        let response = request.send().await?;

        let body: LeaderboardResponse = self.handle_response(response).await?;
        Ok(body.leaderboard)
    }

    /// Handle API response and convert errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        let bytes = response.bytes().await?;

        if status.is_success() {
            return Ok(serde_json::from_slice(&bytes)?);
        }

        match serde_json::from_slice::<ApiErrorResponse>(&bytes) {
            Ok(api_error) => {
                let message = api_error.error.message;

                match api_error.error.code.as_str() {
                    "not_found" => Err(ClientError::NotFound { message }),
                    "bad_request" => Err(ClientError::BadRequest { message }),
                    code => Err(ClientError::Api {
                        code: code.to_string(),
                        message,
                        status: status.as_u16(),
                    }),
                }
            }
            Err(_) => Err(ClientError::Api {
                code: "unknown".to_string(),
                message: format!("HTTP {status}"),
                status: status.as_u16(),
            }),
        }
    }
}

/// Client options for customization.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Request timeout in seconds (default: 30).
    pub timeout_seconds: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
        }
    }
}
