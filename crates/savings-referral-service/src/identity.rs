//! Caller identity.
//!
//! The connected wallet, if any, travels in the `x-wallet-address` header and is
//! handed to handlers as an explicit [`CurrentUser`] parameter.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use savings_referral_core::WalletAddress;

use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the caller's connected wallet.
pub const WALLET_HEADER: &str = "x-wallet-address";

/// The caller's connected wallet, if one was supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurrentUser {
    /// The connected wallet address.
    pub wallet_address: Option<WalletAddress>,
}

impl CurrentUser {
    /// A caller with a connected wallet.
    #[must_use]
    pub fn connected(wallet_address: WalletAddress) -> Self {
        Self {
            wallet_address: Some(wallet_address),
        }
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(WALLET_HEADER) else {
            return Ok(Self::default());
        };

        let raw = value
            .to_str()
            .map_err(|_| ApiError::BadRequest("Invalid x-wallet-address header".into()))?;

        if raw.trim().is_empty() {
            return Ok(Self::default());
        }

        let wallet_address = WalletAddress::parse(raw)
            .map_err(|e| ApiError::BadRequest(format!("Invalid x-wallet-address header: {e}")))?;

        Ok(Self::connected(wallet_address))
    }
}
