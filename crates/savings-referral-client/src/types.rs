//! Request and response types for the referral client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use savings_referral_core::{ReferralCode, WalletAddress};

/// Generate code request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateCodeRequest {
    /// Wallet requesting a code.
    pub wallet_address: String,
}

/// Generate code response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateCodeResponse {
    /// The wallet's referral code.
    pub referral_code: ReferralCode,
    /// Shareable link.
    pub referral_link: String,
    /// Whether the code was created by this request.
    pub is_new: bool,
}

/// Visit to track.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackVisitRequest {
    /// The visited code.
    pub referral_code: String,
    /// Visitor wallet, if connected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visitor_wallet_address: Option<String>,
    /// Visitor IP.
    #[serde(rename = "visitorIP", skip_serializing_if = "Option::is_none")]
    pub visitor_ip: Option<String>,
    /// Visitor user agent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl TrackVisitRequest {
    /// An anonymous visit through `referral_code`.
    #[must_use]
    pub fn anonymous(referral_code: impl Into<String>) -> Self {
        Self {
            referral_code: referral_code.into(),
            ..Self::default()
        }
    }

    /// Attach the visitor's wallet.
    #[must_use]
    pub fn with_visitor(mut self, wallet: impl Into<String>) -> Self {
        self.visitor_wallet_address = Some(wallet.into());
        self
    }
}

/// A referrer reference.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferrerRef {
    /// The referrer's wallet.
    pub wallet_address: WalletAddress,
}

/// Track visit response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackVisitResponse {
    /// Outcome message.
    pub message: String,
    /// Whether a visit was recorded. `false` for self-referrals.
    pub tracked: bool,
    /// Owner of the code, when recorded.
    #[serde(default)]
    pub referrer: Option<ReferrerRef>,
}

/// Aggregate referral stats.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    /// Visits credited.
    pub total_visits: u64,
    /// Converted visits.
    pub total_conversions: u64,
    /// Conversion percentage, two decimals.
    pub conversion_rate: String,
    /// Points earned.
    pub total_rewards: i64,
}

/// A recent visit.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentVisit {
    /// When the visit happened.
    pub timestamp: DateTime<Utc>,
    /// Visitor wallet, if known.
    pub visitor_wallet_address: Option<WalletAddress>,
    /// Whether the visit converted.
    pub converted: bool,
}

/// Stats response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    /// The wallet's code, if generated.
    pub referral_code: Option<ReferralCode>,
    /// Shareable link.
    pub referral_link: Option<String>,
    /// Aggregates.
    pub stats: Stats,
    /// Most recent visits, newest first.
    pub recent_visits: Vec<RecentVisit>,
}

/// Conversion request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertRequest {
    /// The converting wallet.
    pub new_user_wallet_address: String,
    /// The code the user arrived through.
    pub referral_code: String,
}

/// Raw conversion response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ConvertResponse {
    pub message: String,
    pub status: String,
    #[serde(default)]
    pub referral_reward: Option<i64>,
    #[serde(default)]
    pub referrer: Option<ReferrerRef>,
}

/// Outcome of a conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvertResult {
    /// Recorded and rewarded.
    Converted {
        /// Points credited to the referrer.
        referral_reward: i64,
        /// The rewarded referrer.
        referrer: WalletAddress,
    },
    /// The user had already converted through this code.
    AlreadyConverted,
    /// The user already has transactions.
    NotNewUser,
    /// A status this client does not know.
    Other {
        /// Reported status.
        status: String,
        /// Server message.
        message: String,
    },
}

impl ConvertResponse {
    pub(crate) fn into_result(self) -> ConvertResult {
        match (self.status.as_str(), self.referral_reward, self.referrer) {
            ("converted", Some(referral_reward), Some(referrer)) => ConvertResult::Converted {
                referral_reward,
                referrer: referrer.wallet_address,
            },
            ("already_converted", ..) => ConvertResult::AlreadyConverted,
            ("not_new_user", ..) => ConvertResult::NotNewUser,
            _ => ConvertResult::Other {
                status: self.status,
                message: self.message,
            },
        }
    }
}

/// One leaderboard row.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    /// 1-based rank.
    pub rank: usize,
    /// The referrer.
    pub wallet_address: WalletAddress,
    /// Conversions credited.
    pub referral_count: i64,
    /// Points earned.
    pub total_referral_rewards: i64,
}

/// Leaderboard response.
#[derive(Debug, Clone, Deserialize)]
pub struct LeaderboardResponse {
    /// Top referrers, best first.
    pub leaderboard: Vec<LeaderboardEntry>,
}

/// API error response.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

/// API error body.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub code: String,
    pub message: String,
}
