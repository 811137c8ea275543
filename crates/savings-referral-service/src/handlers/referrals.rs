//! Referral handlers.
//!
//! Request fields are all optional at the serde layer so that a missing field is
//! reported as a 400 with a readable message instead of a deserialization
//! rejection. Extractor rejections (no body, malformed JSON, bad query values)
//! are converted to the same `bad_request` error body.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use savings_referral_core::{ReferralCode, ReferralError, WalletAddress};

use crate::error::ApiError;
use crate::identity::CurrentUser;
use crate::ledger::{
    optional_wallet, require_code, require_wallet, ConversionOutcome, LeaderboardEntry,
    VisitInput, VisitOutcome, VisitSummary,
};
use crate::state::AppState;

/// A referrer reference in responses.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferrerRef {
    /// The referrer's wallet.
    pub wallet_address: WalletAddress,
}

// ============================================================================
// Generate
// ============================================================================

/// Generate code request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateCodeRequest {
    /// Wallet requesting a code. Defaults to the connected wallet.
    pub wallet_address: Option<String>,
}

/// Generate code response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateCodeResponse {
    /// The wallet's referral code.
    pub referral_code: ReferralCode,
    /// Shareable link.
    pub referral_link: String,
    /// Whether the code was created by this request.
    pub is_new: bool,
}

/// Get or create a wallet's referral code.
pub async fn generate_code(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    payload: Result<Json<GenerateCodeRequest>, JsonRejection>,
) -> Result<Json<GenerateCodeResponse>, ApiError> {
    let Json(req) = payload?;
    let wallet = require_wallet(
        req.wallet_address,
        user.wallet_address.as_ref(),
        "walletAddress",
    )?;

    let generated = state.ledger.generate_code(&wallet)?;

    if !generated.is_new {
        tracing::debug!(
            wallet = %wallet,
            code = %generated.referral_code,
            "Referral code retrieved"
        );
    }

    Ok(Json(GenerateCodeResponse {
        referral_code: generated.referral_code,
        referral_link: generated.referral_link,
        is_new: generated.is_new,
    }))
}

// ============================================================================
// Track
// ============================================================================

/// Track visit request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackVisitRequest {
    /// The visited referral code.
    pub referral_code: Option<String>,
    /// Visitor's wallet. Defaults to the connected wallet.
    pub visitor_wallet_address: Option<String>,
    /// Visitor IP.
    #[serde(rename = "visitorIP")]
    pub visitor_ip: Option<String>,
    /// Visitor user agent.
    pub user_agent: Option<String>,
}

/// Track visit response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackVisitResponse {
    /// Outcome message.
    pub message: String,
    /// Whether a visit was recorded.
    pub tracked: bool,
    /// Owner of the code, when the visit was recorded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer: Option<ReferrerRef>,
}

/// Track a visit through a referral link.
pub async fn track_visit(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    payload: Result<Json<TrackVisitRequest>, JsonRejection>,
) -> Result<Json<TrackVisitResponse>, ApiError> {
    let Json(req) = payload?;
    let referral_code = require_code(req.referral_code, ReferralError::MissingReferralCode)?;
    let visitor = optional_wallet(req.visitor_wallet_address)?.or(user.wallet_address);

    let outcome = state.ledger.record_visit(VisitInput {
        referral_code,
        visitor,
        visitor_ip: req.visitor_ip,
        user_agent: req.user_agent,
    })?;

    Ok(Json(match outcome {
        VisitOutcome::Tracked { referrer } => TrackVisitResponse {
            message: "Referral visit tracked".into(),
            tracked: true,
            referrer: Some(ReferrerRef {
                wallet_address: referrer,
            }),
        },
        VisitOutcome::SelfReferral => TrackVisitResponse {
            message: "Self-referral not tracked".into(),
            tracked: false,
            referrer: None,
        },
    }))
}

// ============================================================================
// Stats
// ============================================================================

/// Stats query parameters.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsQuery {
    /// Referrer wallet. Defaults to the connected wallet.
    pub wallet_address: Option<String>,
}

/// Aggregate referral stats.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsBody {
    /// Visits credited.
    pub total_visits: u64,
    /// Converted visits.
    pub total_conversions: u64,
    /// Conversion percentage, two decimals.
    pub conversion_rate: String,
    /// Points earned.
    pub total_rewards: i64,
}

/// Stats response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    /// The wallet's code, if generated.
    pub referral_code: Option<ReferralCode>,
    /// Shareable link, if a code exists.
    pub referral_link: Option<String>,
    /// Aggregates.
    pub stats: StatsBody,
    /// Most recent visits, newest first.
    pub recent_visits: Vec<VisitSummary>,
}

/// Referral stats for a wallet.
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    query: Result<Query<StatsQuery>, QueryRejection>,
) -> Result<Json<StatsResponse>, ApiError> {
    let Query(query) = query?;
    let wallet = require_wallet(
        query.wallet_address,
        user.wallet_address.as_ref(),
        "walletAddress",
    )?;

    let stats = state.ledger.get_stats(&wallet)?;

    Ok(Json(StatsResponse {
        referral_code: stats.referral_code,
        referral_link: stats.referral_link,
        stats: StatsBody {
            total_visits: stats.total_visits,
            total_conversions: stats.total_conversions,
            conversion_rate: stats.conversion_rate,
            total_rewards: stats.total_rewards,
        },
        recent_visits: stats.recent_visits,
    }))
}

// ============================================================================
// Convert
// ============================================================================

/// Conversion request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertRequest {
    /// The converting wallet. Defaults to the connected wallet.
    pub new_user_wallet_address: Option<String>,
    /// The code the user arrived through.
    pub referral_code: Option<String>,
}

/// Conversion outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionStatus {
    /// Conversion recorded and rewarded.
    Converted,
    /// The pair had already converted.
    AlreadyConverted,
    /// The wallet already has transactions.
    NotNewUser,
}

/// Conversion response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertResponse {
    /// Outcome message.
    pub message: String,
    /// Outcome.
    pub status: ConversionStatus,
    /// Points credited to the referrer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referral_reward: Option<i64>,
    /// The rewarded referrer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer: Option<ReferrerRef>,
}

/// Record a conversion and reward the referrer.
pub async fn record_conversion(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    payload: Result<Json<ConvertRequest>, JsonRejection>,
) -> Result<Json<ConvertResponse>, ApiError> {
    let Json(req) = payload?;
    let new_user = require_wallet(
        req.new_user_wallet_address,
        user.wallet_address.as_ref(),
        "newUserWalletAddress",
    )?;
    let referral_code = require_code(
        req.referral_code,
        ReferralError::InvalidInput("referralCode is required".into()),
    )?;

    let outcome = state
        .ledger
        .record_conversion(&new_user, &referral_code)
        .await?;

    Ok(Json(match outcome {
        ConversionOutcome::Converted {
            reward, referrer, ..
        } => ConvertResponse {
            message: "Referral conversion recorded".into(),
            status: ConversionStatus::Converted,
            referral_reward: Some(reward),
            referrer: Some(ReferrerRef {
                wallet_address: referrer,
            }),
        },
        ConversionOutcome::AlreadyConverted => ConvertResponse {
            message: "Referral already converted".into(),
            status: ConversionStatus::AlreadyConverted,
            referral_reward: None,
            referrer: None,
        },
        ConversionOutcome::NotNewUser => ConvertResponse {
            message: "User already has transactions, not eligible for referral".into(),
            status: ConversionStatus::NotNewUser,
            referral_reward: None,
            referrer: None,
        },
    }))
}

// ============================================================================
// Leaderboard
// ============================================================================

/// Leaderboard query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct LeaderboardQuery {
    /// Number of entries (default 10, max 100).
    pub limit: Option<usize>,
}

/// Leaderboard response.
#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    /// Top referrers, best first.
    pub leaderboard: Vec<LeaderboardEntry>,
}

/// Top referrers by points earned.
pub async fn leaderboard(
    State(state): State<Arc<AppState>>,
    query: Result<Query<LeaderboardQuery>, QueryRejection>,
) -> Result<Json<LeaderboardResponse>, ApiError> {
    let Query(query) = query?;
    let leaderboard = state.ledger.leaderboard(query.limit)?;
    Ok(Json(LeaderboardResponse { leaderboard }))
}
