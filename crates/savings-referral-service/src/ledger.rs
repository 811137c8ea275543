//! Referral ledger operations.
//!
//! The ledger owns every rule about referral codes, visits and conversions. Each
//! operation validates and resolves its inputs before writing anything, and each
//! write sequence is a single atomic store operation.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use savings_referral_core::{
    format_conversion_rate, referral_link, CodeGenerator, RandomCodeGenerator, ReferralCode,
    ReferralError, Result, UserRecord, VisitRecord, WalletAddress, MAX_CODE_GENERATION_ATTEMPTS,
    RECENT_VISITS_LIMIT, REFERRAL_REWARD_POINTS,
};
use savings_referral_store::{
    CodeAssignment, ConversionRequest, ConversionResult, Store, StoreError,
};

use crate::history::{BestEffortCheck, TransactionHistory};

/// Default number of leaderboard entries.
pub const DEFAULT_LEADERBOARD_LIMIT: usize = 10;

/// Maximum number of leaderboard entries.
pub const MAX_LEADERBOARD_LIMIT: usize = 100;

/// Default time budget for the eligibility check.
pub const DEFAULT_ELIGIBILITY_TIMEOUT: Duration = Duration::from_secs(3);

/// Result of [`ReferralLedger::generate_code`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedCode {
    /// The wallet's referral code.
    pub referral_code: ReferralCode,
    /// Shareable link for the code.
    pub referral_link: String,
    /// Whether the code was created by this call.
    pub is_new: bool,
}

/// A visit to track.
#[derive(Debug, Clone)]
pub struct VisitInput {
    /// The visited code.
    pub referral_code: ReferralCode,
    /// The visitor's wallet, if connected.
    pub visitor: Option<WalletAddress>,
    /// Visitor IP.
    pub visitor_ip: Option<String>,
    /// Visitor user agent.
    pub user_agent: Option<String>,
}

/// Result of [`ReferralLedger::record_visit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisitOutcome {
    /// The visit was recorded and credited.
    Tracked {
        /// Owner of the visited code.
        referrer: WalletAddress,
    },
    /// The visitor owns the code; nothing was recorded.
    SelfReferral,
}

/// Result of [`ReferralLedger::record_conversion`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutcome {
    /// The conversion was recorded and the referrer rewarded.
    Converted {
        /// Points credited to the referrer.
        reward: i64,
        /// The rewarded referrer.
        referrer: WalletAddress,
        /// Whether a prior visit was claimed rather than a new one inserted.
        claimed_visit: bool,
    },
    /// The user had already converted through this code.
    AlreadyConverted,
    /// The user already has savings-plan transactions.
    NotNewUser,
}

/// A visit as shown in stats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitSummary {
    /// When the visit happened.
    pub timestamp: DateTime<Utc>,
    /// The visitor's wallet, if known.
    pub visitor_wallet_address: Option<WalletAddress>,
    /// Whether the visit converted.
    pub converted: bool,
}

impl From<VisitRecord> for VisitSummary {
    fn from(visit: VisitRecord) -> Self {
        Self {
            timestamp: visit.timestamp,
            visitor_wallet_address: visit.visitor_wallet_address,
            converted: visit.converted,
        }
    }
}

/// Result of [`ReferralLedger::get_stats`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferralStats {
    /// The user's code, if one was generated.
    pub referral_code: Option<ReferralCode>,
    /// Shareable link for the code.
    pub referral_link: Option<String>,
    /// Visits credited to the user.
    pub total_visits: u64,
    /// Converted visits credited to the user.
    pub total_conversions: u64,
    /// `total_conversions / total_visits` as a two-decimal percentage.
    pub conversion_rate: String,
    /// Points earned.
    pub total_rewards: i64,
    /// Most recent visits, newest first.
    pub recent_visits: Vec<VisitSummary>,
}

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
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

/// The referral ledger.
pub struct ReferralLedger {
    store: Arc<dyn Store>,
    base_url: String,
    codes: Box<dyn CodeGenerator>,
    history: Option<Arc<dyn TransactionHistory>>,
    eligibility: BestEffortCheck<bool>,
}

impl ReferralLedger {
    /// Create a ledger with random codes and no eligibility check.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, base_url: impl Into<String>) -> Self {
        Self {
            store,
            base_url: base_url.into(),
            codes: Box::new(RandomCodeGenerator),
            history: None,
            eligibility: BestEffortCheck::new(false, DEFAULT_ELIGIBILITY_TIMEOUT),
        }
    }

    /// Use a different code generator.
    #[must_use]
    pub fn with_code_generator(mut self, codes: impl CodeGenerator + 'static) -> Self {
        self.codes = Box::new(codes);
        self
    }

    /// Enable the new-user eligibility check.
    ///
    /// If the history lookup fails or exceeds `timeout`, the wallet is treated
    /// as having no prior transactions.
    #[must_use]
    pub fn with_history(mut self, history: Arc<dyn TransactionHistory>, timeout: Duration) -> Self {
        self.history = Some(history);
        self.eligibility = BestEffortCheck::new(false, timeout);
        self
    }

    /// Return the wallet's referral code, generating one on first request.
    pub fn generate_code(&self, wallet: &WalletAddress) -> Result<GeneratedCode> {
        if let Some(code) = self.store.get_user(wallet)?.and_then(|u| u.referral_code) {
            return Ok(self.generated(code, false));
        }

        for attempt in 1..=MAX_CODE_GENERATION_ATTEMPTS {
            let candidate = self.codes.generate();

            match self.store.assign_referral_code(wallet, &candidate, Utc::now()) {
                Ok(CodeAssignment::Assigned(_)) => {
                    tracing::info!(wallet = %wallet, code = %candidate, "Referral code generated");
                    return Ok(self.generated(candidate, true));
                }
                // A concurrent call assigned one first.
                Ok(CodeAssignment::Existing(code)) => return Ok(self.generated(code, false)),
                Err(StoreError::CodeTaken { .. }) => {
                    tracing::debug!(
                        wallet = %wallet,
                        code = %candidate,
                        attempt,
                        "Referral code collision, retrying"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::error!(
            wallet = %wallet,
            attempts = MAX_CODE_GENERATION_ATTEMPTS,
            "Could not generate a unique referral code"
        );
        Err(ReferralError::CodeGenerationExhausted {
            attempts: MAX_CODE_GENERATION_ATTEMPTS,
        })
    }

    /// Track a visit through a referral code.
    ///
    /// Visits by the code's owner are not recorded. Repeat visits are never
    /// deduplicated.
    pub fn record_visit(&self, input: VisitInput) -> Result<VisitOutcome> {
        let referrer = self.resolve_referrer(&input.referral_code)?;

        if input.visitor.as_ref() == Some(&referrer.wallet_address) {
            tracing::debug!(
                wallet = %referrer.wallet_address,
                code = %input.referral_code,
                "Self-referral visit not tracked"
            );
            return Ok(VisitOutcome::SelfReferral);
        }

        let visit = VisitRecord::visit(
            input.referral_code,
            referrer.wallet_address.clone(),
            input.visitor,
            input.visitor_ip,
            input.user_agent,
            Utc::now(),
        );
        self.store.record_visit(&visit)?;

        tracing::info!(
            code = %visit.referral_code,
            referrer = %visit.referrer_wallet_address,
            visit_id = %visit.id,
            anonymous = visit.visitor_wallet_address.is_none(),
            "Referral visit tracked"
        );

        Ok(VisitOutcome::Tracked {
            referrer: referrer.wallet_address,
        })
    }

    /// Convert a referred user and reward the referrer.
    pub async fn record_conversion(
        &self,
        new_user: &WalletAddress,
        code: &ReferralCode,
    ) -> Result<ConversionOutcome> {
        let referrer = self.resolve_referrer(code)?;

        if &referrer.wallet_address == new_user {
            return Err(ReferralError::SelfReferralRejected);
        }

        if self.has_prior_transactions(new_user).await {
            tracing::info!(
                new_user = %new_user,
                code = %code,
                "Conversion skipped - wallet already has transactions"
            );
            return Ok(ConversionOutcome::NotNewUser);
        }

        if self.store.has_conversion(code, new_user)? {
            return Ok(ConversionOutcome::AlreadyConverted);
        }

        let request = ConversionRequest {
            referral_code: code.clone(),
            referrer: referrer.wallet_address.clone(),
            new_user: new_user.clone(),
            reward: REFERRAL_REWARD_POINTS,
            now: Utc::now(),
        };

        match self.store.apply_conversion(&request)? {
            ConversionResult::AlreadyConverted => Ok(ConversionOutcome::AlreadyConverted),
            ConversionResult::Converted {
                claimed_visit,
                referrer,
                ..
            } => {
                tracing::info!(
                    new_user = %new_user,
                    code = %code,
                    referrer = %referrer.wallet_address,
                    referral_count = referrer.referral_count,
                    claimed_visit,
                    "Referral conversion recorded"
                );
                Ok(ConversionOutcome::Converted {
                    reward: REFERRAL_REWARD_POINTS,
                    referrer: referrer.wallet_address,
                    claimed_visit,
                })
            }
        }
    }

    /// Referral stats for a wallet.
    pub fn get_stats(&self, wallet: &WalletAddress) -> Result<ReferralStats> {
        let user = self
            .store
            .get_user(wallet)?
            .ok_or_else(|| ReferralError::UserNotFound {
                wallet: wallet.to_string(),
            })?;

        let activity = self.store.referrer_activity(wallet, RECENT_VISITS_LIMIT)?;
        let counts = activity.counts;
        let recent_visits = activity
            .recent
            .into_iter()
            .map(VisitSummary::from)
            .collect();

        Ok(ReferralStats {
            referral_link: user
                .referral_code
                .as_ref()
                .map(|code| referral_link(&self.base_url, code)),
            referral_code: user.referral_code,
            total_visits: counts.total,
            total_conversions: counts.converted,
            conversion_rate: format_conversion_rate(counts.converted, counts.total),
            total_rewards: user.total_referral_rewards,
            recent_visits,
        })
    }

    /// Top referrers by points.
    ///
    /// `limit` defaults to [`DEFAULT_LEADERBOARD_LIMIT`] and is clamped to
    /// `1..=MAX_LEADERBOARD_LIMIT`.
    pub fn leaderboard(&self, limit: Option<usize>) -> Result<Vec<LeaderboardEntry>> {
        let limit = limit
            .unwrap_or(DEFAULT_LEADERBOARD_LIMIT)
            .clamp(1, MAX_LEADERBOARD_LIMIT);

        Ok(self
            .store
            .top_referrers(limit)?
            .into_iter()
            .enumerate()
            .map(|(i, user)| LeaderboardEntry {
                rank: i + 1,
                wallet_address: user.wallet_address,
                referral_count: user.referral_count,
                total_referral_rewards: user.total_referral_rewards,
            })
            .collect())
    }

    fn resolve_referrer(&self, code: &ReferralCode) -> Result<UserRecord> {
        self.store
            .find_user_by_code(code)?
            .ok_or_else(|| ReferralError::UnknownReferralCode {
                code: code.to_string(),
            })
    }

    async fn has_prior_transactions(&self, wallet: &WalletAddress) -> bool {
        let Some(history) = &self.history else {
            return false;
        };

        self.eligibility
            .run("transactions-history", async {
                history
                    .has_prior_transactions(wallet)
                    .await
                    .map_err(|e| ReferralError::EligibilityCheckFailed(e.to_string()))
            })
            .await
    }

    fn generated(&self, code: ReferralCode, is_new: bool) -> GeneratedCode {
        GeneratedCode {
            referral_link: referral_link(&self.base_url, &code),
            referral_code: code,
            is_new,
        }
    }
}

// ============================================================================
// Input Parsing
// ============================================================================

/// Parse a required wallet field, falling back to the connected wallet.
pub fn require_wallet(
    raw: Option<String>,
    fallback: Option<&WalletAddress>,
    field: &str,
) -> Result<WalletAddress> {
    match raw.filter(|s| !s.trim().is_empty()) {
        Some(raw) => Ok(WalletAddress::parse(raw)?),
        None => fallback
            .cloned()
            .ok_or_else(|| ReferralError::InvalidInput(format!("{field} is required"))),
    }
}

/// Parse an optional wallet field; blank values count as absent.
pub fn optional_wallet(raw: Option<String>) -> Result<Option<WalletAddress>> {
    raw.filter(|s| !s.trim().is_empty())
        .map(WalletAddress::parse)
        .transpose()
        .map_err(ReferralError::from)
}

/// Parse a referral code, reporting `missing` when absent.
pub fn require_code(raw: Option<String>, missing: ReferralError) -> Result<ReferralCode> {
    let raw = raw.filter(|s| !s.trim().is_empty()).ok_or(missing)?;
    Ok(ReferralCode::parse(raw)?)
}
