//! User records.
//!
//! A user record is keyed by wallet address and carries the user's referral code,
//! the counters credited to them as a referrer, and the back-reference to whoever
//! referred them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ReferralCode, WalletAddress};

/// A user in the referral ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// The user's wallet address (primary key).
    pub wallet_address: WalletAddress,

    /// The user's referral code, assigned on first request and never changed.
    pub referral_code: Option<ReferralCode>,

    /// Number of conversions credited to this user as referrer.
    pub referral_count: i64,

    /// Points earned from conversions.
    pub total_referral_rewards: i64,

    /// Number of tracked visits through this user's code.
    pub referral_visits: i64,

    /// Wallet of the user who referred this one, if any.
    pub referred_by: Option<WalletAddress>,

    /// Code through which this user was referred.
    pub referred_by_code: Option<ReferralCode>,

    /// When the last conversion was credited to this user.
    pub last_referral_conversion: Option<DateTime<Utc>>,

    /// When the last visit through this user's code was tracked.
    pub last_referral_visit: Option<DateTime<Utc>>,

    /// When this user signed up through a referral.
    pub signup_timestamp: Option<DateTime<Utc>>,

    /// When the record was created.
    pub created_at: DateTime<Utc>,

    /// When the record was last updated.
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    /// Create a record with the insert-only defaults: zeroed counters and
    /// creation timestamps.
    #[must_use]
    pub fn new(wallet_address: WalletAddress, now: DateTime<Utc>) -> Self {
        Self {
            wallet_address,
            referral_code: None,
            referral_count: 0,
            total_referral_rewards: 0,
            referral_visits: 0,
            referred_by: None,
            referred_by_code: None,
            last_referral_conversion: None,
            last_referral_visit: None,
            signup_timestamp: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Credit one converted referral worth `reward` points.
    pub fn credit_conversion(&mut self, reward: i64, now: DateTime<Utc>) {
        self.referral_count += 1;
        self.total_referral_rewards += reward;
        self.last_referral_conversion = Some(now);
        self.updated_at = now;
    }

    /// Count one tracked visit.
    pub fn credit_visit(&mut self, now: DateTime<Utc>) {
        self.referral_visits += 1;
        self.last_referral_visit = Some(now);
        self.updated_at = now;
    }
}

/// Fields applied on every upsert, whether the record is new or not.
///
/// Insert-only fields (`wallet_address`, `created_at`, zeroed counters) come from
/// [`UserRecord::new`] and are never touched here, so an upsert can not reset a
/// counter on an existing user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserUpdate {
    /// Referral code to set.
    pub referral_code: Option<ReferralCode>,
    /// Referrer wallet to set.
    pub referred_by: Option<WalletAddress>,
    /// Referrer code to set.
    pub referred_by_code: Option<ReferralCode>,
    /// Signup timestamp to set.
    pub signup_timestamp: Option<DateTime<Utc>>,
}

impl UserUpdate {
    /// Update that assigns a referral code.
    #[must_use]
    pub fn referral_code(code: ReferralCode) -> Self {
        Self {
            referral_code: Some(code),
            ..Self::default()
        }
    }

    /// Update that records who referred the user.
    #[must_use]
    pub fn referred(by: WalletAddress, code: ReferralCode, at: DateTime<Utc>) -> Self {
        Self {
            referred_by: Some(by),
            referred_by_code: Some(code),
            signup_timestamp: Some(at),
            ..Self::default()
        }
    }

    /// Apply the set fields to a record and bump `updated_at`.
    pub fn apply(&self, record: &mut UserRecord, now: DateTime<Utc>) {
        if let Some(code) = &self.referral_code {
            record.referral_code = Some(code.clone());
        }
        if let Some(by) = &self.referred_by {
            record.referred_by = Some(by.clone());
        }
        if let Some(code) = &self.referred_by_code {
            record.referred_by_code = Some(code.clone());
        }
        if let Some(at) = self.signup_timestamp {
            record.signup_timestamp = Some(at);
        }
        record.updated_at = now;
    }
}
