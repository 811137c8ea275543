//! `RocksDB` storage layer for the savings referral ledger.
//!
//! This crate provides persistent storage for users and referral visits
//! using `RocksDB` with column families for indexing and uniqueness.
//!
//! # Architecture
//!
//! The storage uses the following column families:
//!
//! - `users`: User records, keyed by wallet address
//! - `users_by_code`: Referral code to wallet, the code uniqueness constraint
//! - `visits`: Visit records, keyed by `visit_id` (ULID)
//! - `visits_by_code` / `visits_by_referrer`: Time-ordered visit indexes
//! - `conversions`: One entry per converted `(code, visitor)` pair
//! - `conversions_by_referrer`: Converted visits per referrer, for counting
//!
//! Compound operations run under a store-wide write lock and commit a single
//! `WriteBatch`, so each one is applied completely or not at all.
//!
//! # Example
//!
//! ```no_run
//! use chrono::Utc;
//! use savings_referral_core::{ReferralCode, WalletAddress};
//! use savings_referral_store::{CodeAssignment, RocksStore, Store};
//!
//! let store = RocksStore::open("/tmp/savings-referral-db").unwrap();
//!
//! let wallet = WalletAddress::parse("0xAAA").unwrap();
//! let code = ReferralCode::parse("XYZ99999").unwrap();
//! match store.assign_referral_code(&wallet, &code, Utc::now()).unwrap() {
//!     CodeAssignment::Assigned(user) => println!("assigned {:?}", user.referral_code),
//!     CodeAssignment::Existing(code) => println!("already has {code}"),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use rocks::RocksStore;

use chrono::{DateTime, Utc};
use savings_referral_core::{ReferralCode, UserRecord, UserUpdate, VisitRecord, WalletAddress};

/// Result of assigning a referral code to a wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeAssignment {
    /// The wallet already had a code; nothing was written.
    Existing(ReferralCode),
    /// The code was assigned; the record as stored.
    Assigned(UserRecord),
}

/// Input for [`Store::apply_conversion`].
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    /// The code used to convert.
    pub referral_code: ReferralCode,
    /// Owner of the code.
    pub referrer: WalletAddress,
    /// The newly referred wallet.
    pub new_user: WalletAddress,
    /// Points credited to the referrer.
    pub reward: i64,
    /// Conversion time.
    pub now: DateTime<Utc>,
}

/// Result of [`Store::apply_conversion`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionResult {
    /// The pair was already converted; nothing was written.
    AlreadyConverted,
    /// The conversion was recorded.
    Converted {
        /// The converted visit as stored.
        visit: VisitRecord,
        /// Whether an existing visit was claimed rather than a new one inserted.
        claimed_visit: bool,
        /// The referrer after crediting.
        referrer: UserRecord,
    },
}

/// Visit totals for a referrer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VisitCounts {
    /// All visits credited to the referrer.
    pub total: u64,
    /// Visits that converted.
    pub converted: u64,
}

/// A referrer's visit totals and most recent visits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferrerActivity {
    /// Totals over every visit credited to the referrer.
    pub counts: VisitCounts,
    /// The newest visits, newest first.
    pub recent: Vec<VisitRecord>,
}

/// The storage trait defining all database operations.
///
/// This trait abstracts the storage layer, allowing for different implementations.
pub trait Store: Send + Sync {
    // =========================================================================
    // User Operations
    // =========================================================================

    /// Get a user by wallet address.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_user(&self, wallet: &WalletAddress) -> Result<Option<UserRecord>>;

    /// Find the user that owns a referral code.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn find_user_by_code(&self, code: &ReferralCode) -> Result<Option<UserRecord>>;

    /// Create or update a user.
    ///
    /// `update` is applied in both cases; the insert-only defaults of
    /// [`UserRecord::new`] are used only when the user does not exist yet.
    /// Returns the stored record and whether it was inserted.
    ///
    /// # Errors
    ///
    /// - `StoreError::CodeTaken` if `update` sets a code owned by another wallet.
    fn upsert_user(
        &self,
        wallet: &WalletAddress,
        update: &UserUpdate,
        now: DateTime<Utc>,
    ) -> Result<(UserRecord, bool)>;

    /// Assign a referral code to a wallet, creating the user if needed.
    ///
    /// # Errors
    ///
    /// - `StoreError::CodeTaken` if another wallet owns `code`.
    fn assign_referral_code(
        &self,
        wallet: &WalletAddress,
        code: &ReferralCode,
        now: DateTime<Utc>,
    ) -> Result<CodeAssignment>;

    /// Users with at least one conversion, best first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn top_referrers(&self, limit: usize) -> Result<Vec<UserRecord>>;

    // =========================================================================
    // Visit Operations
    // =========================================================================

    /// Record a visit and credit it to the referrer.
    ///
    /// Returns the referrer after the update.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the referrer does not exist.
    fn record_visit(&self, visit: &VisitRecord) -> Result<UserRecord>;

    /// Check if `visitor` already converted through `code`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn has_conversion(&self, code: &ReferralCode, visitor: &WalletAddress) -> Result<bool>;

    /// Visit totals for a referrer plus its `recent_limit` newest visits.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn referrer_activity(
        &self,
        referrer: &WalletAddress,
        recent_limit: usize,
    ) -> Result<ReferrerActivity>;

    // =========================================================================
    // Compound Operations
    // =========================================================================

    /// Record a conversion atomically.
    ///
    /// Claims the most recent claimable visit for the code (or inserts a
    /// converted one), credits the referrer, and records the referral on the
    /// new user.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the referrer does not exist.
    fn apply_conversion(&self, request: &ConversionRequest) -> Result<ConversionResult>;
}
