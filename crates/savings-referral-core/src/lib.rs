//! Core types and utilities for the savings referral ledger.
//!
//! This crate provides the foundational types shared by the store and the service:
//!
//! - **Identifiers**: `WalletAddress`, `ReferralCode`, `VisitId`
//! - **Users**: `UserRecord`, `UserUpdate`
//! - **Visits**: `VisitRecord`
//! - **Codes**: `CodeGenerator`, `RandomCodeGenerator`
//!
//! # Reward Policy
//!
//! Every successful conversion credits the referrer with
//! [`REFERRAL_REWARD_POINTS`] points and one referral. Both are fixed policy
//! values with no configuration surface.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod code;
pub mod error;
pub mod ids;
pub mod stats;
pub mod user;
pub mod visit;

pub use code::{CodeGenerator, RandomCodeGenerator, CODE_ALPHABET};
pub use error::{ReferralError, Result};
pub use ids::{IdError, ReferralCode, VisitId, WalletAddress};
pub use stats::{format_conversion_rate, referral_link};
pub use user::{UserRecord, UserUpdate};
pub use visit::VisitRecord;

/// Points credited to a referrer for each converted referral.
pub const REFERRAL_REWARD_POINTS: i64 = 5;

/// Length of generated referral codes.
pub const REFERRAL_CODE_LENGTH: usize = 8;

/// Upper bound on code generation attempts before giving up.
pub const MAX_CODE_GENERATION_ATTEMPTS: u32 = 20;

/// Number of visits returned in a stats response.
pub const RECENT_VISITS_LIMIT: usize = 10;
