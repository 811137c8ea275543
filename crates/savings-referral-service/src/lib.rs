//! Savings Referral HTTP API Service.
//!
//! This crate provides the HTTP API for the referral ledger, including:
//!
//! - Referral code generation
//! - Visit tracking and referrer stats
//! - Conversion reconciliation and rewards
//! - The referral leaderboard
//!
//! # Identity
//!
//! Callers identify themselves by wallet address, either in the request body or
//! query, or through the optional `x-wallet-address` header (see [`CurrentUser`]).

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Handlers are async for a uniform router signature

pub mod config;
pub mod error;
pub mod handlers;
pub mod history;
pub mod identity;
pub mod ledger;
pub mod routes;
pub mod state;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use history::{BestEffortCheck, TransactionHistory, TransactionsClient};
pub use identity::CurrentUser;
pub use ledger::ReferralLedger;
pub use routes::create_router;
pub use state::AppState;
