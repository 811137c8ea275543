//! Savings Referral Client SDK.
//!
//! This crate provides a client library for frontends and services to interact
//! with the referral API.
//!
//! # Example
//!
//! ```no_run
//! use savings_referral_client::{ConvertResult, ReferralClient};
//!
//! # async fn example() -> Result<(), savings_referral_client::ClientError> {
//! let client = ReferralClient::new("http://savings-referral:8080")?;
//!
//! let generated = client.generate_code("0xAAA").await?;
//! println!("Share {}", generated.referral_link);
//!
//! if let ConvertResult::Converted { referral_reward, .. } =
//!     client.record_conversion("0xBBB", generated.referral_code.as_str()).await?
//! {
//!     println!("Referrer earned {referral_reward} points");
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod client;
mod error;
mod types;

pub use client::{ClientOptions, ReferralClient};
pub use error::ClientError;
pub use types::*;
