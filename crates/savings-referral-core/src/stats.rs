//! Helpers for stats and link formatting.

use crate::ReferralCode;

/// Format a conversion rate as a percentage with two decimals.
///
/// Returns `"0.00"` when there are no visits.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_conversion_rate(conversions: u64, visits: u64) -> String {
    if visits == 0 {
        return "0.00".to_string();
    }
    format!("{:.2}", conversions as f64 / visits as f64 * 100.0)
}

/// Build the shareable link for a code: `<base-url>/ref/<code>`.
#[must_use]
pub fn referral_link(base_url: &str, code: &ReferralCode) -> String {
    format!("{}/ref/{}", base_url.trim_end_matches('/'), code)
}
