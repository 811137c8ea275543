//! Visit records.
//!
//! One record is written per tracked visit or direct conversion. Records are
//! append-mostly: the only mutation is flipping `converted` to true, once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ReferralCode, VisitId, WalletAddress};

/// A visit through a referral code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitRecord {
    /// Visit identifier.
    pub id: VisitId,

    /// The code that was visited.
    pub referral_code: ReferralCode,

    /// Owner of the code at the time of the visit.
    pub referrer_wallet_address: WalletAddress,

    /// The visitor's wallet, or `None` for an anonymous pre-connect visit.
    pub visitor_wallet_address: Option<WalletAddress>,

    /// Visitor IP, if supplied.
    #[serde(rename = "visitorIP")]
    pub visitor_ip: Option<String>,

    /// Visitor user agent, if supplied.
    pub user_agent: Option<String>,

    /// When the visit happened.
    pub timestamp: DateTime<Utc>,

    /// Whether the visit led to a conversion.
    pub converted: bool,

    /// When the conversion happened.
    pub conversion_timestamp: Option<DateTime<Utc>>,
}

impl VisitRecord {
    /// Create an unconverted visit.
    #[must_use]
    pub fn visit(
        referral_code: ReferralCode,
        referrer: WalletAddress,
        visitor: Option<WalletAddress>,
        visitor_ip: Option<String>,
        user_agent: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: VisitId::generate(),
            referral_code,
            referrer_wallet_address: referrer,
            visitor_wallet_address: visitor,
            visitor_ip,
            user_agent,
            timestamp: now,
            converted: false,
            conversion_timestamp: None,
        }
    }

    /// Create a visit that is converted on arrival, for users who convert
    /// without any tracked visit.
    #[must_use]
    pub fn conversion(
        referral_code: ReferralCode,
        referrer: WalletAddress,
        visitor: WalletAddress,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: VisitId::generate(),
            referral_code,
            referrer_wallet_address: referrer,
            visitor_wallet_address: Some(visitor),
            visitor_ip: None,
            user_agent: None,
            timestamp: now,
            converted: true,
            conversion_timestamp: Some(now),
        }
    }

    /// Whether a conversion by `visitor` may claim this visit.
    ///
    /// Unconverted visits by the same wallet or by an anonymous visitor qualify.
    #[must_use]
    pub fn is_claimable_by(&self, visitor: &WalletAddress) -> bool {
        !self.converted
            && self
                .visitor_wallet_address
                .as_ref()
                .map_or(true, |w| w == visitor)
    }

    /// Mark the visit converted by `visitor`.
    ///
    /// Returns `false` and leaves the record untouched if it was already converted.
    pub fn claim(&mut self, visitor: WalletAddress, now: DateTime<Utc>) -> bool {
        if self.converted {
            return false;
        }
        self.converted = true;
        self.visitor_wallet_address = Some(visitor);
        self.conversion_timestamp = Some(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wallet(s: &str) -> WalletAddress {
        WalletAddress::parse(s).unwrap()
    }

    fn code() -> ReferralCode {
        ReferralCode::parse("ABCD1234").unwrap()
    }

    #[test]
    fn anonymous_visit_is_claimable_by_anyone() {
        let visit = VisitRecord::visit(code(), wallet("0xR"), None, None, None, Utc::now());
        assert!(visit.is_claimable_by(&wallet("0xNewUser")));
    }

    #[test]
    fn visit_by_other_wallet_is_not_claimable() {
        let visit = VisitRecord::visit(
            code(),
            wallet("0xR"),
            Some(wallet("0xOther")),
            None,
            None,
            Utc::now(),
        );
        assert!(!visit.is_claimable_by(&wallet("0xNewUser")));
        assert!(visit.is_claimable_by(&wallet("0xOther")));
    }

    #[test]
    fn claim_flips_once() {
        let now = Utc::now();
        let mut visit = VisitRecord::visit(code(), wallet("0xR"), None, None, None, now);

        assert!(visit.claim(wallet("0xNewUser"), now));
        assert!(visit.converted);
        assert_eq!(visit.visitor_wallet_address, Some(wallet("0xNewUser")));
        assert_eq!(visit.conversion_timestamp, Some(now));

        assert!(!visit.claim(wallet("0xSomeoneElse"), now));
        assert_eq!(visit.visitor_wallet_address, Some(wallet("0xNewUser")));
        assert!(!visit.is_claimable_by(&wallet("0xNewUser")));
    }

    #[test]
    fn direct_conversion_sets_both_timestamps() {
        let now = Utc::now();
        let visit = VisitRecord::conversion(code(), wallet("0xR"), wallet("0xNewUser"), now);
        assert!(visit.converted);
        assert_eq!(visit.timestamp, now);
        assert_eq!(visit.conversion_timestamp, Some(now));
    }

    #[test]
    fn serializes_camel_case() {
        let visit = VisitRecord::visit(
            code(),
            wallet("0xR"),
            None,
            Some("10.0.0.1".into()),
            None,
            Utc::now(),
        );
        let json = serde_json::to_value(&visit).unwrap();
        assert_eq!(json["referralCode"], "ABCD1234");
        assert_eq!(json["visitorIP"], "10.0.0.1");
        assert!(json["visitorWalletAddress"].is_null());
    }
}
