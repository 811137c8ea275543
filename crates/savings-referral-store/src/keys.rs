//! Key encoding utilities for `RocksDB`.
//!
//! Composite keys join a string identifier and a suffix with a `0x00` separator.
//! Identifiers never contain control characters, so the separator can not
//! appear inside them and prefix scans never bleed into a longer identifier.

use savings_referral_core::{ReferralCode, VisitId, WalletAddress};

const SEPARATOR: u8 = 0x00;

/// Create a user key from a wallet address.
#[must_use]
pub fn user_key(wallet: &WalletAddress) -> Vec<u8> {
    wallet.as_bytes().to_vec()
}

/// Create a code index key.
#[must_use]
pub fn code_key(code: &ReferralCode) -> Vec<u8> {
    code.as_bytes().to_vec()
}

/// Create a visit key from a visit ID.
#[must_use]
pub fn visit_key(visit_id: &VisitId) -> Vec<u8> {
    visit_id.to_bytes().to_vec()
}

/// Create a prefix for iterating all visits through a code.
#[must_use]
pub fn code_visits_prefix(code: &ReferralCode) -> Vec<u8> {
    prefixed(code.as_bytes())
}

/// Create a code-visit index key.
///
/// Format: `code || 0x00 || visit_id (16 bytes)`
///
/// Since ULIDs are time-ordered, visits for a code are sorted by time.
#[must_use]
pub fn code_visit_key(code: &ReferralCode, visit_id: &VisitId) -> Vec<u8> {
    let mut key = code_visits_prefix(code);
    key.extend_from_slice(&visit_id.to_bytes());
    key
}

/// Create a prefix for iterating all visits credited to a referrer.
#[must_use]
pub fn referrer_visits_prefix(referrer: &WalletAddress) -> Vec<u8> {
    prefixed(referrer.as_bytes())
}

/// Create a referrer-visit index key.
///
/// Format: `referrer || 0x00 || visit_id (16 bytes)`
#[must_use]
pub fn referrer_visit_key(referrer: &WalletAddress, visit_id: &VisitId) -> Vec<u8> {
    let mut key = referrer_visits_prefix(referrer);
    key.extend_from_slice(&visit_id.to_bytes());
    key
}

/// Seek key for reverse iteration over a referrer's visits.
///
/// Sorts after every `referrer_visit_key` for the same referrer and before
/// any key of another referrer.
#[must_use]
pub fn referrer_visits_end(referrer: &WalletAddress) -> Vec<u8> {
    let mut key = referrer_visits_prefix(referrer);
    key.extend_from_slice(&[0xFF; 16]);
    key
}

/// Create a conversion key.
///
/// Format: `code || 0x00 || visitor`
#[must_use]
pub fn conversion_key(code: &ReferralCode, visitor: &WalletAddress) -> Vec<u8> {
    let mut key = prefixed(code.as_bytes());
    key.extend_from_slice(visitor.as_bytes());
    key
}

/// Extract the visit ID from the trailing 16 bytes of an index key.
///
/// Returns `None` if the key is too short.
#[must_use]
pub fn extract_visit_id(key: &[u8]) -> Option<VisitId> {
    let start = key.len().checked_sub(16)?;
    let bytes: [u8; 16] = key[start..].try_into().ok()?;
    Some(VisitId::from_bytes(bytes))
}

fn prefixed(id: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(id.len() + 17);
    key.extend_from_slice(id);
    key.push(SEPARATOR);
    key
}
