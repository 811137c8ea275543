//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// User records, keyed by wallet address.
    pub const USERS: &str = "users";

    /// Index: referral code to owning wallet. Enforces code uniqueness.
    pub const USERS_BY_CODE: &str = "users_by_code";

    /// Visit records, keyed by `visit_id` (ULID).
    pub const VISITS: &str = "visits";

    /// Index: visits by code, keyed by `code || 0x00 || visit_id`.
    /// Value is empty (index only).
    pub const VISITS_BY_CODE: &str = "visits_by_code";

    /// Index: visits by referrer, keyed by `referrer || 0x00 || visit_id`.
    /// Value is empty (index only).
    pub const VISITS_BY_REFERRER: &str = "visits_by_referrer";

    /// Converted visits, keyed by `code || 0x00 || visitor`, value `visit_id`.
    /// At most one conversion exists per code and visitor.
    pub const CONVERSIONS: &str = "conversions";

    /// Index: converted visits by referrer, keyed by `referrer || 0x00 || visit_id`.
    /// Value is empty (index only).
    pub const CONVERSIONS_BY_REFERRER: &str = "conversions_by_referrer";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::USERS,
        cf::USERS_BY_CODE,
        cf::VISITS,
        cf::VISITS_BY_CODE,
        cf::VISITS_BY_REFERRER,
        cf::CONVERSIONS,
        cf::CONVERSIONS_BY_REFERRER,
    ]
}
