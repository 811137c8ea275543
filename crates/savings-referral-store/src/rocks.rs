//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait.

use std::cmp::Reverse;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, WriteBatch,
};

use savings_referral_core::{
    ReferralCode, UserRecord, UserUpdate, VisitRecord, WalletAddress,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::{
    CodeAssignment, ConversionRequest, ConversionResult, ReferrerActivity, Store, VisitCounts,
};

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    /// Serializes read-modify-write operations.
    write_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Mutex::new(()),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| StoreError::Database("write lock poisoned".into()))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn get_raw(&self, cf_name: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let cf = self.cf(cf_name)?;
        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn get_visit(&self, key: &[u8]) -> Result<Option<VisitRecord>> {
        self.get_raw(cf::VISITS, key)?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn code_owner(&self, code: &ReferralCode) -> Result<Option<WalletAddress>> {
        let Some(data) = self.get_raw(cf::USERS_BY_CODE, &keys::code_key(code))? else {
            return Ok(None);
        };
        let wallet =
            String::from_utf8(data).map_err(|e| StoreError::Serialization(e.to_string()))?;
        WalletAddress::parse(wallet)
            .map(Some)
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Collect all index keys under a prefix, in key order.
    fn prefix_keys(&self, cf_name: &str, prefix: &[u8]) -> Result<Vec<Vec<u8>>> {
        let cf = self.cf(cf_name)?;
        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(prefix, Direction::Forward));

        let mut found = Vec::new();
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;

            if !key.starts_with(prefix) {
                break;
            }

            found.push(key.to_vec());
        }
        Ok(found)
    }

    /// Count index keys under a prefix without reading values.
    fn count_prefix(&self, cf_name: &str, prefix: &[u8]) -> Result<u64> {
        let cf = self.cf(cf_name)?;
        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(prefix, Direction::Forward));

        let mut count = 0;
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(prefix) {
                break;
            }
            count += 1;
        }
        Ok(count)
    }

    /// Load every visit referenced by an index prefix.
    fn load_indexed_visits(&self, index_cf: &str, prefix: &[u8]) -> Result<Vec<VisitRecord>> {
        let mut visits = Vec::new();
        for key in self.prefix_keys(index_cf, prefix)? {
            let Some(visit_id) = keys::extract_visit_id(&key) else {
                tracing::warn!(index = index_cf, "Skipping malformed visit index key");
                continue;
            };
            if let Some(visit) = self.get_visit(&keys::visit_key(&visit_id))? {
                visits.push(visit);
            }
        }
        Ok(visits)
    }

    fn stage_user(&self, batch: &mut WriteBatch, user: &UserRecord) -> Result<()> {
        let cf_users = self.cf(cf::USERS)?;
        batch.put_cf(
            &cf_users,
            keys::user_key(&user.wallet_address),
            Self::serialize(user)?,
        );
        Ok(())
    }

    /// Stage a visit together with its index entries.
    fn stage_visit(&self, batch: &mut WriteBatch, visit: &VisitRecord) -> Result<()> {
        let cf_visits = self.cf(cf::VISITS)?;
        let cf_by_code = self.cf(cf::VISITS_BY_CODE)?;
        let cf_by_referrer = self.cf(cf::VISITS_BY_REFERRER)?;

        batch.put_cf(&cf_visits, keys::visit_key(&visit.id), Self::serialize(visit)?);
        batch.put_cf(
            &cf_by_code,
            keys::code_visit_key(&visit.referral_code, &visit.id),
            [],
        );
        batch.put_cf(
            &cf_by_referrer,
            keys::referrer_visit_key(&visit.referrer_wallet_address, &visit.id),
            [],
        );

        if visit.converted {
            let cf_referrer_conversions = self.cf(cf::CONVERSIONS_BY_REFERRER)?;
            batch.put_cf(
                &cf_referrer_conversions,
                keys::referrer_visit_key(&visit.referrer_wallet_address, &visit.id),
                [],
            );

            if let Some(visitor) = &visit.visitor_wallet_address {
                let cf_conversions = self.cf(cf::CONVERSIONS)?;
                batch.put_cf(
                    &cf_conversions,
                    keys::conversion_key(&visit.referral_code, visitor),
                    visit.id.to_bytes(),
                );
            }
        }
        Ok(())
    }

    /// Stage an upsert. Must be called with the write lock held.
    ///
    /// A code is only set on a user that has none, and only if no other wallet
    /// owns it.
    fn stage_upsert(
        &self,
        batch: &mut WriteBatch,
        wallet: &WalletAddress,
        update: &UserUpdate,
        now: DateTime<Utc>,
    ) -> Result<(UserRecord, bool)> {
        let (mut user, inserted) = match self.get_user(wallet)? {
            Some(user) => (user, false),
            None => (UserRecord::new(wallet.clone(), now), true),
        };

        let mut update = update.clone();
        if user.referral_code.is_some() {
            update.referral_code = None;
        }

        if let Some(code) = &update.referral_code {
            if let Some(owner) = self.code_owner(code)? {
                if &owner != wallet {
                    return Err(StoreError::CodeTaken {
                        code: code.to_string(),
                    });
                }
            }
            let cf_by_code = self.cf(cf::USERS_BY_CODE)?;
            batch.put_cf(&cf_by_code, keys::code_key(code), wallet.as_bytes());
        }

        update.apply(&mut user, now);
        self.stage_user(batch, &user)?;

        Ok((user, inserted))
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}

impl Store for RocksStore {
    // =========================================================================
    // User Operations
    // =========================================================================

    fn get_user(&self, wallet: &WalletAddress) -> Result<Option<UserRecord>> {
        self.get_raw(cf::USERS, &keys::user_key(wallet))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn find_user_by_code(&self, code: &ReferralCode) -> Result<Option<UserRecord>> {
        match self.code_owner(code)? {
            Some(wallet) => self.get_user(&wallet),
            None => Ok(None),
        }
    }

    fn upsert_user(
        &self,
        wallet: &WalletAddress,
        update: &UserUpdate,
        now: DateTime<Utc>,
    ) -> Result<(UserRecord, bool)> {
        let _guard = self.lock()?;

        let mut batch = WriteBatch::default();
        let result = self.stage_upsert(&mut batch, wallet, update, now)?;
        self.write(batch)?;

        Ok(result)
    }

    fn assign_referral_code(
        &self,
        wallet: &WalletAddress,
        code: &ReferralCode,
        now: DateTime<Utc>,
    ) -> Result<CodeAssignment> {
        let _guard = self.lock()?;

        if let Some(existing) = self.get_user(wallet)?.and_then(|u| u.referral_code) {
            return Ok(CodeAssignment::Existing(existing));
        }

        let mut batch = WriteBatch::default();
        let (user, _) =
            self.stage_upsert(&mut batch, wallet, &UserUpdate::referral_code(code.clone()), now)?;
        self.write(batch)?;

        Ok(CodeAssignment::Assigned(user))
    }

    fn top_referrers(&self, limit: usize) -> Result<Vec<UserRecord>> {
        let cf_users = self.cf(cf::USERS)?;

        let mut users = Vec::new();
        for item in self.db.iterator_cf(&cf_users, IteratorMode::Start) {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            let user: UserRecord = Self::deserialize(&value)?;
            if user.referral_count > 0 {
                users.push(user);
            }
        }

        users.sort_by(|a, b| {
            b.total_referral_rewards
                .cmp(&a.total_referral_rewards)
                .then(b.referral_count.cmp(&a.referral_count))
                .then_with(|| a.wallet_address.cmp(&b.wallet_address))
        });
        users.truncate(limit);

        Ok(users)
    }

    // =========================================================================
    // Visit Operations
    // =========================================================================

    fn record_visit(&self, visit: &VisitRecord) -> Result<UserRecord> {
        let _guard = self.lock()?;

        let mut referrer = self
            .get_user(&visit.referrer_wallet_address)?
            .ok_or_else(|| StoreError::NotFound {
                entity: "user",
                id: visit.referrer_wallet_address.to_string(),
            })?;
        referrer.credit_visit(visit.timestamp);

        let mut batch = WriteBatch::default();
        self.stage_visit(&mut batch, visit)?;
        self.stage_user(&mut batch, &referrer)?;
        self.write(batch)?;

        Ok(referrer)
    }

    fn has_conversion(&self, code: &ReferralCode, visitor: &WalletAddress) -> Result<bool> {
        Ok(self
            .get_raw(cf::CONVERSIONS, &keys::conversion_key(code, visitor))?
            .is_some())
    }

    fn referrer_activity(
        &self,
        referrer: &WalletAddress,
        recent_limit: usize,
    ) -> Result<ReferrerActivity> {
        let prefix = keys::referrer_visits_prefix(referrer);
        let end = keys::referrer_visits_end(referrer);
        let cf_by_referrer = self.cf(cf::VISITS_BY_REFERRER)?;

        // ULID keys sort by creation time, so a reverse scan yields newest first.
        let iter = self
            .db
            .iterator_cf(&cf_by_referrer, IteratorMode::From(&end, Direction::Reverse));

        let mut total = 0;
        let mut recent = Vec::with_capacity(recent_limit);
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            total += 1;

            if recent.len() < recent_limit {
                let Some(visit_id) = keys::extract_visit_id(&key) else {
                    tracing::warn!(
                        index = cf::VISITS_BY_REFERRER,
                        "Skipping malformed visit index key"
                    );
                    continue;
                };
                if let Some(visit) = self.get_visit(&keys::visit_key(&visit_id))? {
                    recent.push(visit);
                }
            }
        }

        // Equal timestamps fall back to insertion order.
        recent.sort_by_key(|v| Reverse((v.timestamp, v.id)));

        let converted = self.count_prefix(cf::CONVERSIONS_BY_REFERRER, &prefix)?;

        Ok(ReferrerActivity {
            counts: VisitCounts { total, converted },
            recent,
        })
    }

    // =========================================================================
    // Compound Operations
    // =========================================================================

    fn apply_conversion(&self, request: &ConversionRequest) -> Result<ConversionResult> {
        let _guard = self.lock()?;

        if self.has_conversion(&request.referral_code, &request.new_user)? {
            return Ok(ConversionResult::AlreadyConverted);
        }

        let mut referrer = self
            .get_user(&request.referrer)?
            .ok_or_else(|| StoreError::NotFound {
                entity: "user",
                id: request.referrer.to_string(),
            })?;

        let claimable = self
            .load_indexed_visits(
                cf::VISITS_BY_CODE,
                &keys::code_visits_prefix(&request.referral_code),
            )?
            .into_iter()
            .filter(|v| v.is_claimable_by(&request.new_user))
            .max_by_key(|v| (v.timestamp, v.id));

        let (visit, claimed_visit) = match claimable {
            Some(mut visit) => {
                visit.claim(request.new_user.clone(), request.now);
                (visit, true)
            }
            None => (
                VisitRecord::conversion(
                    request.referral_code.clone(),
                    request.referrer.clone(),
                    request.new_user.clone(),
                    request.now,
                ),
                false,
            ),
        };

        referrer.credit_conversion(request.reward, request.now);

        let mut batch = WriteBatch::default();
        self.stage_visit(&mut batch, &visit)?;
        self.stage_user(&mut batch, &referrer)?;

        // First attribution wins: an already-referred user keeps its referrer.
        let already_referred = self
            .get_user(&request.new_user)?
            .is_some_and(|u| u.referred_by.is_some());
        let update = if already_referred {
            UserUpdate::default()
        } else {
            UserUpdate::referred(
                request.referrer.clone(),
                request.referral_code.clone(),
                request.now,
            )
        };
        self.stage_upsert(&mut batch, &request.new_user, &update, request.now)?;

        self.write(batch)?;

        tracing::debug!(
            code = %request.referral_code,
            new_user = %request.new_user,
            visit_id = %visit.id,
            claimed_visit,
            "Conversion written"
        );

        Ok(ConversionResult::Converted {
            visit,
            claimed_visit,
            referrer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::time::Duration;
    use tempfile::TempDir;

    fn create_test_store() -> (RocksStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        (store, dir)
    }

    fn wallet(s: &str) -> WalletAddress {
        WalletAddress::parse(s).unwrap()
    }

    fn code(s: &str) -> ReferralCode {
        ReferralCode::parse(s).unwrap()
    }

    fn referrer_with_code(store: &RocksStore, w: &str, c: &str) -> UserRecord {
        match store
            .assign_referral_code(&wallet(w), &code(c), Utc::now())
            .unwrap()
        {
            CodeAssignment::Assigned(user) => user,
            CodeAssignment::Existing(_) => panic!("code already assigned"),
        }
    }

    fn anonymous_visit(c: &str, referrer: &str) -> VisitRecord {
        VisitRecord::visit(code(c), wallet(referrer), None, None, None, Utc::now())
    }

    fn conversion(c: &str, referrer: &str, new_user: &str) -> ConversionRequest {
        ConversionRequest {
            referral_code: code(c),
            referrer: wallet(referrer),
            new_user: wallet(new_user),
            reward: 5,
            now: Utc::now(),
        }
    }

    #[test]
    fn assign_code_creates_user() {
        let (store, _dir) = create_test_store();

        let user = referrer_with_code(&store, "0xAAA", "ABCD1234");
        assert_eq!(user.referral_code, Some(code("ABCD1234")));
        assert_eq!(user.referral_count, 0);
        assert_eq!(user.total_referral_rewards, 0);

        let found = store.find_user_by_code(&code("ABCD1234")).unwrap().unwrap();
        assert_eq!(found.wallet_address, wallet("0xAAA"));
    }

    #[test]
    fn assign_code_is_idempotent_per_wallet() {
        let (store, _dir) = create_test_store();
        referrer_with_code(&store, "0xAAA", "ABCD1234");

        let second = store
            .assign_referral_code(&wallet("0xAAA"), &code("ZZZZ0000"), Utc::now())
            .unwrap();
        assert_eq!(second, CodeAssignment::Existing(code("ABCD1234")));
        assert!(store.find_user_by_code(&code("ZZZZ0000")).unwrap().is_none());
    }

    #[test]
    fn assign_code_rejects_taken_code() {
        let (store, _dir) = create_test_store();
        referrer_with_code(&store, "0xAAA", "ABCD1234");

        let result = store.assign_referral_code(&wallet("0xBBB"), &code("ABCD1234"), Utc::now());
        assert!(matches!(result, Err(StoreError::CodeTaken { .. })));
        assert!(store.get_user(&wallet("0xBBB")).unwrap().is_none());
    }

    #[test]
    fn upsert_keeps_counters_and_created_at() {
        let (store, _dir) = create_test_store();
        let original = referrer_with_code(&store, "0xAAA", "ABCD1234");
        store.record_visit(&anonymous_visit("ABCD1234", "0xAAA")).unwrap();

        let (updated, inserted) = store
            .upsert_user(&wallet("0xAAA"), &UserUpdate::default(), Utc::now())
            .unwrap();

        assert!(!inserted);
        assert_eq!(updated.referral_visits, 1);
        assert_eq!(updated.created_at, original.created_at);
        assert_eq!(updated.referral_code, Some(code("ABCD1234")));
    }

    #[test]
    fn record_visit_increments_referrer() {
        let (store, _dir) = create_test_store();
        referrer_with_code(&store, "0xAAA", "ABCD1234");

        let visit = anonymous_visit("ABCD1234", "0xAAA");
        let referrer = store.record_visit(&visit).unwrap();
        assert_eq!(referrer.referral_visits, 1);
        assert_eq!(referrer.last_referral_visit, Some(visit.timestamp));

        let activity = store.referrer_activity(&wallet("0xAAA"), 10).unwrap();
        assert_eq!(activity.counts, VisitCounts { total: 1, converted: 0 });
        assert_eq!(activity.recent, vec![visit]);
    }

    #[test]
    fn record_visit_unknown_referrer_fails() {
        let (store, _dir) = create_test_store();
        let result = store.record_visit(&anonymous_visit("ABCD1234", "0xNobody"));
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn conversion_claims_anonymous_visit() {
        let (store, _dir) = create_test_store();
        referrer_with_code(&store, "0xAAA", "ABCD1234");
        let visit = anonymous_visit("ABCD1234", "0xAAA");
        store.record_visit(&visit).unwrap();

        let result = store
            .apply_conversion(&conversion("ABCD1234", "0xAAA", "0xNewUser"))
            .unwrap();

        let ConversionResult::Converted {
            visit: converted,
            claimed_visit,
            referrer,
        } = result
        else {
            panic!("expected conversion");
        };
        assert!(claimed_visit);
        assert_eq!(converted.id, visit.id);
        assert_eq!(converted.visitor_wallet_address, Some(wallet("0xNewUser")));
        assert!(converted.converted);
        assert_eq!(referrer.referral_count, 1);
        assert_eq!(referrer.total_referral_rewards, 5);

        let activity = store.referrer_activity(&wallet("0xAAA"), 10).unwrap();
        assert_eq!(activity.counts, VisitCounts { total: 1, converted: 1 });
        assert!(activity.recent[0].converted);

        let new_user = store.get_user(&wallet("0xNewUser")).unwrap().unwrap();
        assert_eq!(new_user.referred_by, Some(wallet("0xAAA")));
        assert_eq!(new_user.referred_by_code, Some(code("ABCD1234")));
        assert_eq!(new_user.referral_count, 0);
    }

    #[test]
    fn conversion_claims_most_recent_visit() {
        let (store, _dir) = create_test_store();
        referrer_with_code(&store, "0xAAA", "ABCD1234");

        let older = anonymous_visit("ABCD1234", "0xAAA");
        store.record_visit(&older).unwrap();
        std::thread::sleep(Duration::from_millis(2));
        let newer = anonymous_visit("ABCD1234", "0xAAA");
        store.record_visit(&newer).unwrap();

        let result = store
            .apply_conversion(&conversion("ABCD1234", "0xAAA", "0xNewUser"))
            .unwrap();
        let ConversionResult::Converted { visit, .. } = result else {
            panic!("expected conversion");
        };
        assert_eq!(visit.id, newer.id);
    }

    #[test]
    fn conversion_skips_other_visitors() {
        let (store, _dir) = create_test_store();
        referrer_with_code(&store, "0xAAA", "ABCD1234");
        let other = VisitRecord::visit(
            code("ABCD1234"),
            wallet("0xAAA"),
            Some(wallet("0xOther")),
            None,
            None,
            Utc::now(),
        );
        store.record_visit(&other).unwrap();

        let result = store
            .apply_conversion(&conversion("ABCD1234", "0xAAA", "0xNewUser"))
            .unwrap();
        let ConversionResult::Converted { claimed_visit, .. } = result else {
            panic!("expected conversion");
        };
        assert!(!claimed_visit);

        let activity = store.referrer_activity(&wallet("0xAAA"), 10).unwrap();
        assert_eq!(activity.counts, VisitCounts { total: 2, converted: 1 });
    }

    #[test]
    fn conversion_without_visit_inserts_record() {
        let (store, _dir) = create_test_store();
        referrer_with_code(&store, "0xAAA", "ABCD1234");

        let result = store
            .apply_conversion(&conversion("ABCD1234", "0xAAA", "0xNewUser"))
            .unwrap();
        let ConversionResult::Converted {
            visit,
            claimed_visit,
            ..
        } = result
        else {
            panic!("expected conversion");
        };
        assert!(!claimed_visit);
        assert_eq!(visit.referrer_wallet_address, wallet("0xAAA"));
        assert!(visit.conversion_timestamp.is_some());
        assert!(store
            .has_conversion(&code("ABCD1234"), &wallet("0xNewUser"))
            .unwrap());
    }

    #[test]
    fn conversion_is_idempotent() {
        let (store, _dir) = create_test_store();
        referrer_with_code(&store, "0xAAA", "ABCD1234");

        store
            .apply_conversion(&conversion("ABCD1234", "0xAAA", "0xNewUser"))
            .unwrap();
        let second = store
            .apply_conversion(&conversion("ABCD1234", "0xAAA", "0xNewUser"))
            .unwrap();
        assert_eq!(second, ConversionResult::AlreadyConverted);

        let referrer = store.get_user(&wallet("0xAAA")).unwrap().unwrap();
        assert_eq!(referrer.referral_count, 1);
        assert_eq!(referrer.total_referral_rewards, 5);
    }

    #[test]
    fn concurrent_conversions_credit_once() {
        const THREADS: usize = 8;

        let (store, _dir) = create_test_store();
        referrer_with_code(&store, "0xAAA", "ABCD1234");
        store.record_visit(&anonymous_visit("ABCD1234", "0xAAA")).unwrap();

        let request = conversion("ABCD1234", "0xAAA", "0xNewUser");
        let barrier = Barrier::new(THREADS);

        let results: Vec<ConversionResult> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    let (store, request, barrier) = (&store, &request, &barrier);
                    s.spawn(move || {
                        barrier.wait();
                        store.apply_conversion(request).unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let converted = results
            .iter()
            .filter(|r| matches!(r, ConversionResult::Converted { .. }))
            .count();
        assert_eq!(converted, 1);
        assert_eq!(
            results
                .iter()
                .filter(|r| **r == ConversionResult::AlreadyConverted)
                .count(),
            THREADS - 1
        );

        let referrer = store.get_user(&wallet("0xAAA")).unwrap().unwrap();
        assert_eq!(referrer.referral_count, 1);
        assert_eq!(referrer.total_referral_rewards, 5);

        let activity = store.referrer_activity(&wallet("0xAAA"), 10).unwrap();
        assert_eq!(activity.counts, VisitCounts { total: 1, converted: 1 });
        assert_eq!(activity.recent.iter().filter(|v| v.converted).count(), 1);
    }

    #[test]
    fn concurrent_code_assignment_keeps_one_code() {
        const THREADS: usize = 8;
        const CODES: [&str; THREADS] = [
            "CODE0000", "CODE1111", "CODE2222", "CODE3333", "CODE4444", "CODE5555", "CODE6666",
            "CODE7777",
        ];

        let (store, _dir) = create_test_store();
        let barrier = Barrier::new(THREADS);

        let results: Vec<CodeAssignment> = std::thread::scope(|s| {
            let handles: Vec<_> = CODES
                .iter()
                .map(|c| {
                    let store = &store;
                    let barrier = &barrier;
                    s.spawn(move || {
                        barrier.wait();
                        store
                            .assign_referral_code(&wallet("0xAAA"), &code(c), Utc::now())
                            .unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let assigned: Vec<_> = results
            .iter()
            .filter_map(|r| match r {
                CodeAssignment::Assigned(user) => user.referral_code.clone(),
                CodeAssignment::Existing(_) => None,
            })
            .collect();
        assert_eq!(assigned.len(), 1);

        let winner = &assigned[0];
        for result in &results {
            if let CodeAssignment::Existing(existing) = result {
                assert_eq!(existing, winner);
            }
        }

        let owners: Vec<_> = CODES
            .iter()
            .filter_map(|c| store.find_user_by_code(&code(c)).unwrap())
            .collect();
        assert_eq!(owners.len(), 1);
        assert_eq!(owners[0].wallet_address, wallet("0xAAA"));
    }

    #[test]
    fn first_attribution_wins() {
        let (store, _dir) = create_test_store();
        referrer_with_code(&store, "0xAAA", "AAAA1111");
        referrer_with_code(&store, "0xCCC", "CCCC3333");

        store
            .apply_conversion(&conversion("AAAA1111", "0xAAA", "0xNewUser"))
            .unwrap();
        store
            .apply_conversion(&conversion("CCCC3333", "0xCCC", "0xNewUser"))
            .unwrap();

        let new_user = store.get_user(&wallet("0xNewUser")).unwrap().unwrap();
        assert_eq!(new_user.referred_by, Some(wallet("0xAAA")));
    }

    #[test]
    fn recent_visits_newest_first_and_limited() {
        let (store, _dir) = create_test_store();
        referrer_with_code(&store, "0xAAA", "ABCD1234");

        let mut ids = Vec::new();
        for _ in 0..12 {
            let visit = anonymous_visit("ABCD1234", "0xAAA");
            ids.push(visit.id);
            store.record_visit(&visit).unwrap();
            std::thread::sleep(Duration::from_millis(2));
        }

        let activity = store.referrer_activity(&wallet("0xAAA"), 10).unwrap();
        assert_eq!(activity.counts.total, 12);

        let recent = activity.recent;
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0].id, ids[11]);
        assert_eq!(recent[9].id, ids[2]);
        assert!(recent.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
    }

    #[test]
    fn visits_are_scoped_to_referrer() {
        let (store, _dir) = create_test_store();
        referrer_with_code(&store, "0xAAA", "AAAA1111");
        referrer_with_code(&store, "0xAAAB", "BBBB2222");
        store.record_visit(&anonymous_visit("AAAA1111", "0xAAA")).unwrap();
        store.record_visit(&anonymous_visit("BBBB2222", "0xAAAB")).unwrap();
        store.record_visit(&anonymous_visit("BBBB2222", "0xAAAB")).unwrap();

        let activity = store.referrer_activity(&wallet("0xAAA"), 10).unwrap();
        assert_eq!(activity.counts.total, 1);
        assert_eq!(activity.recent.len(), 1);
    }

    #[test]
    fn top_referrers_ranked_by_rewards() {
        let (store, _dir) = create_test_store();
        referrer_with_code(&store, "0xAAA", "AAAA1111");
        referrer_with_code(&store, "0xBBB", "BBBB2222");
        referrer_with_code(&store, "0xIdle", "IDLE0000");

        store
            .apply_conversion(&conversion("AAAA1111", "0xAAA", "0xU1"))
            .unwrap();
        store
            .apply_conversion(&conversion("BBBB2222", "0xBBB", "0xU2"))
            .unwrap();
        store
            .apply_conversion(&conversion("BBBB2222", "0xBBB", "0xU3"))
            .unwrap();

        let top = store.top_referrers(10).unwrap();
        let wallets: Vec<_> = top.iter().map(|u| u.wallet_address.as_str()).collect();
        assert_eq!(wallets, vec!["0xBBB", "0xAAA"]);

        assert_eq!(store.top_referrers(1).unwrap().len(), 1);
    }
}
