use crate::domain::item::{Item, ItemId};
use crate::domain::money::Money;
use crate::domain::payment::{Payment, PaymentId};
use crate::domain::ports::{ItemStore, PaymentStore, ProfileStore, RequestStore};
use crate::domain::profile::{Profile, ProfileId, Role};
use crate::domain::request::{Message, RentalRequest, RequestId, RequestStatus};
use crate::error::{EngineError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column family per entity collection.
pub const CF_PROFILES: &str = "profiles";
pub const CF_ITEMS: &str = "items";
pub const CF_REQUESTS: &str = "requests";
pub const CF_MESSAGES: &str = "messages";
pub const CF_PAYMENTS: &str = "payments";

/// A persistent implementation of all four repository ports on RocksDB.
///
/// Entities are stored as JSON values keyed by their UUID bytes, one column
/// family per collection. The settlement batch goes through a single
/// `WriteBatch`, which RocksDB applies atomically. Read-modify-write
/// sequences (status compare-and-swap, message append, settlement) are
/// linearized by `mutation_lock`.
///
/// `Clone` shares the underlying `Arc<DB>`.
#[derive(Clone)]
pub struct RocksDbStore {
    db: Arc<DB>,
    mutation_lock: Arc<Mutex<()>>,
}

impl RocksDbStore {
    /// Opens or creates a RocksDB instance at `path`, ensuring all column
    /// families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = [CF_PROFILES, CF_ITEMS, CF_REQUESTS, CF_MESSAGES, CF_PAYMENTS]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();
        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            mutation_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| EngineError::internal(format!("column family {name} not found")))
    }

    fn get_json<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_cf(cf, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put_json<T: Serialize>(&self, cf_name: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        self.db.put_cf(cf, key, serde_json::to_vec(value)?)?;
        Ok(())
    }

    fn scan<T: DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mut records = Vec::new();
        for entry in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (_key, value) = entry?;
            records.push(serde_json::from_slice(&value)?);
        }
        Ok(records)
    }
}

#[async_trait]
impl ProfileStore for RocksDbStore {
    async fn get(&self, id: ProfileId) -> Result<Option<Profile>> {
        self.get_json(CF_PROFILES, id.0.as_bytes())
    }

    async fn query_by_role(&self, role: Role, limit: usize) -> Result<Vec<Profile>> {
        let mut profiles: Vec<Profile> = self
            .scan::<Profile>(CF_PROFILES)?
            .into_iter()
            .filter(|profile| profile.role == role && profile.active)
            .collect();
        profiles.sort_by(|a, b| {
            b.last_active_at
                .cmp(&a.last_active_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        profiles.truncate(limit);
        Ok(profiles)
    }

    async fn store(&self, profile: Profile) -> Result<()> {
        self.put_json(CF_PROFILES, profile.id.0.as_bytes().as_slice(), &profile)
    }
}

#[async_trait]
impl ItemStore for RocksDbStore {
    async fn get(&self, id: ItemId) -> Result<Option<Item>> {
        self.get_json(CF_ITEMS, id.0.as_bytes())
    }

    async fn store(&self, item: Item) -> Result<()> {
        self.put_json(CF_ITEMS, item.id.0.as_bytes().as_slice(), &item)
    }
}

#[async_trait]
impl RequestStore for RocksDbStore {
    async fn create(&self, request: RentalRequest) -> Result<()> {
        let _guard = self.mutation_lock.lock().await;
        let key = request.id.0;
        if self
            .get_json::<RentalRequest>(CF_REQUESTS, key.as_bytes())?
            .is_some()
        {
            return Err(EngineError::Conflict(format!(
                "request {} already exists",
                request.id
            )));
        }
        self.put_json(CF_REQUESTS, key.as_bytes(), &request)
    }

    async fn get(&self, id: RequestId) -> Result<Option<RentalRequest>> {
        self.get_json(CF_REQUESTS, id.0.as_bytes())
    }

    async fn update_status(
        &self,
        id: RequestId,
        expected: RequestStatus,
        next: RequestStatus,
    ) -> Result<RentalRequest> {
        let _guard = self.mutation_lock.lock().await;
        let mut request = self
            .get_json::<RentalRequest>(CF_REQUESTS, id.0.as_bytes())?
            .ok_or_else(|| EngineError::NotFound(format!("request {id}")))?;
        if request.status != expected {
            return Err(EngineError::Conflict(format!(
                "request {id} is {}, expected {expected}",
                request.status
            )));
        }
        request.status = next;
        self.put_json(CF_REQUESTS, id.0.as_bytes(), &request)?;
        Ok(request)
    }

    async fn append_message(&self, id: RequestId, message: Message) -> Result<()> {
        let _guard = self.mutation_lock.lock().await;
        if self
            .get_json::<RentalRequest>(CF_REQUESTS, id.0.as_bytes())?
            .is_none()
        {
            return Err(EngineError::NotFound(format!("request {id}")));
        }
        let mut log: Vec<Message> = self
            .get_json(CF_MESSAGES, id.0.as_bytes())?
            .unwrap_or_default();
        log.push(message);
        self.put_json(CF_MESSAGES, id.0.as_bytes(), &log)
    }

    async fn messages(&self, id: RequestId) -> Result<Vec<Message>> {
        if self
            .get_json::<RentalRequest>(CF_REQUESTS, id.0.as_bytes())?
            .is_none()
        {
            return Err(EngineError::NotFound(format!("request {id}")));
        }
        Ok(self
            .get_json(CF_MESSAGES, id.0.as_bytes())?
            .unwrap_or_default())
    }
}

#[async_trait]
impl PaymentStore for RocksDbStore {
    async fn get_by_request(&self, request_id: RequestId) -> Result<Option<Payment>> {
        Ok(self
            .scan::<Payment>(CF_PAYMENTS)?
            .into_iter()
            .find(|payment| payment.request_id == request_id))
    }

    async fn create(&self, payment: Payment) -> Result<()> {
        let _guard = self.mutation_lock.lock().await;
        if self
            .scan::<Payment>(CF_PAYMENTS)?
            .into_iter()
            .any(|existing| existing.request_id == payment.request_id)
        {
            return Err(EngineError::Conflict(format!(
                "request {} already has a payment",
                payment.request_id
            )));
        }
        self.put_json(CF_PAYMENTS, payment.id.0.as_bytes().as_slice(), &payment)
    }

    async fn query_unsettled(&self) -> Result<Vec<Payment>> {
        let mut unsettled: Vec<Payment> = self
            .scan::<Payment>(CF_PAYMENTS)?
            .into_iter()
            .filter(|payment| payment.is_awaiting_payout())
            .collect();
        unsettled.sort_by_key(|payment| payment.id);
        Ok(unsettled)
    }

    async fn settle_batch(&self, ids: &[PaymentId], paid_at: DateTime<Utc>) -> Result<usize> {
        let _guard = self.mutation_lock.lock().await;
        // Validate the whole set first; the WriteBatch below commits
        // atomically or not at all.
        let mut settled = Vec::with_capacity(ids.len());
        for id in ids {
            let mut payment = self
                .get_json::<Payment>(CF_PAYMENTS, id.0.as_bytes())?
                .ok_or_else(|| EngineError::NotFound(format!("payment {id}")))?;
            if !payment.is_awaiting_payout() {
                return Err(EngineError::Conflict(format!(
                    "payment {id} is no longer awaiting payout"
                )));
            }
            payment.settle(paid_at)?;
            settled.push(payment);
        }

        let cf = self.cf(CF_PAYMENTS)?;
        let mut batch = WriteBatch::default();
        for payment in &settled {
            batch.put_cf(cf, payment.id.0.as_bytes(), serde_json::to_vec(payment)?);
        }
        self.db.write(batch)?;
        Ok(settled.len())
    }

    async fn sum_merchant_earnings(&self, business_id: ProfileId) -> Result<Option<Money>> {
        let mut total: Option<Money> = None;
        for payment in self.scan::<Payment>(CF_PAYMENTS)? {
            if payment.business_id == business_id && payment.merchant_paid {
                total = Some(total.unwrap_or(Money::ZERO) + payment.merchant_amount);
            }
        }
        Ok(total)
    }
}
