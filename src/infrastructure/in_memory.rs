use crate::domain::item::{Item, ItemId};
use crate::domain::money::Money;
use crate::domain::payment::{Payment, PaymentId};
use crate::domain::ports::{ItemStore, PaymentStore, ProfileStore, RequestStore};
use crate::domain::profile::{Profile, ProfileId, Role};
use crate::domain::request::{Message, RentalRequest, RequestId, RequestStatus};
use crate::error::{EngineError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory implementation of all four repository ports.
///
/// One `RwLock` guards all collections, so the settlement batch and the
/// compare-and-swap status write are naturally transactional: both run
/// entirely under a single write guard. Ideal for tests and the demo CLI.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Collections>>,
}

#[derive(Default)]
struct Collections {
    profiles: HashMap<ProfileId, Profile>,
    items: HashMap<ItemId, Item>,
    requests: HashMap<RequestId, RentalRequest>,
    messages: HashMap<RequestId, Vec<Message>>,
    payments: HashMap<PaymentId, Payment>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileStore for InMemoryStore {
    async fn get(&self, id: ProfileId) -> Result<Option<Profile>> {
        let inner = self.inner.read().await;
        Ok(inner.profiles.get(&id).cloned())
    }

    async fn query_by_role(&self, role: Role, limit: usize) -> Result<Vec<Profile>> {
        let inner = self.inner.read().await;
        let mut profiles: Vec<Profile> = inner
            .profiles
            .values()
            .filter(|profile| profile.role == role && profile.active)
            .cloned()
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
        let mut inner = self.inner.write().await;
        inner.profiles.insert(profile.id, profile);
        Ok(())
    }
}

#[async_trait]
impl ItemStore for InMemoryStore {
    async fn get(&self, id: ItemId) -> Result<Option<Item>> {
        let inner = self.inner.read().await;
        Ok(inner.items.get(&id).cloned())
    }

    async fn store(&self, item: Item) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.items.insert(item.id, item);
        Ok(())
    }
}

#[async_trait]
impl RequestStore for InMemoryStore {
    async fn create(&self, request: RentalRequest) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.requests.contains_key(&request.id) {
            return Err(EngineError::Conflict(format!(
                "request {} already exists",
                request.id
            )));
        }
        inner.requests.insert(request.id, request);
        Ok(())
    }

    async fn get(&self, id: RequestId) -> Result<Option<RentalRequest>> {
        let inner = self.inner.read().await;
        Ok(inner.requests.get(&id).cloned())
    }

    async fn update_status(
        &self,
        id: RequestId,
        expected: RequestStatus,
        next: RequestStatus,
    ) -> Result<RentalRequest> {
        let mut inner = self.inner.write().await;
        let request = inner
            .requests
            .get_mut(&id)
            .ok_or_else(|| EngineError::NotFound(format!("request {id}")))?;
        if request.status != expected {
            return Err(EngineError::Conflict(format!(
                "request {id} is {}, expected {expected}",
                request.status
            )));
        }
        request.status = next;
        Ok(request.clone())
    }

    async fn append_message(&self, id: RequestId, message: Message) -> Result<()> {
        let mut inner = self.inner.write().await;
        if !inner.requests.contains_key(&id) {
            return Err(EngineError::NotFound(format!("request {id}")));
        }
        inner.messages.entry(id).or_default().push(message);
        Ok(())
    }

    async fn messages(&self, id: RequestId) -> Result<Vec<Message>> {
        let inner = self.inner.read().await;
        if !inner.requests.contains_key(&id) {
            return Err(EngineError::NotFound(format!("request {id}")));
        }
        Ok(inner.messages.get(&id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl PaymentStore for InMemoryStore {
    async fn get_by_request(&self, request_id: RequestId) -> Result<Option<Payment>> {
        let inner = self.inner.read().await;
        Ok(inner
            .payments
            .values()
            .find(|payment| payment.request_id == request_id)
            .cloned())
    }

    async fn create(&self, payment: Payment) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner
            .payments
            .values()
            .any(|existing| existing.request_id == payment.request_id)
        {
            return Err(EngineError::Conflict(format!(
                "request {} already has a payment",
                payment.request_id
            )));
        }
        inner.payments.insert(payment.id, payment);
        Ok(())
    }

    async fn query_unsettled(&self) -> Result<Vec<Payment>> {
        let inner = self.inner.read().await;
        let mut unsettled: Vec<Payment> = inner
            .payments
            .values()
            .filter(|payment| payment.is_awaiting_payout())
            .cloned()
            .collect();
        unsettled.sort_by_key(|payment| payment.id);
        Ok(unsettled)
    }

    async fn settle_batch(&self, ids: &[PaymentId], paid_at: DateTime<Utc>) -> Result<usize> {
        let mut inner = self.inner.write().await;
        // Validate the full batch before touching anything, so the write is
        // all-or-nothing.
        for id in ids {
            let payment = inner
                .payments
                .get(id)
                .ok_or_else(|| EngineError::NotFound(format!("payment {id}")))?;
            if !payment.is_awaiting_payout() {
                return Err(EngineError::Conflict(format!(
                    "payment {id} is no longer awaiting payout"
                )));
            }
        }
        for id in ids {
            if let Some(payment) = inner.payments.get_mut(id) {
                payment.settle(paid_at)?;
            }
        }
        Ok(ids.len())
    }

    async fn sum_merchant_earnings(&self, business_id: ProfileId) -> Result<Option<Money>> {
        let inner = self.inner.read().await;
        let mut total: Option<Money> = None;
        for payment in inner.payments.values() {
            if payment.business_id == business_id && payment.merchant_paid {
                total = Some(total.unwrap_or(Money::ZERO) + payment.merchant_amount);
            }
        }
        Ok(total)
    }
}
