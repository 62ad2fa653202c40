use crate::domain::item::{Item, ItemId};
use crate::domain::money::Money;
use crate::domain::payment::{Payment, PaymentId};
use crate::domain::profile::{Profile, ProfileId, Role};
use crate::domain::request::{Message, RentalRequest, RequestId, RequestStatus};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub type ProfileStoreArc = Arc<dyn ProfileStore>;
pub type ItemStoreArc = Arc<dyn ItemStore>;
pub type RequestStoreArc = Arc<dyn RequestStore>;
pub type PaymentStoreArc = Arc<dyn PaymentStore>;

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get(&self, id: ProfileId) -> Result<Option<Profile>>;
    /// Active profiles of one role, most recently active first, at most
    /// `limit`. Deactivated profiles are excluded before the bound is
    /// applied, so they never crowd active candidates out of a page.
    async fn query_by_role(&self, role: Role, limit: usize) -> Result<Vec<Profile>>;
    async fn store(&self, profile: Profile) -> Result<()>;
}

#[async_trait]
pub trait ItemStore: Send + Sync {
    async fn get(&self, id: ItemId) -> Result<Option<Item>>;
    async fn store(&self, item: Item) -> Result<()>;
}

#[async_trait]
pub trait RequestStore: Send + Sync {
    async fn create(&self, request: RentalRequest) -> Result<()>;
    async fn get(&self, id: RequestId) -> Result<Option<RentalRequest>>;
    /// Compare-and-swap on status: the write applies only if the stored
    /// status still equals `expected`, otherwise `Conflict`. `NotFound` if
    /// the request does not exist.
    async fn update_status(
        &self,
        id: RequestId,
        expected: RequestStatus,
        next: RequestStatus,
    ) -> Result<RentalRequest>;
    async fn append_message(&self, id: RequestId, message: Message) -> Result<()>;
    async fn messages(&self, id: RequestId) -> Result<Vec<Message>>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn get_by_request(&self, request_id: RequestId) -> Result<Option<Payment>>;
    /// Inserts a new payment; `Conflict` if any payment already exists for
    /// the same request. The existence check and the insert run under one
    /// guard, so a request can never end up with two payments even under
    /// concurrent duplicate deliveries.
    async fn create(&self, payment: Payment) -> Result<()>;
    /// Payments with `status == Completed` and `merchant_paid == false`,
    /// ordered by id for deterministic sweeps.
    async fn query_unsettled(&self) -> Result<Vec<Payment>>;
    /// Transactionally settles every listed payment: `merchant_paid = true`,
    /// `status = Paid`, payout date stamped. All-or-nothing; if any id is
    /// missing or no longer eligible, nothing is applied and the call fails.
    /// Returns the committed count (always `ids.len()` on success).
    async fn settle_batch(&self, ids: &[PaymentId], paid_at: DateTime<Utc>) -> Result<usize>;
    /// Sum of `merchant_amount` over settled payments for one business.
    /// `None` when the business has no settled payments at all, as opposed
    /// to a genuine zero sum.
    async fn sum_merchant_earnings(&self, business_id: ProfileId) -> Result<Option<Money>>;
}
