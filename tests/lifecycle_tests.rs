mod common;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::*;
use rentmatch::application::engine::RentalEngine;
use rentmatch::config::EngineConfig;
use rentmatch::domain::identity::Caller;
use rentmatch::domain::item::ItemId;
use rentmatch::domain::money::Money;
use rentmatch::domain::payment::{Payment, PaymentId, PaymentStatus};
use rentmatch::domain::ports::{ItemStore, PaymentStore, RequestStore};
use rentmatch::domain::profile::ProfileId;
use rentmatch::domain::request::{RequestAction, RequestId, RequestStatus};
use rentmatch::error::{EngineError, Result};
use rentmatch::infrastructure::in_memory::InMemoryStore;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[tokio::test]
async fn test_full_lifecycle_request_to_completion() {
    let store = InMemoryStore::new();
    let engine = engine_over(&store);
    let client = seed_client(&store, profile_id(1)).await;
    let business = seed_business(&store, profile_id(2)).await;
    let item = seed_item(&store, business.id, 150).await;

    let renter = Caller::user(client.id);
    let owner = Caller::user(business.id);

    // Created pending, with the opening message on record.
    let request_id = engine
        .create_request(&renter, item.id, "Is this available next weekend?")
        .await
        .unwrap();
    let order = engine.get_order(request_id, &renter).await.unwrap();
    assert_eq!(order.request.status, RequestStatus::Pending);
    assert_eq!(order.messages.len(), 1);
    assert_eq!(order.messages[0].sender_id, client.id);
    assert!(order.payment.is_none());

    // Owner accepts.
    let accepted = engine
        .transition_request(request_id, &owner, RequestAction::Accept)
        .await
        .unwrap();
    assert_eq!(accepted.status, RequestStatus::Accepted);

    // Payment collaborator reports completion.
    let payment = engine.payment_completed(request_id, money(300)).await.unwrap();
    assert_eq!(payment.status, PaymentStatus::Completed);
    assert_eq!(payment.gross, money(300));
    let order = engine.get_order(request_id, &owner).await.unwrap();
    assert_eq!(order.request.status, RequestStatus::Paid);

    // Operator sweep settles the payout and completes the request.
    let report = engine
        .settle_pending_payouts(&Caller::operator(profile_id(99)))
        .await
        .unwrap();
    assert_eq!(report.settled_count, 1);

    let order = engine.get_order(request_id, &renter).await.unwrap();
    assert_eq!(order.request.status, RequestStatus::Completed);
    let settled = order.payment.unwrap();
    assert_eq!(settled.status, PaymentStatus::Paid);
    assert!(settled.merchant_paid);
    assert!(settled.merchant_payout_date.is_some());
}

#[tokio::test]
async fn test_decline_is_terminal() {
    let store = InMemoryStore::new();
    let engine = engine_over(&store);
    let client = seed_client(&store, profile_id(1)).await;
    let business = seed_business(&store, profile_id(2)).await;
    let item = seed_item(&store, business.id, 100).await;

    let request_id = engine
        .create_request(&Caller::user(client.id), item.id, "hi")
        .await
        .unwrap();
    let owner = Caller::user(business.id);
    let declined = engine
        .transition_request(request_id, &owner, RequestAction::Decline)
        .await
        .unwrap();
    assert_eq!(declined.status, RequestStatus::Declined);

    // Nothing else applies to a declined request.
    for action in [RequestAction::Accept, RequestAction::Decline, RequestAction::Cancel] {
        let result = engine.transition_request(request_id, &owner, action).await;
        assert!(matches!(result, Err(EngineError::InvalidTransition(_))));
    }
}

#[tokio::test]
async fn test_invalid_transition_leaves_stored_state_untouched() {
    let store = InMemoryStore::new();
    let engine = engine_over(&store);
    let client = seed_client(&store, profile_id(1)).await;
    let business = seed_business(&store, profile_id(2)).await;
    let item = seed_item(&store, business.id, 100).await;

    let owner = Caller::user(business.id);
    let request_id = engine
        .create_request(&Caller::user(client.id), item.id, "hi")
        .await
        .unwrap();
    engine
        .transition_request(request_id, &owner, RequestAction::Accept)
        .await
        .unwrap();

    // Accepting twice fails explicitly rather than no-opping.
    let result = engine
        .transition_request(request_id, &owner, RequestAction::Accept)
        .await;
    assert!(matches!(result, Err(EngineError::InvalidTransition(_))));
    let stored = RequestStore::get(&store, request_id).await.unwrap().unwrap();
    assert_eq!(stored.status, RequestStatus::Accepted);
}

#[tokio::test]
async fn test_either_party_may_cancel_before_payment() {
    let store = InMemoryStore::new();
    let engine = engine_over(&store);
    let client = seed_client(&store, profile_id(1)).await;
    let business = seed_business(&store, profile_id(2)).await;
    let item = seed_item(&store, business.id, 100).await;
    let renter = Caller::user(client.id);
    let owner = Caller::user(business.id);

    let request_id = engine.create_request(&renter, item.id, "hi").await.unwrap();
    engine
        .transition_request(request_id, &owner, RequestAction::Accept)
        .await
        .unwrap();
    let cancelled = engine
        .transition_request(request_id, &renter, RequestAction::Cancel)
        .await
        .unwrap();
    assert_eq!(cancelled.status, RequestStatus::Cancelled);
}

#[tokio::test]
async fn test_cancel_after_payment_is_rejected() {
    let store = InMemoryStore::new();
    let engine = engine_over(&store);
    let client = seed_client(&store, profile_id(1)).await;
    let business = seed_business(&store, profile_id(2)).await;
    let item = seed_item(&store, business.id, 100).await;
    let renter = Caller::user(client.id);
    let owner = Caller::user(business.id);

    let request_id = engine.create_request(&renter, item.id, "hi").await.unwrap();
    engine
        .transition_request(request_id, &owner, RequestAction::Accept)
        .await
        .unwrap();
    engine.payment_completed(request_id, money(100)).await.unwrap();

    let result = engine
        .transition_request(request_id, &renter, RequestAction::Cancel)
        .await;
    assert!(matches!(result, Err(EngineError::InvalidTransition(_))));
}

#[tokio::test]
async fn test_create_request_validations() {
    let store = InMemoryStore::new();
    let engine = engine_over(&store);
    let client = seed_client(&store, profile_id(1)).await;
    let business = seed_business(&store, profile_id(2)).await;
    let item = seed_item(&store, business.id, 100).await;
    let renter = Caller::user(client.id);

    // Empty message.
    let result = engine.create_request(&renter, item.id, "   ").await;
    assert!(matches!(result, Err(EngineError::Validation(_))));

    // Unknown item.
    let result = engine.create_request(&renter, ItemId::random(), "hi").await;
    assert!(matches!(result, Err(EngineError::NotFound(_))));

    // Unknown requester profile.
    let stranger = Caller::user(profile_id(77));
    let result = engine.create_request(&stranger, item.id, "hi").await;
    assert!(matches!(result, Err(EngineError::NotFound(_))));

    // A business cannot open rental requests.
    let result = engine
        .create_request(&Caller::user(business.id), item.id, "hi")
        .await;
    assert!(matches!(result, Err(EngineError::Forbidden(_))));
}

#[tokio::test]
async fn test_unavailable_item_cannot_be_requested() {
    let store = InMemoryStore::new();
    let engine = engine_over(&store);
    let client = seed_client(&store, profile_id(1)).await;
    let business = seed_business(&store, profile_id(2)).await;
    let mut item = seed_item(&store, business.id, 100).await;
    item.withdraw();
    ItemStore::store(&store, item.clone()).await.unwrap();

    let result = engine
        .create_request(&Caller::user(client.id), item.id, "hi")
        .await;
    assert!(matches!(result, Err(EngineError::Validation(_))));
}

#[tokio::test]
async fn test_payment_completed_requires_accepted_state() {
    let store = InMemoryStore::new();
    let engine = engine_over(&store);
    let client = seed_client(&store, profile_id(1)).await;
    let business = seed_business(&store, profile_id(2)).await;
    let item = seed_item(&store, business.id, 100).await;

    let request_id = engine
        .create_request(&Caller::user(client.id), item.id, "hi")
        .await
        .unwrap();

    // Still pending: the event is out of order.
    let result = engine.payment_completed(request_id, money(100)).await;
    assert!(matches!(result, Err(EngineError::InvalidTransition(_))));
    let stored = RequestStore::get(&store, request_id).await.unwrap().unwrap();
    assert_eq!(stored.status, RequestStatus::Pending);
}

#[tokio::test]
async fn test_redelivered_payment_event_is_not_double_recorded() {
    let store = InMemoryStore::new();
    let engine = engine_over(&store);
    let client = seed_client(&store, profile_id(1)).await;
    let business = seed_business(&store, profile_id(2)).await;
    let item = seed_item(&store, business.id, 100).await;
    let owner = Caller::user(business.id);

    let request_id = engine
        .create_request(&Caller::user(client.id), item.id, "hi")
        .await
        .unwrap();
    engine
        .transition_request(request_id, &owner, RequestAction::Accept)
        .await
        .unwrap();

    let first = engine.payment_completed(request_id, money(100)).await.unwrap();
    let second = engine.payment_completed(request_id, money(100)).await.unwrap();
    assert_eq!(first.id, second.id);
}

/// Delegates to the in-memory store but reports no payment on the first
/// lookup, reproducing a lookup racing a concurrent delivery's insert.
struct StaleLookupStore {
    inner: InMemoryStore,
    first_lookup: AtomicBool,
}

#[async_trait]
impl PaymentStore for StaleLookupStore {
    async fn get_by_request(&self, request_id: RequestId) -> Result<Option<Payment>> {
        if self.first_lookup.swap(false, Ordering::SeqCst) {
            return Ok(None);
        }
        self.inner.get_by_request(request_id).await
    }

    async fn create(&self, payment: Payment) -> Result<()> {
        PaymentStore::create(&self.inner, payment).await
    }

    async fn query_unsettled(&self) -> Result<Vec<Payment>> {
        self.inner.query_unsettled().await
    }

    async fn settle_batch(&self, ids: &[PaymentId], paid_at: DateTime<Utc>) -> Result<usize> {
        self.inner.settle_batch(ids, paid_at).await
    }

    async fn sum_merchant_earnings(&self, business_id: ProfileId) -> Result<Option<Money>> {
        self.inner.sum_merchant_earnings(business_id).await
    }
}

#[tokio::test]
async fn test_racing_payment_deliveries_record_one_payment() {
    let store = InMemoryStore::new();
    let engine = RentalEngine::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(StaleLookupStore {
            inner: store.clone(),
            first_lookup: AtomicBool::new(true),
        }),
        EngineConfig::default(),
    )
    .unwrap();
    let client = seed_client(&store, profile_id(1)).await;
    let business = seed_business(&store, profile_id(2)).await;
    let item = seed_item(&store, business.id, 100).await;

    let request_id = engine
        .create_request(&Caller::user(client.id), item.id, "hi")
        .await
        .unwrap();
    engine
        .transition_request(request_id, &Caller::user(business.id), RequestAction::Accept)
        .await
        .unwrap();

    // Another delivery already recorded the payment but has not yet advanced
    // the request; our stale lookup misses it.
    let recorded = Payment::completed(request_id, client.id, business.id, money(100), dec!(0.10));
    PaymentStore::create(&store, recorded.clone()).await.unwrap();

    let resumed = engine.payment_completed(request_id, money(100)).await.unwrap();
    assert_eq!(resumed.id, recorded.id);
    assert_eq!(store.query_unsettled().await.unwrap().len(), 1);

    let order = engine.get_order(request_id, &Caller::user(client.id)).await.unwrap();
    assert_eq!(order.request.status, RequestStatus::Paid);
}
