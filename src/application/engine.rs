use crate::application::lifecycle::RequestLifecycle;
use crate::application::matching::{MatchRanker, RankedMatch};
use crate::application::settlement::{SettlementReport, SettlementService};
use crate::config::EngineConfig;
use crate::domain::identity::Caller;
use crate::domain::item::ItemId;
use crate::domain::money::Money;
use crate::domain::order::Order;
use crate::domain::payment::Payment;
use crate::domain::ports::{ItemStoreArc, PaymentStoreArc, ProfileStoreArc, RequestStoreArc};
use crate::domain::profile::{ProfileId, Role};
use crate::domain::request::{RentalRequest, RequestAction, RequestId};
use crate::error::Result;

/// The engine's public surface, consumed by the (external) web layer.
///
/// Wires the matching, lifecycle and settlement services over one set of
/// repository ports. Construction validates the configuration and fails fast;
/// afterwards the engine holds no mutable state and is safe to share.
pub struct RentalEngine {
    matching: MatchRanker,
    lifecycle: RequestLifecycle,
    settlement: SettlementService,
}

impl RentalEngine {
    pub fn new(
        profiles: ProfileStoreArc,
        items: ItemStoreArc,
        requests: RequestStoreArc,
        payments: PaymentStoreArc,
        config: EngineConfig,
    ) -> Result<Self> {
        let config = config.validated()?;
        Ok(Self {
            matching: MatchRanker::new(profiles.clone(), config.clone()),
            lifecycle: RequestLifecycle::new(
                profiles,
                items,
                requests.clone(),
                payments.clone(),
                config.clone(),
            ),
            settlement: SettlementService::new(payments, requests, config),
        })
    }

    /// Ranked counterparties for a subject of the given role.
    pub async fn find_matches(
        &self,
        subject_role: Role,
        subject_id: ProfileId,
    ) -> Result<Vec<RankedMatch>> {
        match subject_role {
            Role::Client => self.matching.find_business_matches(subject_id).await,
            Role::Business => self.matching.find_client_matches(subject_id).await,
        }
    }

    pub async fn create_request(
        &self,
        caller: &Caller,
        item_id: ItemId,
        message: &str,
    ) -> Result<RequestId> {
        self.lifecycle.create_request(caller, item_id, message).await
    }

    pub async fn get_order(&self, request_id: RequestId, caller: &Caller) -> Result<Order> {
        self.lifecycle.get_order(request_id, caller).await
    }

    pub async fn transition_request(
        &self,
        request_id: RequestId,
        caller: &Caller,
        action: RequestAction,
    ) -> Result<RentalRequest> {
        self.lifecycle
            .transition_request(request_id, caller, action)
            .await
    }

    /// Payment-collaborator event: the payment for `request_id` completed.
    pub async fn payment_completed(&self, request_id: RequestId, gross: Money) -> Result<Payment> {
        self.lifecycle.payment_completed(request_id, gross).await
    }

    pub async fn settle_pending_payouts(&self, caller: &Caller) -> Result<SettlementReport> {
        self.settlement.settle_pending_payouts(caller).await
    }

    pub async fn business_earnings(
        &self,
        caller: &Caller,
        business_id: ProfileId,
    ) -> Result<Option<Money>> {
        self.settlement.business_earnings(caller, business_id).await
    }
}
