use crate::application::with_deadline;
use crate::config::EngineConfig;
use crate::domain::identity::Caller;
use crate::domain::money::Money;
use crate::domain::payment::PaymentId;
use crate::domain::ports::{PaymentStoreArc, RequestStoreArc};
use crate::domain::profile::ProfileId;
use crate::domain::request::RequestStatus;
use crate::error::{EngineError, Result};
use chrono::Utc;
use serde::Serialize;

/// Outcome of one payout sweep.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SettlementReport {
    pub settled_count: usize,
}

/// Sweeps completed payments into the merchant-paid state.
///
/// The payment batch is the one multi-record transaction in the engine: the
/// port commits it all-or-nothing, and the eligibility predicate excludes
/// already-settled rows, so immediate re-invocation settles zero.
pub struct SettlementService {
    payments: PaymentStoreArc,
    requests: RequestStoreArc,
    config: EngineConfig,
}

impl SettlementService {
    pub fn new(
        payments: PaymentStoreArc,
        requests: RequestStoreArc,
        config: EngineConfig,
    ) -> Self {
        Self {
            payments,
            requests,
            config,
        }
    }

    /// Settles every payment with `status == completed` and
    /// `merchant_paid == false`. Operator capability required.
    pub async fn settle_pending_payouts(&self, caller: &Caller) -> Result<SettlementReport> {
        caller.require_operator()?;

        let timeout = self.config.port_timeout;
        let eligible = with_deadline(
            timeout,
            "payments.query_unsettled",
            self.payments.query_unsettled(),
        )
        .await?;
        if eligible.is_empty() {
            tracing::info!("payout sweep found nothing to settle");
            return Ok(SettlementReport { settled_count: 0 });
        }

        let ids: Vec<PaymentId> = eligible.iter().map(|payment| payment.id).collect();
        let paid_at = Utc::now();
        let committed = with_deadline(
            timeout,
            "payments.settle_batch",
            self.payments.settle_batch(&ids, paid_at),
        )
        .await?;
        if committed != ids.len() {
            // The port contract is all-or-nothing; anything else means the
            // reported count cannot be trusted.
            return Err(EngineError::internal(format!(
                "settlement batch committed {committed} of {} records",
                ids.len()
            )));
        }

        // The batch is the transactional boundary; request completion is a
        // per-record follow-up. A conflict here leaves the payment settled,
        // which the order view reports regardless.
        for payment in &eligible {
            let advanced = with_deadline(
                timeout,
                "requests.update_status",
                self.requests.update_status(
                    payment.request_id,
                    RequestStatus::Paid,
                    RequestStatus::Completed,
                ),
            )
            .await;
            if let Err(e) = advanced {
                tracing::warn!(request = %payment.request_id, error = %e, "request not advanced to completed");
            }
        }

        tracing::info!(settled = committed, "payout sweep committed");
        Ok(SettlementReport {
            settled_count: committed,
        })
    }

    /// Total paid out to one business so far. `None` means the business has
    /// no settled payments at all, which callers must not conflate with a
    /// zero balance.
    pub async fn business_earnings(
        &self,
        caller: &Caller,
        business_id: ProfileId,
    ) -> Result<Option<Money>> {
        if caller.user_id != business_id && !caller.operator {
            return Err(EngineError::Forbidden(
                "earnings are visible only to the business itself".into(),
            ));
        }
        with_deadline(
            self.config.port_timeout,
            "payments.sum_merchant_earnings",
            self.payments.sum_merchant_earnings(business_id),
        )
        .await
    }
}
