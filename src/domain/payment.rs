use crate::domain::money::Money;
use crate::domain::profile::ProfileId;
use crate::domain::request::RequestId;
use crate::error::{EngineError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(pub Uuid);

impl PaymentId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Paid,
}

/// One payment per successfully paid request.
///
/// Invariant, both directions: `merchant_paid == true` iff `status == Paid`.
/// [`Payment::settle`] is the only way to mark either, so a payment can never
/// be marked paid without being settled, nor settled twice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub request_id: RequestId,
    pub payer_id: ProfileId,
    pub business_id: ProfileId,
    pub gross: Money,
    pub commission: Money,
    pub merchant_amount: Money,
    pub status: PaymentStatus,
    pub merchant_paid: bool,
    #[serde(default)]
    pub merchant_payout_date: Option<DateTime<Utc>>,
}

impl Payment {
    /// Records a payment that the gateway reported as completed, splitting
    /// the gross into platform commission and merchant remainder.
    pub fn completed(
        request_id: RequestId,
        payer_id: ProfileId,
        business_id: ProfileId,
        gross: Money,
        commission_rate: Decimal,
    ) -> Self {
        let (commission, merchant_amount) = gross.split_commission(commission_rate);
        Self {
            id: PaymentId::random(),
            request_id,
            payer_id,
            business_id,
            gross,
            commission,
            merchant_amount,
            status: PaymentStatus::Completed,
            merchant_paid: false,
            merchant_payout_date: None,
        }
    }

    /// Eligible for the payout sweep: completed but not yet settled.
    pub fn is_awaiting_payout(&self) -> bool {
        self.status == PaymentStatus::Completed && !self.merchant_paid
    }

    /// Applies the merchant payout, stamping the payout date.
    pub fn settle(&mut self, paid_at: DateTime<Utc>) -> Result<()> {
        if !self.is_awaiting_payout() {
            return Err(EngineError::InvalidTransition(format!(
                "payment {} is not awaiting payout",
                self.id
            )));
        }
        self.status = PaymentStatus::Paid;
        self.merchant_paid = true;
        self.merchant_payout_date = Some(paid_at);
        Ok(())
    }
}
