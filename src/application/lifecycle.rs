use crate::application::with_deadline;
use crate::config::EngineConfig;
use crate::domain::identity::Caller;
use crate::domain::item::ItemId;
use crate::domain::money::Money;
use crate::domain::order::Order;
use crate::domain::payment::Payment;
use crate::domain::ports::{ItemStoreArc, PaymentStoreArc, ProfileStoreArc, RequestStoreArc};
use crate::domain::profile::Role;
use crate::domain::request::{
    Message, RentalRequest, RequestAction, RequestId, RequestStatus,
};
use crate::error::{EngineError, Result};

/// Drives a rental request from creation through completion, enforcing the
/// actor and state guards of the lifecycle table.
pub struct RequestLifecycle {
    profiles: ProfileStoreArc,
    items: ItemStoreArc,
    requests: RequestStoreArc,
    payments: PaymentStoreArc,
    config: EngineConfig,
}

impl RequestLifecycle {
    pub fn new(
        profiles: ProfileStoreArc,
        items: ItemStoreArc,
        requests: RequestStoreArc,
        payments: PaymentStoreArc,
        config: EngineConfig,
    ) -> Self {
        Self {
            profiles,
            items,
            requests,
            payments,
            config,
        }
    }

    /// Opens a `pending` request against an available item, recording the
    /// requester's opening message.
    pub async fn create_request(
        &self,
        caller: &Caller,
        item_id: ItemId,
        message: &str,
    ) -> Result<RequestId> {
        let content = message.trim();
        if content.is_empty() {
            return Err(EngineError::Validation(
                "opening message must not be empty".into(),
            ));
        }

        let timeout = self.config.port_timeout;
        let requester = with_deadline(timeout, "profiles.get", self.profiles.get(caller.user_id))
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("profile {}", caller.user_id)))?;
        if requester.role != Role::Client {
            return Err(EngineError::Forbidden(
                "only client profiles can open rental requests".into(),
            ));
        }
        if !requester.active {
            return Err(EngineError::Forbidden("profile is deactivated".into()));
        }

        let item = with_deadline(timeout, "items.get", self.items.get(item_id))
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("item {item_id}")))?;
        if !item.is_rentable() {
            return Err(EngineError::Validation(format!(
                "item {item_id} is not available for rent"
            )));
        }
        if item.owner_id == caller.user_id {
            return Err(EngineError::Validation(
                "cannot open a request against your own item".into(),
            ));
        }

        let request = RentalRequest::new(item_id, caller.user_id, item.owner_id);
        let request_id = request.id;
        with_deadline(timeout, "requests.create", self.requests.create(request)).await?;
        with_deadline(
            timeout,
            "requests.append_message",
            self.requests
                .append_message(request_id, Message::new(caller.user_id, content)),
        )
        .await?;

        tracing::info!(request = %request_id, item = %item_id, requester = %caller.user_id, "rental request created");
        Ok(request_id)
    }

    /// Applies a party action (`accept`, `decline`, `cancel`) to a request.
    ///
    /// Writes go through the port's compare-and-swap; on a concurrent
    /// collision the guard is re-validated against fresh state before a
    /// bounded number of retries, so a stale read can never double-apply.
    pub async fn transition_request(
        &self,
        request_id: RequestId,
        caller: &Caller,
        action: RequestAction,
    ) -> Result<RentalRequest> {
        let timeout = self.config.port_timeout;
        let mut attempts = 0;
        loop {
            let request = with_deadline(timeout, "requests.get", self.requests.get(request_id))
                .await?
                .ok_or_else(|| EngineError::NotFound(format!("request {request_id}")))?;

            self.authorize_action(&request, caller, action)?;
            let next = request.status.apply(action)?;

            match with_deadline(
                timeout,
                "requests.update_status",
                self.requests.update_status(request_id, request.status, next),
            )
            .await
            {
                Ok(updated) => {
                    tracing::info!(request = %request_id, from = %request.status, to = %next, "request transitioned");
                    return Ok(updated);
                }
                Err(EngineError::Conflict(reason)) if attempts < self.config.transition_retries => {
                    attempts += 1;
                    tracing::debug!(request = %request_id, attempt = attempts, %reason, "transition conflict, re-reading");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Event entry point for the payment collaborator: the request's payment
    /// reached `completed`, so the request advances `accepted → paid`.
    ///
    /// A redelivered event for an already-recorded payment resumes the status
    /// write instead of recording a second payment.
    pub async fn payment_completed(&self, request_id: RequestId, gross: Money) -> Result<Payment> {
        let timeout = self.config.port_timeout;
        let request = with_deadline(timeout, "requests.get", self.requests.get(request_id))
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("request {request_id}")))?;

        let existing = with_deadline(
            timeout,
            "payments.get_by_request",
            self.payments.get_by_request(request_id),
        )
        .await?;

        let payment = match existing {
            Some(payment) if request.status == RequestStatus::Paid => return Ok(payment),
            Some(payment) if request.status == RequestStatus::Accepted => payment,
            Some(_) => {
                return Err(EngineError::InvalidTransition(format!(
                    "request {request_id} is {} and already has a payment",
                    request.status
                )));
            }
            None => {
                if request.status != RequestStatus::Accepted {
                    return Err(EngineError::InvalidTransition(format!(
                        "payment completed for request {request_id} in state {}",
                        request.status
                    )));
                }
                let payment = Payment::completed(
                    request_id,
                    request.requester_id,
                    request.owner_id,
                    gross,
                    self.config.commission_rate,
                );
                match with_deadline(
                    timeout,
                    "payments.create",
                    self.payments.create(payment.clone()),
                )
                .await
                {
                    Ok(()) => payment,
                    // A concurrent delivery recorded its payment between our
                    // lookup and the insert; resume with that record.
                    Err(EngineError::Conflict(_)) => with_deadline(
                        timeout,
                        "payments.get_by_request",
                        self.payments.get_by_request(request_id),
                    )
                    .await?
                    .ok_or_else(|| {
                        EngineError::internal(format!(
                            "payment for request {request_id} missing after creation conflict"
                        ))
                    })?,
                    Err(e) => return Err(e),
                }
            }
        };

        let advanced = with_deadline(
            timeout,
            "requests.update_status",
            self.requests
                .update_status(request_id, RequestStatus::Accepted, RequestStatus::Paid),
        )
        .await;
        if let Err(e) = advanced {
            // A concurrent delivery may have advanced the request already.
            let already_paid = matches!(e, EngineError::Conflict(_))
                && with_deadline(timeout, "requests.get", self.requests.get(request_id))
                    .await?
                    .is_some_and(|r| r.status == RequestStatus::Paid);
            if !already_paid {
                return Err(e);
            }
        }
        tracing::info!(request = %request_id, payment = %payment.id, gross = %payment.gross, "payment recorded, request paid");
        Ok(payment)
    }

    /// Read-view of a request plus its payment state; restricted to the two
    /// parties and operators.
    pub async fn get_order(&self, request_id: RequestId, caller: &Caller) -> Result<Order> {
        let timeout = self.config.port_timeout;
        let request = with_deadline(timeout, "requests.get", self.requests.get(request_id))
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("request {request_id}")))?;

        if !request.is_party(caller.user_id) && !caller.operator {
            return Err(EngineError::Forbidden(
                "only the requester or the item owner may view this order".into(),
            ));
        }

        let payment = with_deadline(
            timeout,
            "payments.get_by_request",
            self.payments.get_by_request(request_id),
        )
        .await?;
        let messages = with_deadline(
            timeout,
            "requests.messages",
            self.requests.messages(request_id),
        )
        .await?;

        Ok(Order {
            request,
            payment,
            messages,
        })
    }

    fn authorize_action(
        &self,
        request: &RentalRequest,
        caller: &Caller,
        action: RequestAction,
    ) -> Result<()> {
        let allowed = match action {
            // Only the item owner answers a pending request.
            RequestAction::Accept | RequestAction::Decline => caller.user_id == request.owner_id,
            // Either party may back out before payment.
            RequestAction::Cancel => request.is_party(caller.user_id),
        };
        if allowed || caller.operator {
            Ok(())
        } else {
            Err(EngineError::Forbidden(format!(
                "caller {} may not {action} request {}",
                caller.user_id, request.id
            )))
        }
    }
}
