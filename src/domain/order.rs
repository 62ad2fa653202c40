use crate::domain::payment::Payment;
use crate::domain::request::{Message, RentalRequest};
use serde::Serialize;

/// Read-view of a request and its payment state, exposed only to the two
/// parties (or an operator).
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub request: RentalRequest,
    pub payment: Option<Payment>,
    pub messages: Vec<Message>,
}
