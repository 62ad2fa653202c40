use crate::domain::item::ItemId;
use crate::domain::profile::ProfileId;
use crate::error::{EngineError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle states of a rental request.
///
/// `pending → accepted → paid → completed`, with `declined` and `cancelled`
/// as terminal side branches off `pending` and `accepted` respectively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Paid,
    Completed,
    Declined,
    Cancelled,
}

impl RequestStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Declined | Self::Cancelled)
    }

    /// Next state for a party-initiated action.
    ///
    /// Anything not in the table is rejected outright; an attempt on a
    /// non-eligible state never turns into a silent no-op, so retry storms
    /// cannot double-apply effects.
    pub fn apply(self, action: RequestAction) -> Result<Self> {
        match (self, action) {
            (Self::Pending, RequestAction::Accept) => Ok(Self::Accepted),
            (Self::Pending, RequestAction::Decline) => Ok(Self::Declined),
            (Self::Accepted, RequestAction::Cancel) => Ok(Self::Cancelled),
            (from, action) => Err(EngineError::InvalidTransition(format!(
                "cannot {action} a {from} request"
            ))),
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Paid => "paid",
            Self::Completed => "completed",
            Self::Declined => "declined",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// Actions a party may attempt on a request. Payment completion and payout
/// settlement advance the state machine separately; they are events, not
/// party actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestAction {
    Accept,
    Decline,
    Cancel,
}

impl fmt::Display for RequestAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Accept => "accept",
            Self::Decline => "decline",
            Self::Cancel => "cancel",
        };
        write!(f, "{s}")
    }
}

/// One rental intent against one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentalRequest {
    pub id: RequestId,
    pub item_id: ItemId,
    pub requester_id: ProfileId,
    pub owner_id: ProfileId,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
}

impl RentalRequest {
    pub fn new(item_id: ItemId, requester_id: ProfileId, owner_id: ProfileId) -> Self {
        Self {
            id: RequestId::random(),
            item_id,
            requester_id,
            owner_id,
            status: RequestStatus::Pending,
            created_at: Utc::now(),
        }
    }

    pub fn is_party(&self, user_id: ProfileId) -> bool {
        user_id == self.requester_id || user_id == self.owner_id
    }
}

/// One entry in a request's append-only message log. Never edited or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub sender_id: ProfileId,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

impl Message {
    pub fn new(sender_id: ProfileId, content: impl Into<String>) -> Self {
        Self {
            sender_id,
            content: content.into(),
            sent_at: Utc::now(),
        }
    }
}
