use crate::domain::money::Money;
use crate::domain::profile::{Location, ProfileId};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub Uuid);

impl ItemId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    Available,
    Unavailable,
}

/// A rentable listing owned by exactly one business profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub owner_id: ProfileId,
    pub category: String,
    pub price_per_day: Money,
    #[serde(default)]
    pub location: Option<Location>,
    pub availability: Availability,
    /// Soft removal; withdrawn items stay on record but take no new requests.
    #[serde(default)]
    pub withdrawn: bool,
}

impl Item {
    pub fn is_rentable(&self) -> bool {
        !self.withdrawn && self.availability == Availability::Available
    }

    pub fn withdraw(&mut self) {
        self.withdrawn = true;
        self.availability = Availability::Unavailable;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn item() -> Item {
        Item {
            id: ItemId::random(),
            owner_id: ProfileId::random(),
            category: "electronics".into(),
            price_per_day: Money::new(dec!(150)).unwrap(),
            location: None,
            availability: Availability::Available,
            withdrawn: false,
        }
    }

    #[test]
    fn test_rentable_requires_available_and_not_withdrawn() {
        let mut it = item();
        assert!(it.is_rentable());

        it.availability = Availability::Unavailable;
        assert!(!it.is_rentable());

        let mut it = item();
        it.withdraw();
        assert!(!it.is_rentable());
        assert_eq!(it.availability, Availability::Unavailable);
    }
}
