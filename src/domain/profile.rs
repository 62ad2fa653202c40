use crate::domain::money::Money;
use crate::error::{EngineError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(pub Uuid);

impl ProfileId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which side of the marketplace a profile belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Business,
    Client,
}

impl Role {
    pub fn opposite(self) -> Self {
        match self {
            Self::Business => Self::Client,
            Self::Client => Self::Business,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Business => write!(f, "business"),
            Self::Client => write!(f, "client"),
        }
    }
}

/// A geographic locator: either coordinates or a free-text place name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Location {
    Point { lat: f64, lon: f64 },
    Named(String),
}

/// An inclusive price window, `min <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPriceRange")]
pub struct PriceRange {
    min: Money,
    max: Money,
}

#[derive(Deserialize)]
struct RawPriceRange {
    min: Money,
    max: Money,
}

impl TryFrom<RawPriceRange> for PriceRange {
    type Error = EngineError;

    fn try_from(raw: RawPriceRange) -> Result<Self> {
        Self::new(raw.min, raw.max)
    }
}

impl PriceRange {
    pub fn new(min: Money, max: Money) -> Result<Self> {
        if min > max {
            return Err(EngineError::Validation(format!(
                "price range min {min} exceeds max {max}"
            )));
        }
        Ok(Self { min, max })
    }

    /// A zero-width window around a single price point.
    pub fn point(price: Money) -> Self {
        Self {
            min: price,
            max: price,
        }
    }

    pub fn min(&self) -> Money {
        self.min
    }

    pub fn max(&self) -> Money {
        self.max
    }
}

/// A marketplace participant. Never deleted, only deactivated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub role: Role,
    /// Category ids this profile deals in (business) or is interested in (client).
    #[serde(default)]
    pub interests: BTreeSet<String>,
    #[serde(default)]
    pub location: Option<Location>,
    /// Client budget or business pricing window.
    #[serde(default)]
    pub price_range: Option<PriceRange>,
    #[serde(default = "default_active")]
    pub active: bool,
    pub last_active_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl Profile {
    pub fn new(id: ProfileId, role: Role) -> Self {
        Self {
            id,
            role,
            interests: BTreeSet::new(),
            location: None,
            price_range: None,
            active: true,
            last_active_at: Utc::now(),
        }
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }
}
