use crate::error::{EngineError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

/// Tolerance when checking that scoring weights sum to 1.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Relative weights of the three scoring dimensions. Must sum to 1.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct MatchWeights {
    pub category: f64,
    pub location: f64,
    pub price: f64,
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self {
            category: 0.4,
            location: 0.3,
            price: 0.3,
        }
    }
}

impl MatchWeights {
    pub fn validate(&self) -> Result<()> {
        for (name, w) in [
            ("categoryWeight", self.category),
            ("locationWeight", self.location),
            ("priceWeight", self.price),
        ] {
            if !(0.0..=1.0).contains(&w) || !w.is_finite() {
                return Err(EngineError::Validation(format!(
                    "{name} must be in [0,1], got {w}"
                )));
            }
        }
        let sum = self.category + self.location + self.price;
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(EngineError::Validation(format!(
                "match weights must sum to 1, got {sum}"
            )));
        }
        Ok(())
    }
}

/// Process-wide engine configuration, read-only after [`EngineConfig::validated`].
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub weights: MatchWeights,
    /// Upper bound on the candidate pool fetched for one matching call.
    #[serde(default = "defaults::candidate_page_size")]
    pub candidate_page_size: usize,
    /// Maximum length of a ranked result list.
    #[serde(default = "defaults::max_matches")]
    pub max_matches: usize,
    /// Platform commission withheld from each payment, as a fraction of gross.
    #[serde(default = "defaults::commission_rate")]
    pub commission_rate: Decimal,
    /// Bounded retries for optimistic-conflict transition writes.
    #[serde(default = "defaults::transition_retries")]
    pub transition_retries: u32,
    /// Deadline applied to each repository port call, in milliseconds.
    #[serde(default = "defaults::port_timeout", with = "timeout_millis")]
    pub port_timeout: Duration,
}

mod defaults {
    use rust_decimal::Decimal;
    use std::time::Duration;

    pub fn candidate_page_size() -> usize {
        100
    }

    pub fn max_matches() -> usize {
        20
    }

    pub fn commission_rate() -> Decimal {
        Decimal::new(10, 2) // 0.10
    }

    pub fn transition_retries() -> u32 {
        3
    }

    pub fn port_timeout() -> Duration {
        Duration::from_secs(5)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            weights: MatchWeights::default(),
            candidate_page_size: defaults::candidate_page_size(),
            max_matches: defaults::max_matches(),
            commission_rate: defaults::commission_rate(),
            transition_retries: defaults::transition_retries(),
            port_timeout: defaults::port_timeout(),
        }
    }
}

impl EngineConfig {
    /// Validates the configuration, failing fast on any inconsistency.
    pub fn validated(self) -> Result<Self> {
        self.weights.validate()?;
        if self.candidate_page_size == 0 {
            return Err(EngineError::Validation(
                "candidate_page_size must be positive".into(),
            ));
        }
        if self.max_matches == 0 {
            return Err(EngineError::Validation(
                "max_matches must be positive".into(),
            ));
        }
        if self.commission_rate < Decimal::ZERO || self.commission_rate >= Decimal::ONE {
            return Err(EngineError::Validation(format!(
                "commission_rate must be in [0,1), got {}",
                self.commission_rate
            )));
        }
        if self.port_timeout.is_zero() {
            return Err(EngineError::Validation(
                "port_timeout must be positive".into(),
            ));
        }
        Ok(self)
    }
}

mod timeout_millis {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
