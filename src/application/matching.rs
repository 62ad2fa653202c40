use crate::application::with_deadline;
use crate::config::{EngineConfig, MatchWeights};
use crate::domain::ports::ProfileStoreArc;
use crate::domain::profile::{Location, PriceRange, Profile, ProfileId, Role};
use crate::error::{EngineError, Result};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Score used when location data is missing or incomparable on either side.
const NEUTRAL_LOCATION_SCORE: f64 = 0.5;
/// Score used when price data is missing on either side.
const NEUTRAL_PRICE_SCORE: f64 = 0.5;
/// Distance at which proximity decays to half strength.
const DISTANCE_SCALE_KM: f64 = 50.0;
const EARTH_RADIUS_KM: f64 = 6371.0;

/// The scoring-relevant slice of a subject profile.
#[derive(Debug, Clone, Copy)]
pub struct MatchIntent<'a> {
    pub interests: &'a BTreeSet<String>,
    pub location: Option<&'a Location>,
    pub price_range: Option<&'a PriceRange>,
}

impl<'a> From<&'a Profile> for MatchIntent<'a> {
    fn from(profile: &'a Profile) -> Self {
        Self {
            interests: &profile.interests,
            location: profile.location.as_ref(),
            price_range: profile.price_range.as_ref(),
        }
    }
}

/// Compatibility score in [0,1]. Pure and deterministic: no I/O, identical
/// inputs always produce the identical score.
pub fn score(intent: &MatchIntent<'_>, candidate: &Profile, weights: &MatchWeights) -> f64 {
    let category = category_score(intent.interests, &candidate.interests);
    let location = location_score(intent.location, candidate.location.as_ref());
    let price = price_score(intent.price_range, candidate.price_range.as_ref());

    (weights.category * category + weights.location * location + weights.price * price)
        .clamp(0.0, 1.0)
}

/// Jaccard overlap of the two interest sets. An empty set on either side
/// contributes nothing rather than being treated as a wildcard.
fn category_score(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    intersection / union
}

/// Bounded proximity: 1 at zero distance, decaying with distance, and a
/// neutral mid-score whenever the two sides cannot be compared.
fn location_score(a: Option<&Location>, b: Option<&Location>) -> f64 {
    match (a, b) {
        (
            Some(Location::Point { lat: lat1, lon: lon1 }),
            Some(Location::Point { lat: lat2, lon: lon2 }),
        ) => {
            let distance = haversine_km(*lat1, *lon1, *lat2, *lon2);
            1.0 / (1.0 + distance / DISTANCE_SCALE_KM)
        }
        (Some(Location::Named(a)), Some(Location::Named(b))) => {
            if a.trim().eq_ignore_ascii_case(b.trim()) {
                1.0
            } else {
                0.0
            }
        }
        _ => NEUTRAL_LOCATION_SCORE,
    }
}

/// Overlap of the client budget and the business pricing window, relative to
/// the narrower of the two. Zero overlap scores 0 but never rejects the
/// candidate outright.
fn price_score(budget: Option<&PriceRange>, window: Option<&PriceRange>) -> f64 {
    let (Some(budget), Some(window)) = (budget, window) else {
        return NEUTRAL_PRICE_SCORE;
    };
    let lo = budget.min().value().max(window.min().value());
    let hi = budget.max().value().min(window.max().value());
    if hi < lo {
        return 0.0;
    }
    let budget_width = budget.max().value() - budget.min().value();
    let window_width = window.max().value() - window.min().value();
    let denominator = budget_width.min(window_width);
    if denominator == Decimal::ZERO {
        // A point range intersecting the other window is a full fit.
        return 1.0;
    }
    ((hi - lo) / denominator).to_f64().unwrap_or(0.0).clamp(0.0, 1.0)
}

fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    // Rounding can nudge `a` past 1 for near-antipodal points, which would
    // turn the asin into NaN.
    2.0 * EARTH_RADIUS_KM * a.min(1.0).sqrt().asin()
}

/// One entry of a ranked result list.
#[derive(Debug, Clone, Serialize)]
pub struct RankedMatch {
    pub profile: Profile,
    pub score: f64,
}

/// Ranks opposite-role counterparties for a subject profile.
pub struct MatchRanker {
    profiles: ProfileStoreArc,
    config: EngineConfig,
}

impl MatchRanker {
    pub fn new(profiles: ProfileStoreArc, config: EngineConfig) -> Self {
        Self { profiles, config }
    }

    /// Ranked businesses for a client's rental intent.
    pub async fn find_business_matches(&self, client_id: ProfileId) -> Result<Vec<RankedMatch>> {
        self.find(client_id, Role::Client).await
    }

    /// Ranked clients likely to rent from a business.
    pub async fn find_client_matches(&self, business_id: ProfileId) -> Result<Vec<RankedMatch>> {
        self.find(business_id, Role::Business).await
    }

    async fn find(&self, subject_id: ProfileId, subject_role: Role) -> Result<Vec<RankedMatch>> {
        let timeout = self.config.port_timeout;
        let subject = with_deadline(timeout, "profiles.get", self.profiles.get(subject_id))
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("profile {subject_id}")))?;
        if subject.role != subject_role {
            return Err(EngineError::Validation(format!(
                "profile {subject_id} is not a {subject_role}"
            )));
        }

        let candidates = with_deadline(
            timeout,
            "profiles.query_by_role",
            self.profiles
                .query_by_role(subject_role.opposite(), self.config.candidate_page_size),
        )
        .await?;

        let intent = MatchIntent::from(&subject);
        let weights = &self.config.weights;
        let mut ranked: Vec<RankedMatch> = candidates
            .into_iter()
            .filter(|candidate| candidate.id != subject.id)
            .map(|candidate| RankedMatch {
                score: score(&intent, &candidate, weights),
                profile: candidate,
            })
            .collect();

        // Deterministic order: score desc, most recent activity, then id.
        ranked.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.profile.last_active_at.cmp(&a.profile.last_active_at))
                .then_with(|| a.profile.id.cmp(&b.profile.id))
        });
        ranked.truncate(self.config.max_matches);

        tracing::debug!(
            subject = %subject_id,
            role = %subject_role,
            matches = ranked.len(),
            "ranked counterparties"
        );
        Ok(ranked)
    }
}
