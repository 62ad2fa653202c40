#![allow(dead_code)]

use chrono::{Duration, Utc};
use rentmatch::application::engine::RentalEngine;
use rentmatch::config::EngineConfig;
use rentmatch::domain::item::{Availability, Item, ItemId};
use rentmatch::domain::money::Money;
use rentmatch::domain::ports::{ItemStore, ProfileStore};
use rentmatch::domain::profile::{Location, PriceRange, Profile, ProfileId, Role};
use rentmatch::infrastructure::in_memory::InMemoryStore;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

/// Engine wired over one shared in-memory store.
pub fn engine_over(store: &InMemoryStore) -> RentalEngine {
    engine_with_config(store, EngineConfig::default())
}

pub fn engine_with_config(store: &InMemoryStore, config: EngineConfig) -> RentalEngine {
    RentalEngine::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        config,
    )
    .expect("valid config")
}

/// Deterministic id so orderings can be asserted.
pub fn profile_id(n: u128) -> ProfileId {
    ProfileId(Uuid::from_u128(n))
}

pub fn money(value: i64) -> Money {
    Money::new(Decimal::new(value, 0)).unwrap()
}

pub fn range(min: i64, max: i64) -> PriceRange {
    PriceRange::new(money(min), money(max)).unwrap()
}

pub async fn seed_profile(
    store: &InMemoryStore,
    id: ProfileId,
    role: Role,
    interests: &[&str],
    location: Option<&str>,
    price_range: Option<PriceRange>,
) -> Profile {
    let mut profile = Profile::new(id, role);
    profile.interests = interests.iter().map(|s| s.to_string()).collect();
    profile.location = location.map(|name| Location::Named(name.into()));
    profile.price_range = price_range;
    // Pin activity so tie-breaks don't depend on wall-clock jitter.
    profile.last_active_at = Utc::now() - Duration::days(1);
    ProfileStore::store(store, profile.clone()).await.unwrap();
    profile
}

pub async fn seed_client(store: &InMemoryStore, id: ProfileId) -> Profile {
    seed_profile(
        store,
        id,
        Role::Client,
        &["electronics"],
        Some("Cape Town"),
        Some(range(100, 300)),
    )
    .await
}

pub async fn seed_business(store: &InMemoryStore, id: ProfileId) -> Profile {
    seed_profile(
        store,
        id,
        Role::Business,
        &["electronics"],
        Some("Cape Town"),
        Some(range(120, 250)),
    )
    .await
}

pub async fn seed_item(store: &InMemoryStore, owner_id: ProfileId, price: i64) -> Item {
    let item = Item {
        id: ItemId::random(),
        owner_id,
        category: "electronics".into(),
        price_per_day: money(price),
        location: Some(Location::Named("Cape Town".into())),
        availability: Availability::Available,
        withdrawn: false,
    };
    ItemStore::store(store, item.clone()).await.unwrap();
    item
}
