//! Domain entities, value objects and the repository port traits.

pub mod identity;
pub mod item;
pub mod money;
pub mod order;
pub mod payment;
pub mod ports;
pub mod profile;
pub mod request;
