use crate::domain::item::Item;
use crate::domain::payment::Payment;
use crate::domain::ports::{ItemStoreArc, PaymentStoreArc, ProfileStoreArc, RequestStoreArc};
use crate::domain::profile::Profile;
use crate::domain::request::RentalRequest;
use crate::error::Result;
use serde::Deserialize;
use std::io::Read;

/// A JSON fixture of marketplace state, as consumed by the demo CLI.
///
/// All sections are optional; an empty object is a valid (empty) seed.
#[derive(Debug, Default, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub profiles: Vec<Profile>,
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default)]
    pub requests: Vec<RentalRequest>,
    #[serde(default)]
    pub payments: Vec<Payment>,
}

impl SeedData {
    /// Loads every seeded entity into the given stores.
    pub async fn apply(
        self,
        profiles: &ProfileStoreArc,
        items: &ItemStoreArc,
        requests: &RequestStoreArc,
        payments: &PaymentStoreArc,
    ) -> Result<()> {
        for profile in self.profiles {
            profiles.store(profile).await?;
        }
        for item in self.items {
            items.store(item).await?;
        }
        for request in self.requests {
            requests.create(request).await?;
        }
        for payment in self.payments {
            payments.create(payment).await?;
        }
        Ok(())
    }
}

/// Reads a seed fixture from any `Read` source (e.g. File, Stdin).
pub struct SeedReader<R: Read> {
    source: R,
}

impl<R: Read> SeedReader<R> {
    pub fn new(source: R) -> Self {
        Self { source }
    }

    pub fn read(self) -> Result<SeedData> {
        Ok(serde_json::from_reader(self.source)?)
    }
}
