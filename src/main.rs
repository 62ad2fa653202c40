use clap::{Parser, Subcommand, ValueEnum};
use miette::{IntoDiagnostic, Result};
use rentmatch::application::engine::RentalEngine;
use rentmatch::config::EngineConfig;
use rentmatch::domain::identity::Caller;
use rentmatch::domain::ports::{
    ItemStoreArc, PaymentStoreArc, ProfileStoreArc, RequestStoreArc,
};
use rentmatch::domain::profile::{ProfileId, Role};
use rentmatch::infrastructure::in_memory::InMemoryStore;
use rentmatch::interfaces::json::seed_reader::SeedReader;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON seed fixture with profiles, items, requests and payments
    seed: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[cfg(feature = "storage-rocksdb")]
    #[arg(long)]
    db_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rank counterparties for a subject profile
    Match {
        #[arg(long, value_enum)]
        role: CliRole,
        #[arg(long)]
        subject: Uuid,
    },
    /// Sweep completed payments into merchant payouts (operator capability)
    Settle {
        #[arg(long)]
        operator: Uuid,
    },
    /// Total settled earnings for a business
    Earnings {
        #[arg(long)]
        business: Uuid,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum CliRole {
    Client,
    Business,
}

impl From<CliRole> for Role {
    fn from(role: CliRole) -> Self {
        match role {
            CliRole::Client => Role::Client,
            CliRole::Business => Role::Business,
        }
    }
}

type Stores = (
    ProfileStoreArc,
    ItemStoreArc,
    RequestStoreArc,
    PaymentStoreArc,
);

fn in_memory_stores() -> Stores {
    let store = InMemoryStore::new();
    (
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store),
    )
}

#[cfg(feature = "storage-rocksdb")]
fn rocksdb_stores(path: &std::path::Path) -> Result<Stores> {
    use rentmatch::infrastructure::rocksdb::RocksDbStore;
    let store = RocksDbStore::open(path).into_diagnostic()?;
    Ok((
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    #[cfg(feature = "storage-rocksdb")]
    let (profiles, items, requests, payments) = match &cli.db_path {
        Some(path) => rocksdb_stores(path)?,
        None => in_memory_stores(),
    };
    #[cfg(not(feature = "storage-rocksdb"))]
    let (profiles, items, requests, payments) = in_memory_stores();

    let file = File::open(&cli.seed).into_diagnostic()?;
    let seed = SeedReader::new(file).read().into_diagnostic()?;
    seed.apply(&profiles, &items, &requests, &payments)
        .await
        .into_diagnostic()?;

    let engine = RentalEngine::new(profiles, items, requests, payments, EngineConfig::default())
        .into_diagnostic()?;

    match cli.command {
        Command::Match { role, subject } => {
            let matches = engine
                .find_matches(role.into(), ProfileId(subject))
                .await
                .into_diagnostic()?;
            println!(
                "{}",
                serde_json::to_string_pretty(&matches).into_diagnostic()?
            );
        }
        Command::Settle { operator } => {
            let report = engine
                .settle_pending_payouts(&Caller::operator(ProfileId(operator)))
                .await
                .into_diagnostic()?;
            println!(
                "{}",
                serde_json::to_string_pretty(&report).into_diagnostic()?
            );
        }
        Command::Earnings { business } => {
            let business_id = ProfileId(business);
            let earnings = engine
                .business_earnings(&Caller::user(business_id), business_id)
                .await
                .into_diagnostic()?;
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "business": business_id,
                    "earnings": earnings,
                }))
                .into_diagnostic()?
            );
        }
    }

    Ok(())
}
