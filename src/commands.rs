//! CLI command implementations

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Subcommand;
use rand::rngs::OsRng;
use rand::RngCore;
use safer_streets_client::config::{API_KEY_VAR, API_URL_VAR, TIMEOUT_VAR};
use safer_streets_client::{
    ApiClient, AreaView, ClientConfig, ClientError, ComparisonView, DemographicsView, HotspotView,
    PersistenceView, RepetitionRequest, Session,
};
use safer_streets_core::{load_catalog, Month, Repository};
use safer_streets_server::{ApiCredential, ApiServer, ServerConfig};
use safer_streets_watcher::ReloadService;
use serde::Serialize;

/// Salt used when the key is given in plaintext.
const STARTUP_SALT: &str = "safer-streets";

#[derive(Subcommand)]
pub enum Query {
    /// Service status and data totals
    Health,
    /// List every force
    Forces,
    /// A force and its land area
    Area { force: String },
    /// One dataset's values for a force
    Record { dataset: String, force: String },
    /// One dataset across several forces
    Compare {
        dataset: String,
        #[arg(required = true)]
        forces: Vec<String>,
    },
    /// Classification stability over a snapshot series
    Persistence { force: String, series: String },
    /// Top cells over the given months
    Hotspots {
        force: String,
        category: String,
        /// Months as YYYY-MM
        #[arg(long, value_delimiter = ',', required = true)]
        months: Vec<Month>,
        #[arg(short, long, default_value = "10")]
        n_hotspots: usize,
    },
    /// Top cells across every force
    National {
        category: String,
        /// Months as YYYY-MM
        #[arg(long, value_delimiter = ',', required = true)]
        months: Vec<Month>,
        #[arg(short, long, default_value = "10")]
        n_hotspots: usize,
    },
    /// Hotspot repetition over rolling windows
    Repetition {
        force: String,
        category: String,
        #[arg(long)]
        window: Option<usize>,
        #[arg(long)]
        step: Option<usize>,
        #[arg(long)]
        prediction: Option<usize>,
        /// Percentage of the force area the hotspots may cover
        #[arg(long)]
        coverage: Option<f64>,
        #[arg(short, long)]
        n_hotspots: Option<usize>,
    },
    /// Rebuild the server's data from disk
    Reload,
}

/// Pick the server credential: a stored digest wins over a plaintext key.
pub fn credential(key_hash: Option<&str>, api_key: Option<&str>) -> anyhow::Result<ApiCredential> {
    match (key_hash, api_key) {
        (Some(stored), _) => ApiCredential::parse(stored).context("SAFER_STREETS_API_KEY_HASH is invalid"),
        (None, Some(key)) => {
            ApiCredential::from_secret(STARTUP_SALT, key).context("SAFER_STREETS_API_KEY is invalid")
        }
        (None, None) => bail!("set SAFER_STREETS_API_KEY_HASH or SAFER_STREETS_API_KEY"),
    }
}

pub async fn serve(
    data_dir: PathBuf,
    host: String,
    port: u16,
    credential: ApiCredential,
    watch: bool,
) -> anyhow::Result<()> {
    tracing::info!("Starting Safer Streets API on {}:{}", host, port);

    // Load completes before the listener binds
    let repository = Arc::new(Repository::load(&data_dir).context("failed to load data")?);

    if watch {
        let service = ReloadService::new(Arc::clone(&repository))?;
        tokio::spawn(async move {
            if let Err(e) = service.run().await {
                tracing::error!("Data watcher error: {}", e);
            }
        });
    }

    let server = ApiServer::new(repository, credential, ServerConfig { host, port });
    server.start().await
}

pub fn check(data_dir: PathBuf) -> anyhow::Result<()> {
    let catalog = load_catalog(&data_dir).context("data directory is invalid")?;
    let stats = catalog.stats();
    println!("{}", data_dir.display());
    println!("  areas       {}", stats.areas);
    println!("  datasets    {} ({} series)", stats.datasets, stats.series);
    for series in catalog.series() {
        let snapshots = catalog.snapshots(&series)?;
        println!("    {:<12} {} snapshots", series, snapshots.len());
    }
    println!("  categories  {}", catalog.categories().collect::<Vec<_>>().join(", "));
    println!("  cells       {}", stats.cells);
    Ok(())
}

pub fn hash_key(key: &str, salt: Option<String>) -> anyhow::Result<()> {
    let salt = salt.unwrap_or_else(generate_salt);
    let credential = ApiCredential::from_secret(salt, key)?;
    println!("{}", credential.encode());
    Ok(())
}

const SALT_BYTES: usize = 16;

fn generate_salt() -> String {
    let mut salt = [0u8; SALT_BYTES];
    OsRng.fill_bytes(&mut salt);
    hex::encode(salt)
}

pub async fn query(
    url: Option<String>,
    api_key: Option<String>,
    timeout: Option<u64>,
    query: Query,
) -> anyhow::Result<()> {
    let config = ClientConfig::from_lookup(|var| {
        let flag = match var {
            API_URL_VAR => url.clone(),
            API_KEY_VAR => api_key.clone(),
            TIMEOUT_VAR => timeout.map(|t| t.to_string()),
            _ => None,
        };
        flag.or_else(|| std::env::var(var).ok())
    })?;
    let client = ApiClient::new(config)?;
    let mut session = Session::new(client);

    run_query(&mut session, query).await.map_err(|e| {
        tracing::debug!("Query failed: {}", e);
        anyhow::anyhow!(e.user_message())
    })
}

async fn run_query(session: &mut Session, query: Query) -> Result<(), ClientError> {
    match query {
        Query::Health => print_json(&session.client().health().await?),
        Query::Forces => {
            for force in session.forces().await? {
                println!("{}  {}", force.id, force.name);
            }
        }
        Query::Area { force } => println!("{}", AreaView::load(session, &force).await?),
        Query::Record { dataset, force } => {
            print!("{}", DemographicsView::load(session, &force, &dataset).await?)
        }
        Query::Compare { dataset, forces } => {
            let forces: Vec<&str> = forces.iter().map(String::as_str).collect();
            print_json(&ComparisonView::load(session, &dataset, &forces).await?)
        }
        Query::Persistence { force, series } => {
            println!("{}", PersistenceView::load(session, &force, &series).await?)
        }
        Query::Hotspots {
            force,
            category,
            months,
            n_hotspots,
        } => print_json(&session.hotspots(&force, &category, &months, n_hotspots).await?),
        Query::National {
            category,
            months,
            n_hotspots,
        } => print_json(&session.national_hotspots(&category, &months, n_hotspots).await?),
        Query::Repetition {
            force,
            category,
            window,
            step,
            prediction,
            coverage,
            n_hotspots,
        } => {
            let request = RepetitionRequest {
                window,
                step,
                prediction,
                coverage,
                n_hotspots,
            };
            print!("{}", HotspotView::load(session, &force, &category, &request).await?)
        }
        Query::Reload => print_json(&session.client().reload().await?),
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => tracing::error!("Could not render response: {}", e),
    }
}
