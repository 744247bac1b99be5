//! Safer Streets CLI entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "safer-streets")]
#[command(about = "Crime statistics API for police force areas, and a client to explore it", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the data directory and serve the API
    Serve {
        /// Data directory
        #[arg(long, env = "SAFER_STREETS_DATA_DIR")]
        data_dir: PathBuf,

        /// Port to listen on
        #[arg(short, long, default_value = "5000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Stored key digest, `<salt>:<hex sha256>`
        #[arg(long, env = "SAFER_STREETS_API_KEY_HASH", hide_env_values = true)]
        key_hash: Option<String>,

        /// Plaintext API key, hashed at startup
        #[arg(long, env = "SAFER_STREETS_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Reload when files under the data directory change
        #[arg(short, long)]
        watch: bool,
    },
    /// Validate the data directory and print a summary
    Check {
        /// Data directory
        #[arg(long, env = "SAFER_STREETS_DATA_DIR")]
        data_dir: PathBuf,
    },
    /// Print the stored digest for an API key
    HashKey {
        key: String,

        /// Salt to hash under (generated if omitted)
        #[arg(long)]
        salt: Option<String>,
    },
    /// Call a running server
    Query {
        /// Base URL of the API [env: SAFER_STREETS_API_URL]
        #[arg(long)]
        url: Option<String>,

        /// API key [env: SAFER_STREETS_API_KEY]
        #[arg(long)]
        api_key: Option<String>,

        /// Request timeout in seconds [env: SAFER_STREETS_TIMEOUT_SECS]
        #[arg(long)]
        timeout: Option<u64>,

        #[command(subcommand)]
        query: commands::Query,
    },
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "safer_streets={0},safer_streets_core={0},safer_streets_server={0},safer_streets_watcher={0},safer_streets_client={0},tower_http={0}",
            log_level
        )))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Serve {
            data_dir,
            port,
            host,
            key_hash,
            api_key,
            watch,
        } => {
            tracing::info!("Safer Streets v{}", env!("CARGO_PKG_VERSION"));
            let credential = commands::credential(key_hash.as_deref(), api_key.as_deref())?;
            commands::serve(data_dir, host, port, credential, watch).await
        }
        Commands::Check { data_dir } => commands::check(data_dir),
        Commands::HashKey { key, salt } => commands::hash_key(&key, salt),
        Commands::Query {
            url,
            api_key,
            timeout,
            query,
        } => commands::query(url, api_key, timeout, query).await,
        Commands::Version => {
            println!("Safer Streets v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
