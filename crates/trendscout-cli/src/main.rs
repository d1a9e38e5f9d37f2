mod analyze;
mod format;
mod scrape;
mod stored;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "trendscout-cli")]
#[command(about = "Scrape, store and query Google Trends")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Scrape live trends and print them
    Scrape(scrape::ScrapeArgs),
    /// Scrape two regions and compare their trend titles
    Compare(analyze::CompareArgs),
    /// Check a saved JSON scrape for missing or malformed fields
    Validate { file: PathBuf },
    /// Scrape one region and save the trends
    Update {
        #[arg(long, default_value = "IN")]
        geo: String,
        #[arg(long, default_value = "24")]
        hours: String,
    },
    /// List stored trends
    List(stored::ListArgs),
    /// Per-category stats over the last 24 hours
    Stats {
        #[arg(long, default_value = "IN")]
        geo: String,
    },
    /// Delete stored trends older than the retention window
    Cleanup {
        /// Defaults to TRENDSCOUT_RETENTION_DAYS
        #[arg(long)]
        days: Option<u32>,
    },
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    Ping,
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("trendscout-cli: run with --help for commands");
        return Ok(());
    };

    let config = trendscout_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match command {
        Commands::Scrape(args) => scrape::run_scrape(&config, &args).await,
        Commands::Compare(args) => analyze::run_compare(&config, &args).await,
        Commands::Validate { file } => analyze::run_validate(&file).await,
        Commands::Update { geo, hours } => stored::run_update(&config, &geo, &hours).await,
        Commands::List(args) => stored::run_list(&config, &args).await,
        Commands::Stats { geo } => stored::run_stats(&config, &geo).await,
        Commands::Cleanup { days } => {
            stored::run_cleanup(&config, days.unwrap_or(config.retention_days)).await
        }
        Commands::Db { command } => match command {
            DbCommands::Ping => stored::run_db_ping(&config).await,
            DbCommands::Migrate => stored::run_db_migrate(&config).await,
        },
    }
}
