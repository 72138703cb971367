mod calendar;
mod config;
mod error;
mod evaluator;
mod flight_search;
mod monitoring;
mod runner;
mod tracker;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use evaluator::DealEvaluator;
use flight_search::FlightSearchClient;
use monitoring::EmailNotifier;
use runner::DealRunner;
use tracker::{Clock, Database, SystemClock};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check fares for upcoming travel windows and alert on deals
    Check {
        /// Detect deals but skip email dispatch and alert bookkeeping
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate configuration (API key, database, SMTP credentials)
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    info!("Starting FareWatch - flight deal monitor");

    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::Check { dry_run }) => {
            run_farewatch(*dry_run).await?;
        }
        Some(Commands::Init) => {
            config::initialize_config().await?;
        }
        None => {
            info!("No command specified. Use --help for available commands.");
        }
    }

    Ok(())
}

async fn run_farewatch(dry_run: bool) -> Result<()> {
    info!("Loading configuration...");
    let config = config::load_config()?;

    let today = Utc::now().date_naive();
    let windows = calendar::upcoming_windows(today, config.lookahead_days);
    if windows.is_empty() {
        info!(
            "No upcoming travel windows in the next {} days",
            config.lookahead_days
        );
        return Ok(());
    }

    info!("Checking {} travel windows", windows.len());

    // Initialize components
    let db = Database::connect(&config.database_url)
        .await
        .with_context(|| format!("opening database {}", config.database_url))?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = db.price_store(clock.clone());
    let ledger = db.alert_ledger(clock);
    let evaluator = DealEvaluator::new(
        config.absolute_threshold,
        config.relative_drop_pct,
        config.min_data_points,
    );
    let source = FlightSearchClient::new(config.clone())?;
    let notifier = EmailNotifier::new(config)?;

    let deal_runner = DealRunner::new(
        Box::new(source),
        Box::new(notifier),
        store,
        ledger,
        evaluator,
        dry_run,
    );
    deal_runner.run(&windows).await;

    Ok(())
}
