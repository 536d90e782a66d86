//! atelier-sync - billing-state reconciliation job.
//!
//! Reconciles subscription state from the payment provider into the
//! internal identity-and-subscription store. Invoked on demand, either
//! live or as a dry run that reports every decision without writing.

use std::path::{Path, PathBuf};

use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

use atelier_billing_sync::{
    EngineOptions, Environment, PgIdentityStore, PgSubscriptionStore, PlanCatalog,
    ReconciliationEngine, SyncRunReport,
};
use atelier_provider::HttpProviderGateway;

mod config;
mod error;

use config::AppConfig;
use error::{CliError, CliResult};

/// Reconcile provider billing state into the Atelier store.
#[derive(Parser)]
#[command(name = "atelier-sync")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Compute and report every decision without writing anything.
    #[arg(long)]
    dry_run: bool,

    /// Environment discriminator for store keys (live or test).
    #[arg(long, default_value = "live")]
    environment: String,

    /// Directory the run report is written into.
    #[arg(long, default_value = "reports")]
    report_dir: PathBuf,

    /// Provider page size.
    #[arg(long, default_value_t = 100)]
    page_size: u32,

    /// Email fallback search bound, in directory pages.
    #[arg(long, default_value_t = 10)]
    search_page_bound: u32,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            e.print();
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    // Pre-flight: credentials are checked before any network call.
    let config = AppConfig::from_env()?;
    let environment: Environment = cli.environment.parse().map_err(CliError::Config)?;

    let gateway = HttpProviderGateway::new(&config.provider_base_url, &config.provider_api_key)
        .map_err(|e| CliError::Config(e.to_string()))?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .map_err(|e| CliError::Store(e.to_string()))?;

    let options = EngineOptions {
        environment,
        dry_run: cli.dry_run,
        page_size: cli.page_size,
        search_page_bound: cli.search_page_bound,
        ..EngineOptions::default()
    };

    info!(mode = %options.mode(), environment = %environment, "Starting billing sync");

    let engine = ReconciliationEngine::with_default_cache(
        gateway,
        PgIdentityStore::new(pool.clone()),
        PgSubscriptionStore::new(pool),
        PlanCatalog::builtin(),
        options,
    );

    match engine.run().await {
        Ok(report) => {
            let path = write_report(&report, &cli.report_dir)?;
            print_summary(&report, &path);
            Ok(())
        }
        Err(aborted) => {
            // Outcomes produced before the abort still reach the
            // audit trail.
            let path = write_report(&aborted.partial, &cli.report_dir)?;
            print_summary(&aborted.partial, &path);
            Err(CliError::Provider(aborted.source.to_string()))
        }
    }
}

fn write_report(report: &SyncRunReport, dir: &Path) -> CliResult<PathBuf> {
    report
        .write_to_dir(dir)
        .map_err(|e| CliError::Report(e.to_string()))
}

fn print_summary(report: &SyncRunReport, path: &Path) {
    let s = &report.summary;
    println!(
        "{} run: {} created, {} updated, {} skipped, {} errors ({} total, {}s)",
        report.mode, s.created, s.updated, s.skipped, s.error, s.total, report.duration_seconds
    );
    if let Some(error) = &report.error {
        println!("run aborted: {error}");
    }
    println!("report written to {}", path.display());
}
