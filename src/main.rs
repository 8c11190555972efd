use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use ipea_etl::analysis;
use ipea_etl::apis::{IpeaClient, RscriptRuntime};
use ipea_etl::config::Config;
use ipea_etl::logging;
use ipea_etl::pipeline::ingestion::SourceFetcher;
use ipea_etl::pipeline::processing::consolidate::{ConsolidatedTable, DataStatus, DatasetConsolidator};
use ipea_etl::pipeline::sources::default_plan;
use ipea_etl::pipeline::Pipeline;
use ipea_etl::storage::LayerStore;

#[derive(Parser)]
#[command(name = "ipea_etl")]
#[command(about = "Municipal indicators from IPEA: bronze, silver and gold layers")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every source, normalize, consolidate and write the analysis reports
    Run,
    /// Rebuild the gold table and reports from the silver files on disk
    Consolidate,
}

fn print_gold(gold: &ConsolidatedTable, store: &LayerStore) -> Result<()> {
    println!("\n🏁 Gold table: {} municipalities", gold.len());
    println!("   Complete: {}", gold.count_with_status(DataStatus::Complete));
    println!("   Incomplete: {}", gold.count_with_status(DataStatus::Incomplete));

    let reports = analysis::write_reports(gold, store).context("writing analysis reports")?;
    for report in &reports {
        println!("   📈 {}", report.path.display());
    }
    Ok(())
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();

    let config = Config::from_env().context("loading layer folders")?;
    let store = LayerStore::new(&config);
    store.ensure_dirs().context("creating layer folders")?;
    info!(?config, "Layer folders ready");

    let plan = default_plan();

    match cli.command {
        Commands::Run => {
            println!("🚀 Running full pipeline ({} sources)...", plan.len());
            let api = IpeaClient::new().context("building IPEA client")?;
            let fetcher = SourceFetcher::new(Box::new(api), Box::new(RscriptRuntime::default()));
            let pipeline = Pipeline::new(fetcher, store);

            let report = match pipeline.run(&plan) {
                Ok(report) => report,
                Err(e) => {
                    error!("Pipeline failed: {}", e);
                    println!("❌ Pipeline failed: {}", e);
                    return Err(e.into());
                }
            };

            println!("\n📊 Pipeline results (run {}):", report.run_id);
            for source in &report.sources {
                println!("   {} [{}]: {}", source.source, source.filename, source.outcome);
            }
            let skipped = report.skipped().count();
            if skipped > 0 {
                warn!("{} sources were skipped", skipped);
                println!("\n⚠️  {} of {} sources skipped", skipped, report.sources.len());
            }

            match &report.gold {
                Some(gold) => print_gold(gold, pipeline.store())?,
                None => println!("⚠️  No source succeeded; gold table not written"),
            }
        }
        Commands::Consolidate => {
            println!("🔨 Rebuilding gold table from silver files...");
            match DatasetConsolidator::default().rebuild_from_silver(&plan, &store)? {
                Some(gold) => print_gold(&gold, &store)?,
                None => println!("⚠️  No silver files found; gold table not written"),
            }
        }
    }

    println!("✅ Done");
    Ok(())
}
