use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use database::Database;
use ingestion::{IngestionCoordinator, IngestionOptions, IngestionReport};
use mining::{Miner, ReportGenerator, ReportWriter};
use needfinder_core::{AppConfig, CoreError, ErrorExt};
use reddit_client::SourceRegistry;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "needfinder",
    about = "Collect forum posts and mine them for unmet user needs"
)]
struct Cli {
    /// Path to a TOML config file; built-in defaults apply without one
    #[arg(long, env = "NEEDFINDER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch new posts into the database
    Ingest(IngestArgs),
    /// Analyze the stored corpus and write the report
    Mine,
    /// Ingest, then mine
    Run(IngestArgs),
}

#[derive(Args)]
struct IngestArgs {
    /// Overrides `ingestion.global_item_quota` (0 = unlimited)
    #[arg(long)]
    max_items: Option<usize>,

    /// Overrides `ingestion.max_pages_per_collection`
    #[arg(long)]
    max_pages: Option<u32>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), CoreError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("needfinder=info,ingestion=info,reddit_client=info,mining=info,database=info")
        }))
        .init();

    let cli = Cli::parse();
    execute(cli).await.map_err(|e| {
        e.log_error();
        tracing::error!("needfinder aborted [{}]", e.error_code());
        e
    })
}

async fn execute(cli: Cli) -> Result<(), CoreError> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => {
            let config = AppConfig::default();
            config.validate()?;
            config
        }
    };

    let db = Database::connect(&config.database_url).await?;

    match cli.command {
        Command::Ingest(args) => {
            args.apply(&mut config)?;
            ingest(&config, &db).await?;
        }
        Command::Mine => mine(&config, &db).await?,
        Command::Run(args) => {
            args.apply(&mut config)?;
            ingest(&config, &db).await?;
            mine(&config, &db).await?;
        }
    }
    Ok(())
}

impl IngestArgs {
    fn apply(&self, config: &mut AppConfig) -> Result<(), CoreError> {
        if let Some(max_items) = self.max_items {
            config.ingestion.global_item_quota = max_items;
        }
        if let Some(max_pages) = self.max_pages {
            if max_pages == 0 {
                return Err(CoreError::InvalidInput {
                    message: "--max-pages must be at least 1".to_string(),
                });
            }
            config.ingestion.max_pages_per_collection = max_pages;
        }
        Ok(())
    }
}

async fn ingest(config: &AppConfig, db: &Database) -> Result<IngestionReport, CoreError> {
    tracing::info!(
        "Ingesting {} collections (quota: {:?})",
        config.collections.len(),
        config.ingestion.global_quota()
    );

    let sources = SourceRegistry::from_config(config)?;
    let coordinator =
        IngestionCoordinator::new(db, &sources, IngestionOptions::from_config(&config.ingestion));
    let report = coordinator.run(&config.collections).await?;

    for (collection, new_items) in report.new_items_by_collection() {
        tracing::info!("r/{}: {} new items", collection, new_items);
    }
    if report.total_write_failures() > 0 {
        tracing::warn!("{} records could not be written", report.total_write_failures());
    }
    Ok(report)
}

async fn mine(config: &AppConfig, db: &Database) -> Result<(), CoreError> {
    let items = db.load_items().await?;
    let comments = db.load_comments().await?;
    tracing::info!("Mining {} items and {} comments", items.len(), comments.len());

    let result = Miner::new(&config.lexicon, &config.mining).analyze(&items, &comments, Utc::now());
    let rendered = ReportGenerator::new(config.report.clone()).render(&result)?;
    ReportWriter::from_config(config).write(&rendered)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_args_override_config() {
        let cli = Cli::try_parse_from(["needfinder", "run", "--max-items", "0", "--max-pages", "3"])
            .unwrap();
        let Command::Run(args) = cli.command else {
            panic!("expected the run subcommand");
        };

        let mut config = AppConfig::default();
        args.apply(&mut config).unwrap();
        assert_eq!(config.ingestion.global_quota(), None);
        assert_eq!(config.ingestion.max_pages_per_collection, 3);
    }

    #[test]
    fn test_zero_page_budget_is_invalid_input() {
        let args = IngestArgs {
            max_items: None,
            max_pages: Some(0),
        };
        let mut config = AppConfig::default();

        let err = args.apply(&mut config).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
        assert!(err.is_fatal());
        assert_eq!(config.ingestion.max_pages_per_collection, 10);
    }
}
