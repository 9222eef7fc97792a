//! Operator-run import of the seven legacy per-category collections into the
//! unified catalog table.
//!
//! Each collection is read from `<source-dir>/<collection>.json` (a JSON array
//! of records). The import only runs against an empty catalog; a second run
//! reports `skipped` and writes nothing.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::{ArgAction, Parser};
use tracing::info;

use bakery_catalog::repositories::{JsonDirectorySource, SeaOrmProductRepository};
use bakery_catalog::services::LegacyMigration;
use bakery_catalog::services::slug::DEFAULT_MAX_ATTEMPTS;

const DEFAULT_DATABASE_URL: &str = "sqlite://bakery.db?mode=rwc";

#[derive(Parser)]
#[command(
    name = "migrate-legacy",
    about = "Copy the legacy per-category product collections into the unified catalog",
    version
)]
struct Cli {
    #[arg(long, help = "Directory holding one <collection>.json export per legacy collection")]
    source_dir: PathBuf,

    #[arg(
        long,
        help = "Target database URL; defaults to APP__DATABASE_URL, then a local SQLite file"
    )]
    database_url: Option<String>,

    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS, help = "Slug suffixes probed per record")]
    slug_max_attempts: u32,

    #[arg(long, action = ArgAction::SetTrue, help = "Print the report as JSON")]
    json: bool,

    #[arg(long, default_value = "info", help = "Log level")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    bakery_catalog::config::init_tracing(&cli.log_level, false);

    let database_url = cli
        .database_url
        .clone()
        .or_else(|| std::env::var("APP__DATABASE_URL").ok())
        .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

    let db = bakery_catalog::db::establish_connection(&database_url)
        .await
        .with_context(|| format!("failed to connect to {}", database_url))?;
    bakery_catalog::db::run_migrations(&db)
        .await
        .context("failed to apply schema migrations")?;

    let source = Arc::new(JsonDirectorySource::new(&cli.source_dir));
    let repository = Arc::new(SeaOrmProductRepository::new(Arc::new(db)));
    let migration = LegacyMigration::new(source, repository, cli.slug_max_attempts);

    info!(source_dir = %cli.source_dir.display(), "starting legacy migration");
    let report = migration.run().await.context("legacy migration aborted")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if report.skipped {
        println!("Unified catalog already populated; nothing migrated.");
        return Ok(());
    }

    for collection in &report.per_collection {
        match &collection.error {
            Some(error) => println!("{:<10} unreadable: {}", collection.collection, error),
            None => println!(
                "{:<10} migrated {:>4}  deleted {:>4}  failed {:>4}",
                collection.collection,
                collection.migrated,
                collection.skipped_deleted,
                collection.failed
            ),
        }
    }
    println!("Total migrated: {}", report.total_migrated);

    Ok(())
}
