mod closeups;
mod crawl;
mod ingest;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::closeups::CatalogSource;
use crate::ingest::ImportModeArg;

#[derive(Debug, Parser)]
#[command(name = "tilecat-cli")]
#[command(about = "Tile catalog crawler and close-up image resolver")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Crawl every seed catalog product page into a JSON file
    Crawl {
        /// Where to write the crawled products
        #[arg(long, default_value = "productos.json")]
        output: PathBuf,
        /// Crawl only the first N seed products
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Find close-up images for products that have none
    Closeups {
        /// Where the product catalog is read from
        #[arg(long, value_enum, default_value_t = CatalogSource::Api)]
        source: CatalogSource,
        /// Where to write the resolution report
        #[arg(long, default_value = "tile-images.json")]
        output: PathBuf,
        /// Resolve and print the summary without writing the report
        #[arg(long)]
        dry_run: bool,
    },
    /// Load crawled products into the database
    Import {
        /// Crawl output to import
        #[arg(long, default_value = "productos.json")]
        input: PathBuf,
        /// How to treat products already in the database; omit to only
        /// print counts
        #[arg(long, value_enum)]
        mode: Option<ImportModeArg>,
    },
    /// Append resolved close-ups from a report to product galleries
    ApplyCloseups {
        /// Resolution report written by `closeups`
        #[arg(long, default_value = "tile-images.json")]
        input: PathBuf,
    },
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Apply pending migrations
    Migrate,
    /// Check that the database answers
    Ping,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    let config = tilecat_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let Some(command) = cli.command else {
        println!("tilecat-cli: no command given, see --help");
        return Ok(());
    };

    match command {
        Commands::Crawl { output, limit } => crawl::run_crawl(&config, &output, limit).await,
        Commands::Closeups {
            source,
            output,
            dry_run,
        } => closeups::run_closeups(&config, source, &output, dry_run).await,
        Commands::Import { input, mode } => {
            let pool = connect(&config).await?;
            ingest::run_import(&pool, &input, mode.map(Into::into)).await
        }
        Commands::ApplyCloseups { input } => {
            let pool = connect(&config).await?;
            ingest::run_apply_closeups(&pool, &input).await
        }
        Commands::Db { command } => {
            let pool = tilecat_db::connect_pool(
                &config.database_url,
                tilecat_db::PoolConfig::from_app_config(&config),
            )
            .await?;
            match command {
                DbCommands::Migrate => {
                    let applied = tilecat_db::run_migrations(&pool).await?;
                    println!("migrations applied: {applied}");
                }
                DbCommands::Ping => {
                    tilecat_db::ping(&pool).await?;
                    println!("database ok");
                }
            }
            Ok(())
        }
    }
}

/// Opens the pool and brings the schema up to date.
async fn connect(config: &tilecat_core::AppConfig) -> anyhow::Result<sqlx::SqlitePool> {
    let pool = tilecat_db::connect_pool(
        &config.database_url,
        tilecat_db::PoolConfig::from_app_config(config),
    )
    .await?;
    tilecat_db::run_migrations(&pool).await?;
    Ok(pool)
}
