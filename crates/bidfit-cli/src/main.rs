mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "bidfit-cli")]
#[command(about = "Supplier capability and credibility analysis")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Analyze one supplier and persist the result
    Analyze {
        #[arg(long)]
        supplier: Uuid,
        /// JSON file with enrichment data for this supplier
        #[arg(long)]
        enrichment: Option<PathBuf>,
    },
    /// Analyze several suppliers in micro-batches
    Batch {
        #[arg(long = "supplier", required = true, num_args = 1..)]
        suppliers: Vec<Uuid>,
    },
    /// Show stored analyses and what changed between them
    History {
        #[arg(long)]
        supplier: Uuid,
    },
    /// Aggregate statistics over active suppliers
    Stats,
    /// Archive a supplier so it stops accepting analyses
    Retire {
        #[arg(long)]
        supplier: Uuid,
    },
    /// Move analysis history older than the retention window to the archive
    Archive {
        /// Defaults to `BIDFIT_RETENTION_DAYS`
        #[arg(long)]
        days: Option<u32>,
    },
    /// Load supplier records from a JSON array file
    Import {
        #[arg(long)]
        file: PathBuf,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    Ping,
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("bidfit-cli ready; run with --help for commands");
        return Ok(());
    };

    let config = bidfit_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = bidfit_db::PoolConfig::from_app_config(&config);
    let pool = bidfit_db::connect_pool(&config.database_url, pool_config).await?;
    if !matches!(command, Commands::Db { .. }) {
        bidfit_db::run_migrations(&pool).await?;
    }

    match command {
        Commands::Db { command } => match command {
            DbCommands::Ping => commands::run_db_ping(&pool).await,
            DbCommands::Migrate => commands::run_db_migrate(&pool).await,
        },
        Commands::Analyze {
            supplier,
            enrichment,
        } => {
            let service = commands::build_service(pool, &config)?;
            commands::run_analyze(&service, supplier, enrichment.as_deref()).await
        }
        Commands::Batch { suppliers } => {
            let service = commands::build_service(pool, &config)?;
            commands::run_batch(&service, &suppliers).await
        }
        Commands::History { supplier } => {
            let service = commands::build_service(pool, &config)?;
            commands::run_history(&service, supplier).await
        }
        Commands::Stats => {
            let service = commands::build_service(pool, &config)?;
            commands::run_stats(&service).await
        }
        Commands::Retire { supplier } => {
            let service = commands::build_service(pool, &config)?;
            commands::run_retire(&service, supplier).await
        }
        Commands::Archive { days } => {
            let service = commands::build_service(pool, &config)?;
            commands::run_archive(&service, days.unwrap_or(config.retention_days)).await
        }
        Commands::Import { file } => {
            let service = commands::build_service(pool, &config)?;
            commands::run_import(&service, &file).await
        }
    }
}
