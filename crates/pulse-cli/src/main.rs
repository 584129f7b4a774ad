mod ingest;
mod query;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "pulse-cli")]
#[command(about = "Pulse media-monitoring command line interface")]
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
    /// Ingestion cycles
    Ingest {
        #[command(subcommand)]
        command: IngestCommands,
    },
    /// Keyword alerts
    Alerts {
        #[command(subcommand)]
        command: AlertCommands,
    },
    /// Ingestion run history
    Runs {
        #[command(subcommand)]
        command: RunCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check database connectivity
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[derive(Debug, Subcommand)]
enum IngestCommands {
    /// Run one ingestion cycle now and print its report
    Run,
}

#[derive(Debug, Subcommand)]
enum AlertCommands {
    /// List recent alerts, newest first
    List {
        /// Only alerts not yet marked read
        #[arg(long)]
        unread: bool,

        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
}

#[derive(Debug, Subcommand)]
enum RunCommands {
    /// List recent ingestion runs, newest first
    List {
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("pulse-cli: no command given; see --help");
        return Ok(());
    };

    let config = pulse_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = pulse_db::PoolConfig::from_app_config(&config);
    let pool = pulse_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Db {
            command: DbCommands::Ping,
        } => {
            pulse_db::health_check(&pool).await?;
            println!("database ok");
        }
        Commands::Db {
            command: DbCommands::Migrate,
        } => {
            let applied = pulse_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
        Commands::Ingest {
            command: IngestCommands::Run,
        } => ingest::run_once(&config, pool).await?,
        Commands::Alerts {
            command: AlertCommands::List { unread, limit },
        } => query::list_alerts(&pool, unread, limit).await?,
        Commands::Runs {
            command: RunCommands::List { limit },
        } => query::list_runs(&pool, limit).await?,
    }

    Ok(())
}
