use clap::{Parser, Subcommand};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use grower_stock_api::{db, migrator::Migrator};

/// Applies or rolls back the grower stock schema
#[derive(Debug, Parser)]
#[command(name = "migration", version)]
struct Cli {
    /// Database URL; falls back to DATABASE_URL
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://stock_updates.db?mode=rwc")]
    database_url: String,

    #[command(subcommand)]
    command: Option<MigrationCommand>,
}

#[derive(Debug, Subcommand)]
enum MigrationCommand {
    /// Apply pending migrations (default)
    Up,
    /// Roll back the last `steps` migrations
    Down {
        #[arg(long, default_value_t = 1)]
        steps: u32,
    },
    /// Drop every table and re-apply all migrations
    Fresh,
    /// Print applied and pending migrations
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let cli = Cli::parse();
    info!("Connecting to database");

    let db = db::establish_connection(&cli.database_url).await?;

    match cli.command.unwrap_or(MigrationCommand::Up) {
        MigrationCommand::Up => {
            Migrator::up(&db, None).await?;
            info!("Migrations applied");
        }
        MigrationCommand::Down { steps } => {
            Migrator::down(&db, Some(steps)).await?;
            info!(steps, "Migrations rolled back");
        }
        MigrationCommand::Fresh => {
            Migrator::fresh(&db).await?;
            info!("Schema recreated");
        }
        MigrationCommand::Status => {
            Migrator::status(&db).await?;
        }
    }

    Ok(())
}
