use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use manifestation::{api, config::Config, db};

#[derive(Parser)]
#[command(name = "mnfst")]
#[command(about = "Manifestation journal server")]
struct Cli {
    /// SQLite database path (overrides MANIFESTATION_DB)
    #[arg(long, global = true, env = "MANIFESTATION_DB")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Port for HTTP API (overrides MANIFESTATION_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Apply pending database migrations and exit
    Migrate,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG")
            .unwrap_or_else(|_| "manifestation=debug,tower_http=debug".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn open_database(config: &Config) -> anyhow::Result<db::Database> {
    let db = db::Database::open(config.database_path.clone())?;
    db.migrate()?;
    Ok(db)
}

async fn serve(config: Config) -> anyhow::Result<()> {
    tracing::info!("Using database at {}", config.database_path.display());
    let db = open_database(&config)?;

    let state = api::AppState::new(db)?;
    let app = api::create_router_with_config(state, config.security.clone());

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", config.port)).await?;
    tracing::info!(
        "Manifestation server listening on http://127.0.0.1:{}",
        config.port
    );

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let mut config = Config::from_env_with_db(cli.db)?;

    match cli.command {
        Some(Commands::Serve { port }) => {
            if let Some(port) = port {
                config.port = port;
            }
            serve(config).await?;
        }
        Some(Commands::Migrate) => {
            open_database(&config)?;
            println!("Database ready at {}", config.database_path.display());
        }
        None => serve(config).await?,
    }

    Ok(())
}
