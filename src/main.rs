use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use minaret_gateway::api::ApiServer;
use minaret_gateway::db::{self, MasjidRepo, MasjidStatus, ReviewRepo};
use minaret_gateway::Config;

/// Minaret - WhatsApp review-ingestion gateway for a mosque directory
#[derive(Parser)]
#[command(name = "minaret", version, about)]
struct Cli {
    /// Port to listen on (overrides config)
    #[arg(long, env = "MINARET_PORT")]
    port: Option<u16>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Add a catalog entry
    AddMasjid {
        /// Canonical mosque name
        #[arg(long)]
        name: String,
        /// City / locality
        #[arg(long)]
        city: Option<String>,
        /// Street address
        #[arg(long)]
        address: Option<String>,
        /// Create the entry pre-approved (matchable immediately)
        #[arg(long)]
        approve: bool,
    },
    /// Approve a catalog entry so the matcher can see it
    ApproveMasjid {
        /// Catalog entry ID
        id: String,
    },
    /// List reviews awaiting moderation
    PendingReviews,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,minaret_gateway=info",
        1 => "info,minaret_gateway=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load()?;

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::AddMasjid {
                name,
                city,
                address,
                approve,
            } => add_masjid(&config, &name, city.as_deref(), address.as_deref(), approve),
            Command::ApproveMasjid { id } => approve_masjid(&config, &id),
            Command::PendingReviews => pending_reviews(&config),
        };
    }

    let port = cli.port.unwrap_or(config.server.port);
    tracing::info!(port, "starting minaret gateway");

    let pool = db::init(config.db_path())?;
    let server = ApiServer::new(&config, pool, port)?;

    server.run().await?;

    Ok(())
}

/// Add a catalog entry from the command line
fn add_masjid(
    config: &Config,
    name: &str,
    city: Option<&str>,
    address: Option<&str>,
    approve: bool,
) -> anyhow::Result<()> {
    let pool = db::init(config.db_path())?;
    let repo = MasjidRepo::new(pool);

    let status = if approve {
        MasjidStatus::Approved
    } else {
        MasjidStatus::Pending
    };

    let masjid = repo.insert(name, city, address, status)?;
    println!("Added {} ({}) as {}", masjid.name, masjid.id, status.as_str());

    Ok(())
}

/// Approve a catalog entry
fn approve_masjid(config: &Config, id: &str) -> anyhow::Result<()> {
    let pool = db::init(config.db_path())?;
    let repo = MasjidRepo::new(pool);

    repo.set_status(id, MasjidStatus::Approved)?;
    println!("Approved masjid {id}");

    Ok(())
}

/// List reviews awaiting moderation
fn pending_reviews(config: &Config) -> anyhow::Result<()> {
    let pool = db::init(config.db_path())?;
    let masjids = MasjidRepo::new(pool.clone());
    let reviews = ReviewRepo::new(pool);

    let pending = reviews.list_pending()?;
    if pending.is_empty() {
        println!("No pending reviews");
        return Ok(());
    }

    for review in pending {
        let masjid_name = masjids
            .find(&review.masjid_id)?
            .map_or_else(|| review.masjid_id.clone(), |m| m.name);

        let rating = review
            .rating
            .map_or_else(|| "-".to_string(), |r| r.to_string());

        println!(
            "[{}] {} | {} | rating {} | {}",
            review.created_at.format("%Y-%m-%d %H:%M"),
            masjid_name,
            review.reviewer_name,
            rating,
            review.text
        );
    }

    Ok(())
}
