use std::process::ExitCode;

use catalog::Category;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replace categories with their static feeds (all when none are given)
    Seed {
        categories: Vec<Category>,

        /// Fetch and normalize without writing
        #[arg(long)]
        dry_run: bool,
    },
    /// Set or clear the admin custom claim on a Firebase user
    GrantAdmin {
        uid: String,

        #[arg(long)]
        revoke: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let args = Args::parse();

    match args.command {
        Command::Seed {
            categories,
            dry_run,
        } => {
            let failures = process::seed(categories, dry_run).await?;
            if failures > 0 {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::GrantAdmin { uid, revoke } => process::grant_admin(&uid, revoke).await?,
    }

    Ok(ExitCode::SUCCESS)
}
