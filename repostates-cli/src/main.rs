mod commands;
mod output;
mod report;

use std::path::PathBuf;

use clap::Parser;
use color_eyre::Result;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use commands::Command;
use repostates_service::FetchScope;

/// Report and update the state of every git repository in a directory
#[derive(Parser, Debug)]
#[command(name = "repostates", version, about, long_about = None)]
pub struct Cli {
    /// Directory with your git repositories, defaults to the current directory
    #[arg(short = 'd', long = "dir", value_name = "DIR", global = true)]
    pub dir: Option<PathBuf>,

    /// Regex for filtering repositories to show
    #[arg(short = 'r', long = "reg", value_name = "REGEX", global = true)]
    pub reg: Option<String>,

    /// Increase log verbosity (-v warn, -vv info, -vvv debug)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Maximum number of repositories processed at the same time
    #[arg(short = 'j', long = "jobs", value_name = "N", env = "REPOSTATES_JOBS", global = true)]
    pub jobs: Option<usize>,

    /// Deadline in seconds for a single git invocation
    #[arg(long, value_name = "SECONDS", global = true)]
    pub timeout: Option<u64>,

    /// Remote used for fetch and default branch lookups
    #[arg(long, value_name = "NAME", global = true)]
    pub remote: Option<String>,

    /// What to fetch before inspecting: prune, current or none
    #[arg(long, value_name = "SCOPE", global = true)]
    pub fetch: Option<FetchScope>,

    /// Print the results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to the user config directory)
    #[arg(long, value_name = "FILE", env = "REPOSTATES_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "error",
        1 => "warn",
        2 => "info",
        _ => "debug",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init()
        .ok();
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let clean = commands::run::execute(cli).await?;
    if !clean {
        std::process::exit(1);
    }

    Ok(())
}
