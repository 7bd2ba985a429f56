//! crossndk - command line entry point

use std::path::PathBuf;
use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info, Level};
use tracing_subscriber::{filter::LevelFilter, EnvFilter, FmtSubscriber};

use crossndk::commands::{BuildCommand, PlanCommand, TargetsCommand};

/// Application name
pub const APP_NAME: &str = "crossndk";

#[derive(Debug, Parser)]
#[command(name = "crossndk", version, about = "Cross-compile Cargo libraries for Android and desktop targets")]
struct Cli {
    /// Host project directory
    #[arg(long, short, global = true, default_value = ".", env = "CROSSNDK_PROJECT")]
    project: PathBuf,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the platforms that can be targeted
    Targets,
    /// Show the build plan without running it
    Plan {
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },
    /// Build all configured targets
    Build {
        /// Maximum number of concurrent steps
        #[arg(long, short)]
        jobs: Option<usize>,
        /// Record commands instead of running them
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env().add_directive(LevelFilter::from_level(level).into()))
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("{} v{}", APP_NAME, crossndk::core::VERSION);

    let result = match cli.command {
        Command::Targets => TargetsCommand.execute(),
        Command::Plan { json } => {
            PlanCommand {
                project_path: cli.project,
                json,
            }
            .execute()
            .await
        }
        Command::Build { jobs, dry_run } => BuildCommand {
            project_path: cli.project,
            jobs,
            dry_run,
        }
        .execute()
        .await
        .map(|report| info!("Built {} step(s)", report.outcomes.len())),
    };

    if let Err(ref e) = result {
        error!("{:#}", e);
    }
    result
}
