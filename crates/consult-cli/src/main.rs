//! Teleconsult command-line client: login, admission check, and window
//! preview against the consultation backend.

mod app;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use consult_config_and_utils::{init_logging_for_service, Config, Paths};

/// Teleconsult command-line interface.
#[derive(Parser)]
#[command(name = "consult")]
#[command(about = "Teleconsult admission and consultation window client")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, env = "TELECONSULT_LOG_LEVEL")]
    log_level: Option<String>,

    /// Base directory for config, storage and logs. Defaults to ~/.teleconsult
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Exchange a one-time authentication code for a session
    Login {
        /// Code received by email or SMS
        #[arg(long)]
        code: String,
    },
    /// Show the stored session
    Status,
    /// Run the admission check
    Admission {
        /// On admission, describe the consultation window that would open
        #[arg(long)]
        open: bool,
    },
    /// Clear the stored session
    Logout,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    paths.ensure_dirs()?;
    let config = Config::load(&paths)?;

    let level = cli.log_level.unwrap_or_else(|| config.log_level.clone());
    init_logging_for_service("consult", &level, Some(paths.log_file()));

    let app = app::App::new(config, &paths)?;
    match cli.command {
        Commands::Login { code } => app.login(&code).await?,
        Commands::Status => app.status()?,
        Commands::Admission { open } => app.admission(open).await?,
        Commands::Logout => app.logout()?,
    }

    Ok(())
}
