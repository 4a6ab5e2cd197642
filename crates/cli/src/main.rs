mod commands;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use commands::migrate;
use lockstep_core::{Direction, LockstepConfig};
use lockstep_migrate::MigrateError;

/// Exit code when a run failed after changing the database
const EXIT_PARTIAL: u8 = 2;

#[derive(Parser)]
#[command(name = lockstep_core::TOOL_NAME)]
#[command(version)]
#[command(about = "Apply and reverse versioned PostgreSQL scripts")]
struct Cli {
    /// Database URL (defaults to LOCKSTEP_DATABASE_URL or DATABASE_URL)
    #[arg(long, short = 'd', global = true)]
    database_url: Option<String>,

    /// Ledger table name
    #[arg(long, global = true)]
    table: Option<String>,

    /// Schema holding the ledger table
    #[arg(long, global = true)]
    schema: Option<String>,

    /// Print reports as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending up scripts, optionally up to and including a version
    Up {
        /// Script directory, or <directory>/<version> to stop at that version
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Reverse applied revisions, optionally down to (not including) a version
    Down {
        /// Script directory, or <directory>/<version> to stop above that version
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Show ledger entries without scripts (!) and scripts not yet applied (+)
    Diff {
        /// Script directory
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Create empty up/down scripts stamped with the current time
    New {
        /// One or more [directory/]description arguments
        #[arg(required = true)]
        names: Vec<String>,
    },
}

impl Cli {
    /// Environment configuration with command-line overrides applied
    fn config(&self) -> anyhow::Result<LockstepConfig> {
        let mut config = LockstepConfig::from_env()?;
        if let Some(url) = &self.database_url {
            config = config.with_database_url(url);
        }
        if let Some(table) = &self.table {
            config = config.with_table(table);
        }
        if let Some(schema) = &self.schema {
            config = config.with_schema(schema);
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init_logging(&config) {
        eprintln!("Error: failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    match execute(&cli, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            match e.downcast_ref::<MigrateError>() {
                Some(err) if err.is_partial() => {
                    report_partial(err);
                    ExitCode::from(EXIT_PARTIAL)
                }
                _ => ExitCode::FAILURE,
            }
        }
    }
}

fn report_partial(err: &MigrateError) {
    eprintln!("The run stopped part way. These scripts were already executed:");
    for file_name in err.completed() {
        eprintln!("  {}", file_name);
    }
    if let MigrateError::LedgerWrite { file_name, .. } = err {
        eprintln!("  {} (not recorded in the ledger)", file_name);
    }
}

async fn execute(cli: &Cli, config: &LockstepConfig) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Up { path } => migrate::run(config, Direction::Up, path, cli.json).await,
        Commands::Down { path } => migrate::run(config, Direction::Down, path, cli.json).await,
        Commands::Diff { path } => migrate::diff(config, path, cli.json).await,
        Commands::New { names } => migrate::create(names),
    }
}
