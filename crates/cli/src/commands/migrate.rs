use std::path::Path;

use anyhow::Context;
use chrono::Utc;
use lockstep_core::{create_revision, Direction, LockstepConfig, LockstepError, TargetSpec};
use lockstep_migrate::{LedgerConfig, MigrationEngine, PostgresBackend, SqlBackend};

/// Create an empty up/down pair for each `[directory/]description` argument.
///
/// A missing directory is reported and that argument skipped.
pub fn create(specs: &[String]) -> anyhow::Result<()> {
    for spec in specs {
        match create_revision(spec, Utc::now()) {
            Ok(files) => {
                println!("Created {}.", files.up.display());
                println!("Created {}.", files.down.display());
            }
            Err(LockstepError::MissingDirectory(directory)) => {
                println!(
                    "The directory {} does not exist. Skipping {}.",
                    directory.display(),
                    spec
                );
            }
            Err(e) => return Err(e).with_context(|| format!("Failed to create revision {}", spec)),
        }
    }
    Ok(())
}

/// Apply (up) or reverse (down) scripts resolved from `path`.
pub async fn run(config: &LockstepConfig, direction: Direction, path: &Path, json: bool) -> anyhow::Result<()> {
    // Validate the path before opening a connection.
    let target = TargetSpec::parse(path)?;
    let mut engine = connect(config).await?;

    let result = engine
        .run_with(direction, &target, |event| {
            if !json {
                println!("{}", event);
            }
        })
        .await;
    close(engine).await;
    let report = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if report.is_noop() {
        println!("Nothing to do.");
    }
    Ok(())
}

/// Print lines describing where the ledger and the up scripts disagree.
pub async fn diff(config: &LockstepConfig, path: &Path, json: bool) -> anyhow::Result<()> {
    let target = TargetSpec::parse(path)?;
    if target.boundary().is_some() {
        tracing::debug!("diff ignores the target version in {}", path.display());
    }
    let mut engine = connect(config).await?;

    let result = engine.diff(target.directory()).await;
    close(engine).await;
    let report = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for line in &report.lines {
            println!("{}", line);
        }
    }
    Ok(())
}

async fn connect(config: &LockstepConfig) -> anyhow::Result<MigrationEngine<PostgresBackend>> {
    let url = config.require_database_url()?;
    let backend = PostgresBackend::connect(url)
        .await
        .context("Could not open the database connection")?;
    Ok(MigrationEngine::new(backend, LedgerConfig::from(config)))
}

/// Release the connection; a failure here doesn't change the outcome.
async fn close<B: SqlBackend>(engine: MigrationEngine<B>) {
    if let Err(e) = engine.close().await {
        tracing::warn!("Failed to close connection: {}", e);
    }
}
