//! Migration Engine - reconciles resolved scripts against the ledger
//!
//! `run` applies (up) or reverses (down) whatever the ledger says is pending,
//! one script at a time, and `diff` reports where files and ledger disagree
//! without changing anything.
//!
//! Scripts are not wrapped in a shared transaction. If a script fails, the
//! ones before it stay applied and the error lists them. If a script runs but
//! its ledger row can't be written, the error says so separately.

use std::collections::BTreeSet;
use std::path::Path;

use lockstep_core::{Direction, Script, ScriptResolver, TargetSpec, Version};

use super::definitions::{DiffReport, LedgerConfig, LedgerWarning, RunEvent, RunReport, WarningKind};
use super::ledger::Ledger;
use crate::backends::SqlBackend;
use crate::error::{MigrateError, MigrateResult};

/// What to do with one resolved script given the ledger state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Execute,
    Warn(WarningKind),
    Skip,
}

/// Decide the step for a script. Scripts already in their target state are
/// skipped silently until the run has executed something; after that they
/// are reported, since they indicate the ledger and files have drifted.
fn plan_step(direction: Direction, applied: bool, run_occurred: bool) -> Step {
    match (direction, applied) {
        (Direction::Up, false) | (Direction::Down, true) => Step::Execute,
        _ if !run_occurred => Step::Skip,
        (Direction::Up, true) => Step::Warn(WarningKind::AlreadyApplied),
        (Direction::Down, false) => Step::Warn(WarningKind::NeverApplied),
    }
}

/// Runs and diffs migrations over one backend connection
pub struct MigrationEngine<B> {
    ledger: Ledger<B>,
}

impl<B: SqlBackend> MigrationEngine<B> {
    pub fn new(backend: B, config: LedgerConfig) -> Self {
        Self {
            ledger: Ledger::new(backend, config),
        }
    }

    pub fn ledger(&self) -> &Ledger<B> {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut Ledger<B> {
        &mut self.ledger
    }

    pub fn into_backend(self) -> B {
        self.ledger.into_backend()
    }

    /// Release the backend connection
    pub async fn close(self) -> MigrateResult<()> {
        self.ledger.into_backend().close().await
    }

    /// Run all runnable scripts for `direction`. See [`MigrationEngine::run_with`].
    pub async fn run(&mut self, direction: Direction, target: &TargetSpec) -> MigrateResult<RunReport> {
        self.run_with(direction, target, |_| {}).await
    }

    /// Run all runnable scripts for `direction`, calling `on_event` as each
    /// script starts, completes or is skipped with a warning.
    ///
    /// Resolution happens before the database is touched, so invalid targets
    /// and duplicate versions fail without side effects.
    pub async fn run_with<F>(
        &mut self,
        direction: Direction,
        target: &TargetSpec,
        mut on_event: F,
    ) -> MigrateResult<RunReport>
    where
        F: FnMut(&RunEvent),
    {
        let start_time = std::time::Instant::now();
        let scripts = ScriptResolver::new(direction).resolve_target(target)?;

        self.ledger.ensure_initialized().await?;
        let applied = self.ledger.applied_versions().await?;

        let mut report = RunReport::new(direction);
        let mut completed: Vec<String> = Vec::new();
        let mut run_occurred = false;

        for script in &scripts {
            let is_applied = applied.contains(&script.version);
            match plan_step(direction, is_applied, run_occurred) {
                Step::Skip => {
                    tracing::debug!("{} already {}, skipped", script.file_name, state_name(direction));
                }
                Step::Warn(kind) => {
                    let warning = LedgerWarning {
                        kind,
                        version: script.version.clone(),
                        file_name: script.file_name.clone(),
                    };
                    tracing::warn!("{}", warning);
                    emit(&mut report, &mut on_event, RunEvent::Warning(warning.clone()));
                    report.warnings.push(warning);
                }
                Step::Execute => {
                    if let Err(failure) = self.execute_script(script, &mut report, &mut on_event).await {
                        tracing::error!("{} failed after {} script(s): {}", script.file_name, completed.len(), failure);
                        return Err(failure.into_error(script, completed));
                    }
                    completed.push(script.file_name.clone());
                    report.changed.push(script.version.clone());
                    run_occurred = true;
                }
            }
        }

        report.execution_time_ms = start_time.elapsed().as_millis();
        tracing::info!(
            "{} run finished: {} script(s) executed, {} warning(s)",
            direction,
            report.changed.len(),
            report.warnings.len()
        );
        Ok(report)
    }

    /// Execute one script and update the ledger to match
    async fn execute_script<F>(
        &mut self,
        script: &Script,
        report: &mut RunReport,
        on_event: &mut F,
    ) -> Result<(), StepFailure>
    where
        F: FnMut(&RunEvent),
    {
        let sql = script.read().map_err(|e| StepFailure::Script(e.into()))?;
        tracing::info!("Running {}", script.file_name);
        emit(
            report,
            &mut *on_event,
            RunEvent::Running {
                file_name: script.file_name.clone(),
                sql: sql.clone(),
            },
        );

        self.ledger
            .backend_mut()
            .execute(&sql)
            .await
            .map_err(StepFailure::Script)?;

        match script.direction {
            Direction::Up => self
                .ledger
                .record_applied(&script.version)
                .await
                .map_err(StepFailure::Ledger)?,
            Direction::Down => {
                let removed = self
                    .ledger
                    .record_reversed(&script.version)
                    .await
                    .map_err(StepFailure::Ledger)?;
                if !removed {
                    tracing::warn!(
                        "Ledger had no row for {} while reversing {}",
                        script.version,
                        script.file_name
                    );
                }
            }
        }

        tracing::info!("Completed {}", script.file_name);
        emit(
            report,
            &mut *on_event,
            RunEvent::Completed {
                file_name: script.file_name.clone(),
                version: script.version.clone(),
            },
        );
        Ok(())
    }

    /// Compare up scripts in `directory` with the ledger.
    ///
    /// Creates the ledger table if missing but never adds or removes rows.
    pub async fn diff(&mut self, directory: &Path) -> MigrateResult<DiffReport> {
        let target = TargetSpec::Unbounded {
            directory: directory.to_path_buf(),
        };
        let scripts = ScriptResolver::new(Direction::Up).resolve_target(&target)?;

        self.ledger.ensure_initialized().await?;
        let applied = self.ledger.applied_versions().await?;

        Ok(compute_diff(&applied, &scripts))
    }
}

/// Orphans are applied versions without an up script; pending are up scripts
/// without a ledger row.
pub fn compute_diff(applied: &BTreeSet<Version>, scripts: &[Script]) -> DiffReport {
    let on_disk: BTreeSet<&Version> = scripts.iter().map(|script| &script.version).collect();

    let orphans = applied
        .iter()
        .filter(|version| !on_disk.contains(version))
        .cloned()
        .collect();

    let pending = scripts
        .iter()
        .filter(|script| !applied.contains(&script.version))
        .map(|script| script.file_name.clone())
        .collect();

    DiffReport::new(orphans, pending)
}

/// Why a single script step stopped, and whether its SQL had already run
#[derive(Debug)]
enum StepFailure {
    Script(MigrateError),
    Ledger(MigrateError),
}

impl StepFailure {
    fn into_error(self, script: &Script, completed: Vec<String>) -> MigrateError {
        match self {
            StepFailure::Script(e) => MigrateError::ScriptExecution {
                file_name: script.file_name.clone(),
                message: e.to_string(),
                completed,
            },
            StepFailure::Ledger(e) => MigrateError::LedgerWrite {
                file_name: script.file_name.clone(),
                message: e.to_string(),
                completed,
            },
        }
    }
}

impl std::fmt::Display for StepFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepFailure::Script(e) => write!(f, "{}", e),
            StepFailure::Ledger(e) => write!(f, "ledger update failed: {}", e),
        }
    }
}

fn emit<F>(report: &mut RunReport, on_event: &mut F, event: RunEvent)
where
    F: FnMut(&RunEvent),
{
    on_event(&event);
    report.events.push(event);
}

fn state_name(direction: Direction) -> &'static str {
    match direction {
        Direction::Up => "applied",
        Direction::Down => "reversed",
    }
}
