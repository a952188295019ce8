//! Entry points used by job runners.

use crate::domain::run::{ImportRun, ImportRunStatus};
use crate::domain::types::{ImportRunId, ImportTaskId};
use crate::models::config::ImportSettings;
use crate::repository::{ImportTaskReader, SourceReader};
use crate::services::errors::{ImportError, ImportResult};
use crate::services::fetcher::HttpClient;
use crate::services::orchestrator::{ImportOrchestrator, ImportRepository};
use crate::services::storage::BlobStorage;

/// Marks a run that cannot start as failed, then hands the error back.
fn reject<R: ImportRepository>(repo: &R, run: &ImportRun, err: ImportError) -> ImportError {
    log::error!("Import run {} cannot be executed: {err}", run.id);
    if run.status == ImportRunStatus::Pending {
        let message = err.to_string();
        let finished_at = chrono::Utc::now().naive_utc();
        if let Err(e) =
            repo.finish_import_run(run.id, ImportRunStatus::Failed, Some(&message), finished_at)
        {
            log::error!("Failed to mark import run {} as failed: {e}", run.id);
        }
    }
    err
}

/// Loads run `run_id` with its task and source and executes it.
pub fn execute_run<R, C, S>(
    repo: &R,
    client: &C,
    storage: &S,
    settings: ImportSettings,
    run_id: ImportRunId,
) -> ImportResult<ImportRun>
where
    R: ImportRepository + ImportTaskReader + SourceReader,
    C: HttpClient,
    S: BlobStorage,
{
    let run = repo
        .get_import_run_by_id(run_id)?
        .ok_or(ImportError::RunNotFound(run_id))?;

    let Some(task) = repo.get_import_task_by_id(run.import_task_id)? else {
        return Err(reject(repo, &run, ImportError::TaskNotFound(run.import_task_id)));
    };
    let Some(source) = repo.get_source_by_id(task.source_config_id)? else {
        return Err(reject(repo, &run, ImportError::SourceNotFound(task.source_config_id)));
    };

    ImportOrchestrator::new(repo, client, storage, settings).execute(&task, &source, &run)
}

/// Creates a new pending run of task `task_id` and executes it.
pub fn start_task_run<R, C, S>(
    repo: &R,
    client: &C,
    storage: &S,
    settings: ImportSettings,
    task_id: ImportTaskId,
) -> ImportResult<ImportRun>
where
    R: ImportRepository + ImportTaskReader + SourceReader,
    C: HttpClient,
    S: BlobStorage,
{
    if repo.get_import_task_by_id(task_id)?.is_none() {
        return Err(ImportError::TaskNotFound(task_id));
    }
    let run = repo.create_import_run(task_id)?;
    log::info!("Created import run {} for task {task_id}", run.id);
    execute_run(repo, client, storage, settings, run.id)
}
