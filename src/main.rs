use std::process::ExitCode;

use pushkind_common::db::establish_connection_pool;
use pushkind_importer::domain::types::{ImportRunId, ImportTaskId};
use pushkind_importer::models::config::ImporterConfig;
use pushkind_importer::repository::DieselRepository;
use pushkind_importer::services::fetcher::ReqwestHttpClient;
use pushkind_importer::services::storage::FsStorage;
use pushkind_importer::services::{execute_run, start_task_run};

const USAGE: &str = "usage: pushkind-importer <execute RUN_ID | run-task TASK_ID>";

enum Command {
    Execute(ImportRunId),
    RunTask(ImportTaskId),
}

fn parse_args() -> Result<Command, String> {
    let mut args = std::env::args().skip(1);
    let (Some(command), Some(id), None) = (args.next(), args.next(), args.next()) else {
        return Err(USAGE.to_string());
    };
    let id: i32 = id.parse().map_err(|_| format!("invalid id `{id}`\n{USAGE}"))?;
    match command.as_str() {
        "execute" => ImportRunId::new(id).map(Command::Execute),
        "run-task" => ImportTaskId::new(id).map(Command::RunTask),
        _ => return Err(USAGE.to_string()),
    }
    .map_err(|e| e.to_string())
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let command = match parse_args() {
        Ok(command) => command,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::from(2);
        }
    };

    let config = match ImporterConfig::load() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let pool = match establish_connection_pool(&config.database_url) {
        Ok(pool) => pool,
        Err(e) => {
            log::error!("Failed to establish database connection: {e}");
            return ExitCode::FAILURE;
        }
    };
    let repo = DieselRepository::new(pool);

    let client = match ReqwestHttpClient::new() {
        Ok(client) => client,
        Err(e) => {
            log::error!("Failed to build HTTP client: {e}");
            return ExitCode::FAILURE;
        }
    };
    let storage = FsStorage::new(&config.storage_root);
    let settings = config.settings();

    let result = match command {
        Command::Execute(run_id) => execute_run(&repo, &client, &storage, settings, run_id),
        Command::RunTask(task_id) => start_task_run(&repo, &client, &storage, settings, task_id),
    };

    match result {
        Ok(run) => {
            log::info!("Import run {} finished as {}", run.id, run.status);
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("Import failed: {e}");
            ExitCode::FAILURE
        }
    }
}
