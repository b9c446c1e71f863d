//! `taskdash`: command-line client for the task management dashboard.
//!
//! Loads tasks and users from the API into a [`TaskStore`], runs one
//! command against it, and prints the result. Configuration via CLI flags,
//! environment variables, or config file (`~/.config/taskdash/config.toml`).
//!
//! ```bash
//! # List tasks (saved filters apply)
//! cargo run --bin taskdash -- list
//!
//! # Only completed tasks of users 1 and 3
//! cargo run --bin taskdash -- list --status completed --user 1 --user 3
//!
//! # Point at another server
//! TASKDASH_API_URL=http://127.0.0.1:4000 cargo run --bin taskdash -- stats
//! ```

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;

use taskdash::api::http::HttpTaskApi;
use taskdash::config::{CliArgs, ClientConfig, Command};
use taskdash::snapshot::{DisabledSnapshot, FileStorage, LocalSnapshot, Snapshot};
use taskdash::tasks::{StoreError, TaskStore};
use taskdash_proto::{NewTask, Task, TaskFilters, TaskId, TaskPatch, UserId};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CliArgs::parse();

    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Logs go to a file so stdout only carries command output.
    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());
    tracing::info!(base_url = %config.base_url, "taskdash starting");

    let api = match HttpTaskApi::new(&config.base_url, config.request_timeout) {
        Ok(api) => api,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let command = cli.command.unwrap_or_default();
    if config.snapshot_enabled {
        let snapshot = LocalSnapshot::new(FileStorage::new(&config.snapshot_dir));
        run(TaskStore::with_api(api, snapshot), command).await
    } else {
        run(TaskStore::with_api(api, DisabledSnapshot), command).await
    }
}

/// Initialize file-based logging.
///
/// Returns a [`WorkerGuard`] that must be held until shutdown to ensure all
/// buffered log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("taskdash.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

/// Initializes the store and executes `command`.
async fn run<S: Snapshot + 'static>(store: TaskStore<HttpTaskApi, S>, command: Command) -> ExitCode {
    store.initialize().await;
    if let Some(error) = store.error() {
        eprintln!("error: {error}");
        return ExitCode::FAILURE;
    }

    match execute(&store, command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn execute<S: Snapshot + 'static>(
    store: &TaskStore<HttpTaskApi, S>,
    command: Command,
) -> Result<(), StoreError> {
    match command {
        Command::List {
            status,
            search,
            users,
        } => {
            if status.is_some() || search.is_some() || !users.is_empty() {
                store.set_filters(TaskFilters {
                    user_ids: (!users.is_empty())
                        .then(|| users.into_iter().map(UserId::new).collect()),
                    status,
                    search,
                });
            }
            let view = store.filtered_tasks();
            for task in &view {
                print_task(store, task);
            }
            println!("{} of {} tasks", view.len(), store.tasks().len());
        }
        Command::Show { id } => {
            let id = TaskId::new(id);
            let task = store.get_task(id).ok_or(StoreError::TaskNotFound(id))?;
            print_task(store, &task);
        }
        Command::Add {
            title,
            user,
            completed,
        } => {
            let task = store
                .create_task(&NewTask {
                    completed,
                    ..NewTask::new(title, user)
                })
                .await?;
            print!("created ");
            print_task(store, &task);
        }
        Command::Done { id } => {
            let task = store
                .update_task(TaskId::new(id), &TaskPatch::completed(true))
                .await?;
            print_task(store, &task);
        }
        Command::Undo { id } => {
            let task = store
                .update_task(TaskId::new(id), &TaskPatch::completed(false))
                .await?;
            print_task(store, &task);
        }
        Command::Rename { id, title } => {
            let task = store
                .update_task(TaskId::new(id), &TaskPatch::title(title))
                .await?;
            print_task(store, &task);
        }
        Command::Delete { id } => {
            store.delete_task(TaskId::new(id)).await?;
            println!("deleted #{id}");
        }
        Command::Stats => println!("{}", store.stats()),
        Command::Users => {
            for user in store.users() {
                println!("{:>4}  {} <{}>", user.id.get(), user.name, user.email);
            }
        }
        Command::Filters { clear } => {
            if clear {
                store.set_filters(TaskFilters::default());
            }
            print_filters(&store.filters());
        }
    }
    Ok(())
}

fn print_task<S: Snapshot + 'static>(store: &TaskStore<HttpTaskApi, S>, task: &Task) {
    let mark = if task.completed { 'x' } else { ' ' };
    let owner = store
        .user(task.user_id)
        .map_or_else(|| format!("user {}", task.user_id), |u| u.name);
    println!("[{mark}] #{:<4} {}  ({owner})", task.id.get(), task.title);
}

fn print_filters(filters: &TaskFilters) {
    if filters.is_unconstrained() {
        println!("no filters");
        return;
    }
    if let Some(status) = filters.status {
        println!("status: {status}");
    }
    if let Some(search) = filters.search.as_deref().filter(|s| !s.is_empty()) {
        println!("search: {search}");
    }
    if let Some(ids) = filters.user_ids.as_ref().filter(|ids| !ids.is_empty()) {
        let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();
        println!("users:  {}", ids.join(", "));
    }
}
