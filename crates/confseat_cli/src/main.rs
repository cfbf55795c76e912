//! CLI probe for the confseat core.
//!
//! # Responsibility
//! - Verify `confseat_core` linkage and configuration loading.
//! - Open the configured store, recompute the announcement and print it.
//!   The featured-speaker slot lives in the serving process's cache and is
//!   not reported here.

use confseat_core::db::open_db_with_options;
use confseat_core::{
    init_logging_from_config, CoreConfig, DerivedCacheEngine, InMemoryTaskQueue,
    MemoryCacheStore, TaskDescriptor, TaskQueue, TaskRunner,
};
use log::error;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("event=cli_run module=cli status=error error={message}");
            eprintln!("confseat: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), String> {
    println!("confseat_core ping={}", confseat_core::ping());
    println!("confseat_core version={}", confseat_core::core_version());

    let config = CoreConfig::from_env().map_err(|err| err.to_string())?;
    init_logging_from_config(&config).map_err(|err| err.to_string())?;

    let conn = open_db_with_options(&config.db_path, &config.db_options())
        .map_err(|err| err.to_string())?;
    let engine = DerivedCacheEngine::new(MemoryCacheStore::new());
    let queue = InMemoryTaskQueue::new();
    queue.enqueue(TaskDescriptor::RecomputeAnnouncement);

    let completed = TaskRunner::new(&conn, &engine)
        .with_retry_policy(config.retry_policy())
        .run_pending(&queue)
        .map_err(|err| err.to_string())?;

    println!("tasks_completed={completed}");
    println!("announcement={}", engine.announcement());
    Ok(())
}
