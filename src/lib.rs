pub mod commands;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::commands::{AppState, StatsAuthorizer};
use crate::db::DbPool;
use crate::error::AppResult;

const DATABASE_FILE: &str = "statline.sqlite";
const LOG_DIR: &str = "logs";

/// Prepares `data_dir`, starts logging and opens the database, with owners
/// and admins allowed to manage stats.
pub fn bootstrap(data_dir: &Path) -> AppResult<AppState> {
    let pool = open_pool(data_dir)?;
    Ok(AppState::new(pool))
}

/// Like [`bootstrap`], with an external authorization decision.
pub fn bootstrap_with_authorizer(
    data_dir: &Path,
    authorizer: Arc<dyn StatsAuthorizer>,
) -> AppResult<AppState> {
    let pool = open_pool(data_dir)?;
    Ok(AppState::with_authorizer(pool, authorizer))
}

fn open_pool(data_dir: &Path) -> AppResult<DbPool> {
    std::fs::create_dir_all(data_dir)?;
    crate::utils::logger::init_logging(&data_dir.join(LOG_DIR))?;

    let pool = DbPool::new(data_dir.join(DATABASE_FILE))?;
    info!(target: "app::db", data_dir = %data_dir.display(), "statline ready");
    Ok(pool)
}
