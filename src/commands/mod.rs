pub mod entries;
pub mod quotas;
pub mod reports;
pub mod settings;
pub mod stats;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, error, warn};

use crate::db::DbPool;
use crate::error::AppError;
use crate::services::entry_service::EntryService;
use crate::services::quota_service::QuotaService;
use crate::services::report_service::ReportService;
use crate::services::settings_service::SettingsService;
use crate::services::stat_service::StatService;

/// The user on whose behalf a command runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub user_id: String,
    #[serde(default)]
    pub is_admin: bool,
}

impl Actor {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            is_admin: false,
        }
    }

    pub fn admin(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            is_admin: true,
        }
    }
}

/// Decides whether `actor` may change stats owned by `owner_id`. The
/// answer is trusted as-is; no identity checks happen past this point.
pub trait StatsAuthorizer: Send + Sync {
    fn can_manage_stats_for(&self, actor: &Actor, owner_id: &str, is_admin: bool) -> bool;
}

/// Owners manage their own stats; admins manage everyone's.
#[derive(Debug, Default, Clone, Copy)]
pub struct OwnerOrAdminAuthorizer;

impl StatsAuthorizer for OwnerOrAdminAuthorizer {
    fn can_manage_stats_for(&self, actor: &Actor, owner_id: &str, is_admin: bool) -> bool {
        is_admin || actor.user_id == owner_id
    }
}

#[derive(Clone)]
pub struct AppState {
    db_pool: DbPool,
    settings_service: Arc<SettingsService>,
    entry_service: Arc<EntryService>,
    quota_service: Arc<QuotaService>,
    stat_service: Arc<StatService>,
    report_service: Arc<ReportService>,
    authorizer: Arc<dyn StatsAuthorizer>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("db_path", &self.db_pool.path())
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(db_pool: DbPool) -> Self {
        Self::with_authorizer(db_pool, Arc::new(OwnerOrAdminAuthorizer))
    }

    pub fn with_authorizer(db_pool: DbPool, authorizer: Arc<dyn StatsAuthorizer>) -> Self {
        let settings_service = Arc::new(SettingsService::new(db_pool.clone()));
        let entry_service = Arc::new(EntryService::new(
            db_pool.clone(),
            Arc::clone(&settings_service),
        ));
        let quota_service = Arc::new(QuotaService::new(
            db_pool.clone(),
            Arc::clone(&settings_service),
        ));
        let stat_service = Arc::new(StatService::new(
            db_pool.clone(),
            Arc::clone(&entry_service),
            Arc::clone(&settings_service),
        ));
        let report_service = Arc::new(ReportService::new(
            Arc::clone(&settings_service),
            Arc::clone(&stat_service),
            Arc::clone(&entry_service),
            Arc::clone(&quota_service),
        ));

        Self {
            db_pool,
            settings_service,
            entry_service,
            quota_service,
            stat_service,
            report_service,
            authorizer,
        }
    }

    pub fn settings(&self) -> Arc<SettingsService> {
        Arc::clone(&self.settings_service)
    }

    pub fn entries(&self) -> Arc<EntryService> {
        Arc::clone(&self.entry_service)
    }

    pub fn quotas(&self) -> Arc<QuotaService> {
        Arc::clone(&self.quota_service)
    }

    pub fn stats(&self) -> Arc<StatService> {
        Arc::clone(&self.stat_service)
    }

    pub fn reports(&self) -> Arc<ReportService> {
        Arc::clone(&self.report_service)
    }

    pub fn db(&self) -> DbPool {
        self.db_pool.clone()
    }

    /// Fails with `Unauthorized` unless `actor` may manage stats of `owner_id`.
    pub fn authorize(&self, actor: &Actor, owner_id: &str) -> Result<(), AppError> {
        if self
            .authorizer
            .can_manage_stats_for(actor, owner_id, actor.is_admin)
        {
            debug!(target: "app::command", actor = %actor.user_id, owner = owner_id, "authorized");
            Ok(())
        } else {
            Err(AppError::unauthorized(format!(
                "user {} may not manage stats owned by {owner_id}",
                actor.user_id
            )))
        }
    }

    pub fn authorize_for_stat(&self, actor: &Actor, stat_id: &str) -> Result<(), AppError> {
        let owner = self.stat_service.owner_of(stat_id)?;
        self.authorize(actor, &owner)
    }
}

pub type CommandResult<T> = Result<T, CommandError>;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<JsonValue>,
}

impl CommandError {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Option<JsonValue>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details,
        }
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for CommandError {}

impl From<AppError> for CommandError {
    fn from(error: AppError) -> Self {
        match error {
            AppError::Validation {
                message, details, ..
            } => CommandError::new("VALIDATION_ERROR", message, details),
            AppError::NotFound => {
                CommandError::new("NOT_FOUND", "the requested record does not exist", None)
            }
            AppError::Conflict { message } => CommandError::new("CONFLICT", message, None),
            AppError::Unauthorized { message } => {
                warn!(target: "app::command", %message, "command rejected");
                CommandError::new("UNAUTHORIZED", message, None)
            }
            AppError::Database { message } => {
                error!(target: "app::command", %message, "database error in command");
                CommandError::new("UNKNOWN", "database operation failed", None)
            }
            AppError::Serialization(error) => {
                error!(target: "app::command", error = %error, "serialization error in command");
                CommandError::new("UNKNOWN", "serialization failed", None)
            }
            AppError::Io(error) => {
                error!(target: "app::command", error = %error, "io error in command");
                CommandError::new("UNKNOWN", "file system access failed", None)
            }
            AppError::Other(message) => {
                error!(target: "app::command", %message, "unexpected error in command");
                CommandError::new("UNKNOWN", message, None)
            }
        }
    }
}

/// Runs synchronous service work off the async executor.
pub(crate) async fn run_blocking<T: Send + 'static>(
    task: impl FnOnce() -> Result<T, AppError> + Send + 'static,
) -> CommandResult<T> {
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|err| CommandError::new("UNKNOWN", format!("command task failed: {err}"), None))?
        .map_err(CommandError::from)
}
