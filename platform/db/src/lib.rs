//! Database primitives: connection settings, scoped user queries, the
//! impersonation audit log and configuration entries.

mod configurations;
mod impersonations;
mod users;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, SqlErr};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

pub use configurations::{
    ConfigurationChanges, NewConfiguration, delete_configuration, find_configuration,
    insert_configuration, list_configurations, toggle_configuration, update_configuration,
};
pub use impersonations::{
    find_impersonation, list_impersonations, record_impersonation_start,
    record_impersonation_stop,
};
pub use users::{
    NewUser, ScopeExt, UserChanges, delete_user, find_user, find_user_by_email, insert_user,
    list_users, set_system_admin, update_user, user_count, user_record,
};

/// Shared connection pool.
pub type DbPool = DatabaseConnection;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database url missing")]
    MissingUrl,
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },
    #[error("{0} already exists")]
    Conflict(&'static str),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl DbError {
    /// Turn unique-key violations into [`DbError::Conflict`].
    pub(crate) fn on_write(err: DbErr, what: &'static str) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => DbError::Conflict(what),
            _ => DbError::Database(err),
        }
    }
}

pub type DbResult<T> = Result<T, DbError>;

const DEFAULT_PAGE: u64 = 50;
const MAX_PAGE: u64 = 200;

/// Limit/offset window for list queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    pub limit: u64,
    pub offset: u64,
}

impl Page {
    pub fn new(first: Option<i32>, offset: Option<i32>) -> Self {
        let limit = first
            .map(|n| n.clamp(1, MAX_PAGE as i32) as u64)
            .unwrap_or(DEFAULT_PAGE);
        let offset = offset.unwrap_or(0).max(0) as u64;
        Self { limit, offset }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Environment-driven connection settings.
#[derive(Clone, Debug, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_url_key")]
    env_key: String,
    #[serde(default)]
    max_connections: Option<u32>,
}

fn default_url_key() -> String {
    "DATABASE_URL".to_string()
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            env_key: default_url_key(),
            max_connections: None,
        }
    }
}

impl DatabaseSettings {
    pub fn new(env_key: impl Into<String>) -> Self {
        Self {
            env_key: env_key.into(),
            max_connections: None,
        }
    }

    pub fn from_env() -> Self {
        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|raw| raw.trim().parse().ok());
        Self {
            max_connections,
            ..Self::default()
        }
    }

    pub fn database_url(&self) -> DbResult<String> {
        std::env::var(&self.env_key).map_err(|_| DbError::MissingUrl)
    }
}

pub async fn connect(settings: &DatabaseSettings) -> DbResult<DbPool> {
    connect_url(&settings.database_url()?, settings.max_connections).await
}

pub async fn connect_url(url: &str, max_connections: Option<u32>) -> DbResult<DbPool> {
    let mut options = ConnectOptions::new(url.to_owned());
    options.sqlx_logging(false);
    if let Some(max) = max_connections {
        options.max_connections(max);
    }
    let pool = Database::connect(options).await?;
    info!(backend = ?pool.get_database_backend(), "database connected");
    Ok(pool)
}
