//! SQLite-backed store.
//!
//! Split into focused submodules:
//! - `profiles` — contact profiles and feature toggles
//! - `flags` — persisted runtime flags (pause, auto-correct, context, master switch)
//! - `log` — rolling conversation log and recent-history queries

mod flags;
mod log;
mod profiles;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use sosie_core::config::{shellexpand, MemoryConfig};
use sosie_core::error::SosieError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::info;

/// A configured contact, consumed read-only by the message pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ContactProfile {
    pub id: i64,
    pub name: String,
    pub phone_number: String,
    pub relationship: String,
    pub enabled: bool,
    pub auto_reply: bool,
    pub auto_correct: bool,
    pub use_emojis: bool,
    pub message_length: String,
    pub intimacy: i64,
    pub custom_prompt: Option<String>,
}

/// Profile resolution result — forces call sites to handle the no-profile
/// branch explicitly instead of testing for null.
#[derive(Debug, Clone)]
pub enum ProfileLookup {
    Found(ContactProfile),
    NoProfile,
}

/// Fields for contact creation.
#[derive(Debug, Clone, Deserialize)]
pub struct NewContact {
    pub name: String,
    pub phone_number: String,
    #[serde(default = "default_relationship")]
    pub relationship: String,
}

fn default_relationship() -> String {
    "friend".to_string()
}

/// Partial contact update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactPatch {
    pub name: Option<String>,
    pub phone_number: Option<String>,
    pub relationship: Option<String>,
    pub enabled: Option<bool>,
    pub auto_reply: Option<bool>,
    pub auto_correct: Option<bool>,
    pub custom_prompt: Option<String>,
}

/// Persistent store backed by SQLite.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
    log_cap_per_chat: usize,
}

impl Store {
    /// Create a new store, initializing the schema on first use.
    pub async fn new(config: &MemoryConfig) -> Result<Self, SosieError> {
        let db_path = shellexpand(&config.db_path);

        if let Some(parent) = std::path::Path::new(&db_path).parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SosieError::Memory(format!("failed to create data dir: {e}")))?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{db_path}"))
            .map_err(|e| SosieError::Memory(format!("invalid db path: {e}")))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(opts)
            .await
            .map_err(|e| SosieError::Memory(format!("failed to connect to sqlite: {e}")))?;

        Self::init_schema(&pool).await?;

        info!("store initialized at {db_path}");

        Ok(Self {
            pool,
            log_cap_per_chat: config.log_cap_per_chat,
        })
    }

    async fn init_schema(pool: &SqlitePool) -> Result<(), SosieError> {
        sqlx::raw_sql(
            "CREATE TABLE IF NOT EXISTS contacts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                phone_number TEXT NOT NULL,
                relationship TEXT NOT NULL DEFAULT 'friend',
                enabled INTEGER NOT NULL DEFAULT 0,
                auto_reply INTEGER NOT NULL DEFAULT 1,
                auto_correct INTEGER NOT NULL DEFAULT 0,
                use_emojis INTEGER NOT NULL DEFAULT 0,
                message_length TEXT NOT NULL DEFAULT 'short',
                intimacy INTEGER NOT NULL DEFAULT 3,
                custom_prompt TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS runtime_flags (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                paused INTEGER NOT NULL DEFAULT 0,
                autocorrect_enabled INTEGER NOT NULL DEFAULT 1,
                master_switch INTEGER NOT NULL DEFAULT 1,
                temporary_context TEXT,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS exchanges (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                chat_id TEXT NOT NULL,
                from_me INTEGER NOT NULL,
                body TEXT NOT NULL,
                sentiment TEXT,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_exchanges_chat
                ON exchanges (chat_id, created_at);",
        )
        .execute(pool)
        .await
        .map_err(|e| SosieError::Memory(format!("schema init failed: {e}")))?;

        Ok(())
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
