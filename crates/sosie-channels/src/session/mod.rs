//! SQLx-based session storage backend for `whatsapp-rust`.
//!
//! Implements the library's `Backend` trait bundle (SignalStore +
//! AppSyncStore + ProtocolStore + DeviceStore) on top of the same sqlx
//! SQLite stack the rest of the agent already links, instead of pulling in
//! the diesel-based storage crate and its conflicting `libsqlite3-sys`.

mod app_sync;
mod protocol;
mod signal;

use async_trait::async_trait;
use sqlx::{Pool, Sqlite, SqlitePool};
use wacore::store::error::{db_err, StoreError};
use wacore::store::traits::DeviceStore;
use wacore::store::Device;

type Result<T> = wacore::store::error::Result<T>;

/// SQLite-backed WhatsApp session store.
pub struct WaSessionStore {
    pool: Pool<Sqlite>,
}

impl WaSessionStore {
    /// Open (or create) the session database and initialize the schema.
    pub async fn new(db_path: &str) -> std::result::Result<Self, sqlx::Error> {
        let pool = SqlitePool::connect(&format!("sqlite:{db_path}?mode=rwc")).await?;
        Self::init_schema(&pool).await?;
        Ok(Self { pool })
    }

    async fn init_schema(pool: &Pool<Sqlite>) -> std::result::Result<(), sqlx::Error> {
        sqlx::raw_sql(
            "CREATE TABLE IF NOT EXISTS signal_identities (
                address TEXT PRIMARY KEY,
                key_data BLOB NOT NULL
            );
            CREATE TABLE IF NOT EXISTS signal_sessions (
                address TEXT PRIMARY KEY,
                session_data BLOB NOT NULL
            );
            CREATE TABLE IF NOT EXISTS signal_prekeys (
                id INTEGER PRIMARY KEY,
                record BLOB NOT NULL,
                uploaded INTEGER NOT NULL DEFAULT 0
            );
            CREATE TABLE IF NOT EXISTS signal_signed_prekeys (
                id INTEGER PRIMARY KEY,
                record BLOB NOT NULL
            );
            CREATE TABLE IF NOT EXISTS signal_sender_keys (
                address TEXT PRIMARY KEY,
                record BLOB NOT NULL
            );
            CREATE TABLE IF NOT EXISTS appsync_keys (
                key_id BLOB PRIMARY KEY,
                key_data BLOB NOT NULL,
                timestamp INTEGER NOT NULL DEFAULT 0,
                fingerprint BLOB
            );
            CREATE TABLE IF NOT EXISTS appsync_versions (
                collection TEXT PRIMARY KEY,
                data TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS appsync_mutation_macs (
                collection TEXT NOT NULL,
                index_mac BLOB NOT NULL,
                version INTEGER NOT NULL,
                value_mac BLOB NOT NULL,
                PRIMARY KEY (collection, index_mac)
            );
            CREATE TABLE IF NOT EXISTS proto_skdm_recipients (
                group_jid TEXT NOT NULL,
                device_jid TEXT NOT NULL,
                PRIMARY KEY (group_jid, device_jid)
            );
            CREATE TABLE IF NOT EXISTS proto_lid_mappings (
                lid TEXT PRIMARY KEY,
                phone_number TEXT NOT NULL,
                created_at INTEGER NOT NULL DEFAULT 0,
                updated_at INTEGER NOT NULL DEFAULT 0,
                learning_source TEXT NOT NULL DEFAULT ''
            );
            CREATE TABLE IF NOT EXISTS proto_base_keys (
                address TEXT NOT NULL,
                message_id TEXT NOT NULL,
                base_key BLOB NOT NULL,
                PRIMARY KEY (address, message_id)
            );
            CREATE TABLE IF NOT EXISTS proto_device_lists (
                user TEXT PRIMARY KEY,
                data TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS proto_forget_sender_keys (
                group_jid TEXT NOT NULL,
                participant TEXT NOT NULL,
                PRIMARY KEY (group_jid, participant)
            );
            CREATE TABLE IF NOT EXISTS device_info (
                id INTEGER PRIMARY KEY,
                data BLOB NOT NULL
            );",
        )
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Fetch a single BLOB column keyed by a string address.
    async fn blob_by_addr(&self, sql: &str, address: &str) -> Result<Option<Vec<u8>>> {
        let row: Option<(Vec<u8>,)> = sqlx::query_as(sql)
            .bind(address)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.map(|(d,)| d))
    }

    /// Fetch a single BLOB column keyed by an integer id.
    async fn blob_by_id(&self, sql: &str, id: i64) -> Result<Option<Vec<u8>>> {
        let row: Option<(Vec<u8>,)> = sqlx::query_as(sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.map(|(d,)| d))
    }

    /// Upsert a BLOB keyed by a string address.
    async fn put_blob_by_addr(&self, sql: &str, address: &str, data: &[u8]) -> Result<()> {
        sqlx::query(sql)
            .bind(address)
            .bind(data)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Delete rows keyed by a string address.
    async fn delete_by_addr(&self, sql: &str, address: &str) -> Result<()> {
        sqlx::query(sql)
            .bind(address)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

#[async_trait]
impl DeviceStore for WaSessionStore {
    async fn save(&self, device: &Device) -> Result<()> {
        // Device uses custom serde (key_pair_serde, BigArray) that needs a
        // binary format; serde_json cannot handle deserialize_bytes.
        let data =
            bincode::serialize(device).map_err(|e| StoreError::Serialization(e.to_string()))?;
        sqlx::query("INSERT OR REPLACE INTO device_info (id, data) VALUES (1, ?)")
            .bind(&data)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn load(&self) -> Result<Option<Device>> {
        match self
            .blob_by_id("SELECT data FROM device_info WHERE id = ?", 1)
            .await?
        {
            Some(data) => {
                let device = bincode::deserialize(&data)
                    .map_err(|e| StoreError::Serialization(e.to_string()))?;
                Ok(Some(device))
            }
            None => Ok(None),
        }
    }

    async fn exists(&self) -> Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM device_info WHERE id = 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.is_some())
    }

    async fn create(&self) -> Result<i32> {
        // Device data itself is populated during pairing and stored via save().
        Ok(1)
    }
}
