//! Persisted runtime flags.
//!
//! A single-row table holding the pause flag, the auto-correct flag, the
//! master switch, and the serialized temporary context. Written on every
//! administrative command so the state survives a restart.

use super::Store;
use sosie_core::{error::SosieError, runtime::RuntimeFlags};

impl Store {
    /// Load the persisted flags, seeding the row with defaults on first use.
    pub async fn load_flags(&self) -> Result<RuntimeFlags, SosieError> {
        let row: Option<(bool, bool, Option<String>)> = sqlx::query_as(
            "SELECT paused, autocorrect_enabled, temporary_context FROM runtime_flags WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| SosieError::Memory(format!("failed to load flags: {e}")))?;

        match row {
            Some((paused, autocorrect_enabled, context_json)) => {
                let temporary_context = context_json
                    .as_deref()
                    .and_then(|json| serde_json::from_str(json).ok());
                Ok(RuntimeFlags {
                    paused,
                    autocorrect_enabled,
                    temporary_context,
                })
            }
            None => {
                let flags = RuntimeFlags {
                    paused: false,
                    autocorrect_enabled: true,
                    temporary_context: None,
                };
                self.save_flags(&flags).await?;
                Ok(flags)
            }
        }
    }

    /// Persist a flags snapshot.
    pub async fn save_flags(&self, flags: &RuntimeFlags) -> Result<(), SosieError> {
        let context_json = flags
            .temporary_context
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            "INSERT INTO runtime_flags (id, paused, autocorrect_enabled, temporary_context, updated_at)
             VALUES (1, ?, ?, ?, datetime('now'))
             ON CONFLICT(id) DO UPDATE SET
                 paused = excluded.paused,
                 autocorrect_enabled = excluded.autocorrect_enabled,
                 temporary_context = excluded.temporary_context,
                 updated_at = excluded.updated_at",
        )
        .bind(flags.paused)
        .bind(flags.autocorrect_enabled)
        .bind(context_json)
        .execute(&self.pool)
        .await
        .map_err(|e| SosieError::Memory(format!("failed to save flags: {e}")))?;

        Ok(())
    }

    /// Global enable flag for all automatic replying, independent of the
    /// pause command and per-contact settings.
    pub async fn master_switch(&self) -> Result<bool, SosieError> {
        let on: Option<bool> =
            sqlx::query_scalar("SELECT master_switch FROM runtime_flags WHERE id = 1")
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| SosieError::Memory(format!("failed to read master switch: {e}")))?;
        // No row yet means nothing ever disabled it.
        Ok(on.unwrap_or(true))
    }

    pub async fn set_master_switch(&self, on: bool) -> Result<(), SosieError> {
        sqlx::query(
            "INSERT INTO runtime_flags (id, master_switch, updated_at)
             VALUES (1, ?, datetime('now'))
             ON CONFLICT(id) DO UPDATE SET
                 master_switch = excluded.master_switch,
                 updated_at = excluded.updated_at",
        )
        .bind(on)
        .execute(&self.pool)
        .await
        .map_err(|e| SosieError::Memory(format!("failed to set master switch: {e}")))?;
        Ok(())
    }
}
