//! Rolling conversation log.
//!
//! Keeps the last N exchanges per chat. Serves the bounded, chronological
//! history window used for reply prompts and correction context — always
//! strictly before the message being handled, so a prompt never sees the
//! future.

use super::Store;
use chrono::{DateTime, Utc};
use sosie_core::{error::SosieError, identity, message::MessageRecord};

impl Store {
    /// Append one message to a chat's log and prune past the cap.
    pub async fn record_exchange(
        &self,
        raw_chat_id: &str,
        from_me: bool,
        body: &str,
        sentiment: Option<&str>,
        timestamp: DateTime<Utc>,
    ) -> Result<(), SosieError> {
        let chat_id = identity::normalize(raw_chat_id);

        sqlx::query(
            "INSERT INTO exchanges (chat_id, from_me, body, sentiment, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&chat_id)
        .bind(from_me)
        .bind(body)
        .bind(sentiment)
        .bind(timestamp.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| SosieError::Memory(format!("failed to record exchange: {e}")))?;

        self.prune_log(&chat_id).await
    }

    /// The last `limit` messages of a chat strictly before `before`,
    /// oldest first.
    pub async fn recent_history(
        &self,
        raw_chat_id: &str,
        limit: usize,
        before: DateTime<Utc>,
    ) -> Result<Vec<MessageRecord>, SosieError> {
        let chat_id = identity::normalize(raw_chat_id);

        let rows: Vec<(bool, String, String)> = sqlx::query_as(
            "SELECT from_me, body, created_at FROM exchanges
             WHERE chat_id = ? AND created_at < ?
             ORDER BY created_at DESC LIMIT ?",
        )
        .bind(&chat_id)
        .bind(before.to_rfc3339())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| SosieError::Memory(format!("failed to load history: {e}")))?;

        let mut records: Vec<MessageRecord> = rows
            .into_iter()
            .map(|(from_me, text, created_at)| MessageRecord {
                from_me,
                text,
                timestamp: DateTime::parse_from_rfc3339(&created_at)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_default(),
            })
            .collect();
        records.reverse();
        Ok(records)
    }

    /// Number of logged messages for a chat.
    pub async fn log_len(&self, raw_chat_id: &str) -> Result<i64, SosieError> {
        let chat_id = identity::normalize(raw_chat_id);
        sqlx::query_scalar("SELECT COUNT(*) FROM exchanges WHERE chat_id = ?")
            .bind(&chat_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| SosieError::Memory(format!("failed to count log: {e}")))
    }

    async fn prune_log(&self, chat_id: &str) -> Result<(), SosieError> {
        sqlx::query(
            "DELETE FROM exchanges
             WHERE chat_id = ?1 AND id NOT IN (
                 SELECT id FROM exchanges WHERE chat_id = ?1
                 ORDER BY created_at DESC LIMIT ?2
             )",
        )
        .bind(chat_id)
        .bind(self.log_cap_per_chat as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| SosieError::Memory(format!("failed to prune log: {e}")))?;
        Ok(())
    }
}
