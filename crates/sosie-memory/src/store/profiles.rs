//! Contact profile resolution and CRUD.

use super::{ContactPatch, ContactProfile, NewContact, ProfileLookup, Store};
use sosie_core::{error::SosieError, identity};

impl Store {
    /// Resolve a raw chat identifier to a configured contact.
    ///
    /// Matching is suffix-aware (`identity::matches`), so a contact stored
    /// as `"+33612345678"` resolves events from `"612345678@c.us"`.
    pub async fn find_profile(&self, raw_chat_id: &str) -> Result<ProfileLookup, SosieError> {
        let contacts = self.list_contacts().await?;
        for contact in contacts {
            if identity::matches(raw_chat_id, &contact.phone_number) {
                return Ok(ProfileLookup::Found(contact));
            }
        }
        Ok(ProfileLookup::NoProfile)
    }

    pub async fn list_contacts(&self) -> Result<Vec<ContactProfile>, SosieError> {
        sqlx::query_as::<_, ContactProfile>(
            "SELECT id, name, phone_number, relationship, enabled, auto_reply, auto_correct,
                    use_emojis, message_length, intimacy, custom_prompt
             FROM contacts ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| SosieError::Memory(format!("failed to list contacts: {e}")))
    }

    pub async fn get_contact(&self, id: i64) -> Result<Option<ContactProfile>, SosieError> {
        sqlx::query_as::<_, ContactProfile>(
            "SELECT id, name, phone_number, relationship, enabled, auto_reply, auto_correct,
                    use_emojis, message_length, intimacy, custom_prompt
             FROM contacts WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| SosieError::Memory(format!("failed to get contact: {e}")))
    }

    /// Insert a new contact, disabled by default.
    pub async fn add_contact(&self, new: &NewContact) -> Result<ContactProfile, SosieError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO contacts (name, phone_number, relationship)
             VALUES (?, ?, ?) RETURNING id",
        )
        .bind(&new.name)
        .bind(&new.phone_number)
        .bind(&new.relationship)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| SosieError::Memory(format!("failed to add contact: {e}")))?;

        self.get_contact(id)
            .await?
            .ok_or_else(|| SosieError::Memory("inserted contact not found".into()))
    }

    /// Apply a partial update; unset fields are untouched.
    pub async fn update_contact(
        &self,
        id: i64,
        patch: &ContactPatch,
    ) -> Result<Option<ContactProfile>, SosieError> {
        let Some(current) = self.get_contact(id).await? else {
            return Ok(None);
        };

        sqlx::query(
            "UPDATE contacts SET name = ?, phone_number = ?, relationship = ?, enabled = ?,
                    auto_reply = ?, auto_correct = ?, custom_prompt = ?,
                    updated_at = datetime('now')
             WHERE id = ?",
        )
        .bind(patch.name.as_ref().unwrap_or(&current.name))
        .bind(patch.phone_number.as_ref().unwrap_or(&current.phone_number))
        .bind(patch.relationship.as_ref().unwrap_or(&current.relationship))
        .bind(patch.enabled.unwrap_or(current.enabled))
        .bind(patch.auto_reply.unwrap_or(current.auto_reply))
        .bind(patch.auto_correct.unwrap_or(current.auto_correct))
        .bind(
            patch
                .custom_prompt
                .as_deref()
                .or(current.custom_prompt.as_deref()),
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| SosieError::Memory(format!("failed to update contact: {e}")))?;

        self.get_contact(id).await
    }

    pub async fn delete_contact(&self, id: i64) -> Result<bool, SosieError> {
        let result = sqlx::query("DELETE FROM contacts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| SosieError::Memory(format!("failed to delete contact: {e}")))?;
        Ok(result.rows_affected() > 0)
    }
}
