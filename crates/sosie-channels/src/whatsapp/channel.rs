//! Channel trait implementation for the WhatsApp transport.

use super::send::{retry_send, split_message, MAX_MESSAGE_CHARS};
use super::WhatsAppTransport;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sosie_core::{
    error::SosieError,
    message::{MessageEvent, MessageRef},
    traits::Channel,
};
use tokio::sync::mpsc;
use tracing::{info, warn};
use wacore_binary::jid::Jid;

/// Transport-imposed edit window: WhatsApp rejects edits on messages older
/// than about 15 minutes.
const EDIT_WINDOW_SECS: i64 = 900;

/// Whether `sent_at` is still inside the transport's edit window at `now`.
pub(super) fn within_edit_window(sent_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    let age = now.signed_duration_since(sent_at);
    age.num_seconds() >= 0 && age.num_seconds() <= EDIT_WINDOW_SECS
}

impl WhatsAppTransport {
    async fn connected_client(
        &self,
    ) -> Result<std::sync::Arc<whatsapp_rust::client::Client>, SosieError> {
        self.client
            .lock()
            .await
            .clone()
            .ok_or_else(|| SosieError::Channel("whatsapp client not connected".into()))
    }

    fn parse_jid(raw: &str) -> Result<Jid, SosieError> {
        raw.parse()
            .map_err(|e| SosieError::Channel(format!("invalid whatsapp JID '{raw}': {e}")))
    }
}

#[async_trait]
impl Channel for WhatsAppTransport {
    fn name(&self) -> &str {
        "whatsapp"
    }

    async fn start(&self) -> Result<mpsc::Receiver<MessageEvent>, SosieError> {
        let (tx, rx) = mpsc::channel(64);
        *self.msg_tx.lock().await = Some(tx.clone());
        self.build_and_run_bot(tx).await?;
        info!("whatsapp transport started");
        Ok(rx)
    }

    async fn send_text(&self, raw_chat_id: &str, text: &str) -> Result<MessageRef, SosieError> {
        let client = self.connected_client().await?;
        let jid = Self::parse_jid(raw_chat_id)?;

        let chunks = split_message(text, MAX_MESSAGE_CHARS);
        let mut last_id = String::new();
        for chunk in chunks {
            let msg = waproto::whatsapp::Message {
                conversation: Some(chunk),
                ..Default::default()
            };
            last_id = retry_send(&client, &jid, msg).await?;
        }

        Ok(MessageRef {
            raw_chat_id: raw_chat_id.to_string(),
            message_id: last_id,
            sent_at: Utc::now(),
        })
    }

    async fn start_typing(&self, raw_chat_id: &str) -> Result<(), SosieError> {
        if let Some(ref client) = *self.client.lock().await {
            let jid = Self::parse_jid(raw_chat_id)?;
            let _ = client.chatstate().send_composing(&jid).await;
        }
        Ok(())
    }

    async fn stop_typing(&self, raw_chat_id: &str) -> Result<(), SosieError> {
        if let Some(ref client) = *self.client.lock().await {
            let jid = Self::parse_jid(raw_chat_id)?;
            let _ = client.chatstate().send_paused(&jid).await;
        }
        Ok(())
    }

    async fn edit_message(
        &self,
        target: &MessageRef,
        new_text: &str,
    ) -> Result<bool, SosieError> {
        if !within_edit_window(target.sent_at, Utc::now()) {
            info!(
                "edit window expired for message {} — leaving as sent",
                target.message_id
            );
            return Ok(false);
        }

        let client = self.connected_client().await?;
        let jid = Self::parse_jid(&target.raw_chat_id)?;

        // Protocol-level edit: a protocolMessage of type MESSAGE_EDIT keyed
        // to the original stanza, carrying the replacement body.
        let edit = waproto::whatsapp::Message {
            protocol_message: Some(Box::new(waproto::whatsapp::message::ProtocolMessage {
                key: Some(waproto::whatsapp::MessageKey {
                    remote_jid: Some(jid.to_string()),
                    from_me: Some(true),
                    id: Some(target.message_id.clone()),
                    ..Default::default()
                }),
                r#type: Some(
                    waproto::whatsapp::message::protocol_message::Type::MessageEdit as i32,
                ),
                edited_message: Some(Box::new(waproto::whatsapp::Message {
                    conversation: Some(new_text.to_string()),
                    ..Default::default()
                })),
                ..Default::default()
            })),
            ..Default::default()
        };

        match retry_send(&client, &jid, edit).await {
            Ok(_) => Ok(true),
            Err(e) => {
                // The transport may simply not accept the edit (old client
                // version, message already edited, ...). Recoverable.
                warn!("whatsapp edit failed for {}: {e}", target.message_id);
                Ok(false)
            }
        }
    }

    async fn stop(&self) -> Result<(), SosieError> {
        info!("whatsapp transport stopped");
        *self.client.lock().await = None;
        Ok(())
    }
}
