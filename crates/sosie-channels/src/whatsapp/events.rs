//! Incoming WhatsApp event handling — unwrapping and mapping to `MessageEvent`.

use chrono::Utc;
use sosie_core::message::{Direction, MediaKind, MessageEvent};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Build the identifier alias list for one logical message.
///
/// The transport's events do not agree on which identifier field they
/// expose: some carry the bare stanza id, others a chat-scoped serialized
/// form. Both are recorded so the deduplicator can collapse overlapping
/// deliveries whichever field a later event leads with.
pub(super) fn id_candidates(chat_jid: &str, message_id: &str) -> Vec<String> {
    vec![
        message_id.to_string(),
        format!("{chat_jid}#{message_id}"),
    ]
}

/// Classify the media payload of an unwrapped message, if any.
pub(super) fn media_kind(msg: &waproto::whatsapp::Message) -> Option<MediaKind> {
    if msg.image_message.is_some() {
        Some(MediaKind::Photo)
    } else if msg.video_message.is_some() {
        Some(MediaKind::Video)
    } else if msg.audio_message.is_some() {
        Some(MediaKind::Audio)
    } else if msg.sticker_message.is_some() {
        Some(MediaKind::Sticker)
    } else if msg.document_message.is_some() {
        Some(MediaKind::Document)
    } else {
        None
    }
}

/// Process one incoming WhatsApp message event and forward it to the gateway.
///
/// No filtering happens here beyond dropping empty events: direction, group
/// handling, dedup, and command routing are all gateway concerns.
pub(super) async fn handle_whatsapp_message(
    msg: waproto::whatsapp::Message,
    info: wacore::types::message::MessageInfo,
    tx: &mpsc::Sender<MessageEvent>,
) {
    let direction = if info.source.is_from_me {
        Direction::Outbound
    } else {
        Direction::Inbound
    };

    debug!(
        "WA event: from_me={}, group={}, chat={}, id={}",
        info.source.is_from_me, info.source.is_group, info.source.chat, info.id,
    );

    // Unwrap nested wrappers (device_sent, ephemeral, view_once).
    let inner = msg
        .device_sent_message
        .as_ref()
        .and_then(|d| d.message.as_deref())
        .or_else(|| {
            msg.ephemeral_message
                .as_ref()
                .and_then(|e| e.message.as_deref())
        })
        .or_else(|| {
            msg.view_once_message
                .as_ref()
                .and_then(|v| v.message.as_deref())
        })
        .unwrap_or(&msg);

    let text = inner
        .conversation
        .as_deref()
        .or_else(|| {
            inner
                .extended_text_message
                .as_ref()
                .and_then(|e| e.text.as_deref())
        })
        .unwrap_or("")
        .to_string();

    let media = media_kind(inner);

    if text.is_empty() && media.is_none() {
        debug!("WA event dropped: no text and no media");
        return;
    }

    let chat_jid = info.source.chat.to_string();
    let event = MessageEvent {
        id_candidates: id_candidates(&chat_jid, &info.id),
        raw_chat_id: chat_jid,
        direction,
        text,
        timestamp: Utc::now(),
        media,
        is_group: info.source.is_group,
    };

    if tx.send(event).await.is_err() {
        info!("whatsapp event receiver dropped");
    }
}
