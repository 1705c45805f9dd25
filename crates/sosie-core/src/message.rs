use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction of a transport event relative to the owner's account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Sent by a contact to the owner.
    Inbound,
    /// Sent from the owner's account (by the owner or by the bot itself).
    Outbound,
}

/// Media classes carried by a message (content is never downloaded).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    Photo,
    Video,
    Audio,
    Sticker,
    Document,
}

/// One transport-level message event.
///
/// The transport fires overlapping events for the same logical message and
/// does not agree with itself on which identifier field it exposes, so every
/// event carries all known identifier aliases in `id_candidates`. The
/// deduplicator treats them as one identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEvent {
    /// Transport identifiers, all aliases of one logical message.
    pub id_candidates: Vec<String>,
    /// Raw JID of the conversation peer (recipient for outbound, sender for inbound).
    pub raw_chat_id: String,
    pub direction: Direction,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Media class, if the message carries an attachment.
    pub media: Option<MediaKind>,
    pub is_group: bool,
}

impl MessageEvent {
    /// Primary transport id: the first non-empty candidate.
    pub fn primary_id(&self) -> &str {
        self.id_candidates
            .iter()
            .find(|id| !id.is_empty())
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn is_inbound(&self) -> bool {
        self.direction == Direction::Inbound
    }

    pub fn has_media(&self) -> bool {
        self.media.is_some()
    }
}

/// A single entry of conversation history, as stored in the rolling log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    pub from_me: bool,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Reference to a message sent through the transport, usable for later edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRef {
    pub raw_chat_id: String,
    pub message_id: String,
    pub sent_at: DateTime<Utc>,
}

/// A completion returned by the provider.
#[derive(Debug, Clone, Default)]
pub struct Completion {
    pub text: String,
    pub model: Option<String>,
    pub tokens_used: Option<u64>,
    /// Wall-clock processing time in milliseconds.
    pub processing_time_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_id_skips_empty_candidates() {
        let ev = MessageEvent {
            id_candidates: vec!["".into(), "ABC123".into()],
            raw_chat_id: "33612345678@c.us".into(),
            direction: Direction::Inbound,
            text: "salut".into(),
            timestamp: Utc::now(),
            media: None,
            is_group: false,
        };
        assert_eq!(ev.primary_id(), "ABC123");
    }

    #[test]
    fn test_primary_id_empty_when_no_candidates() {
        let ev = MessageEvent {
            id_candidates: vec![],
            raw_chat_id: "33612345678@c.us".into(),
            direction: Direction::Outbound,
            text: "ok".into(),
            timestamp: Utc::now(),
            media: None,
            is_group: false,
        };
        assert_eq!(ev.primary_id(), "");
    }
}
