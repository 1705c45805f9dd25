use crate::{
    context::Context,
    error::SosieError,
    message::{Completion, MessageEvent, MessageRecord, MessageRef},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Completion oracle — the brain.
///
/// Given a prompt and history, produce a text completion. Used both for
/// persona replies and direct assistant queries.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Human-readable provider name.
    fn name(&self) -> &str;

    /// Whether this provider requires an API key to function.
    fn requires_api_key(&self) -> bool;

    /// Send a conversation context to the provider and get a completion.
    async fn complete(&self, context: &Context) -> Result<Completion, SosieError>;

    /// Check if the provider is available and ready.
    async fn is_available(&self) -> bool;
}

/// Verdict returned by the typo-correction oracle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionVerdict {
    pub has_typos: bool,
    pub corrected_text: String,
    /// 0–100.
    pub confidence: u8,
}

impl CorrectionVerdict {
    /// Whether this verdict warrants rewriting `original`.
    pub fn applies_to(&self, original: &str, min_confidence: u8) -> bool {
        self.has_typos
            && self.confidence > min_confidence
            && !self.corrected_text.is_empty()
            && self.corrected_text != original
    }
}

/// Typo-correction oracle.
///
/// Judges a just-sent message against up to a handful of preceding messages
/// for context. Callers decide whether the verdict is applied.
#[async_trait]
pub trait Corrector: Send + Sync {
    async fn judge(
        &self,
        text: &str,
        history: &[MessageRecord],
    ) -> Result<CorrectionVerdict, SosieError>;
}

/// Messaging transport — the nervous system.
///
/// The transport delivers message events at-least-once and in no guaranteed
/// shape; everything above this trait must tolerate duplicates.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Human-readable channel name.
    fn name(&self) -> &str;

    /// Start listening. Returns a receiver yielding message events.
    async fn start(&self) -> Result<tokio::sync::mpsc::Receiver<MessageEvent>, SosieError>;

    /// Send a text message to a raw chat identifier.
    async fn send_text(&self, raw_chat_id: &str, text: &str) -> Result<MessageRef, SosieError>;

    /// Show the typing indicator in a chat.
    async fn start_typing(&self, _raw_chat_id: &str) -> Result<(), SosieError> {
        Ok(())
    }

    /// Clear the typing indicator in a chat.
    async fn stop_typing(&self, _raw_chat_id: &str) -> Result<(), SosieError> {
        Ok(())
    }

    /// Best-effort in-place edit of an already-sent message.
    ///
    /// Returns `Ok(false)` when the edit cannot be performed — window
    /// expired or the capability is unavailable. That outcome is expected
    /// steady-state behavior, not an error.
    async fn edit_message(&self, target: &MessageRef, new_text: &str)
        -> Result<bool, SosieError>;

    /// Graceful shutdown.
    async fn stop(&self) -> Result<(), SosieError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_applies_only_above_confidence() {
        let verdict = CorrectionVerdict {
            has_typos: true,
            corrected_text: "tu fais quoi".into(),
            confidence: 70,
        };
        // 70 is not strictly greater than 70.
        assert!(!verdict.applies_to("tu fai koi", 70));

        let verdict = CorrectionVerdict {
            confidence: 90,
            ..verdict
        };
        assert!(verdict.applies_to("tu fai koi", 70));
    }

    #[test]
    fn test_verdict_never_applies_to_identical_text() {
        let verdict = CorrectionVerdict {
            has_typos: true,
            corrected_text: "tu fais quoi".into(),
            confidence: 99,
        };
        assert!(!verdict.applies_to("tu fais quoi", 70));
    }

    #[test]
    fn test_verdict_never_applies_when_empty() {
        let verdict = CorrectionVerdict {
            has_typos: true,
            corrected_text: String::new(),
            confidence: 99,
        };
        assert!(!verdict.applies_to("tu fai koi", 70));
    }

    #[test]
    fn test_verdict_serde_camel_case() {
        let json = r#"{"hasTypos":true,"correctedText":"tu fais quoi","confidence":90}"#;
        let verdict: CorrectionVerdict = serde_json::from_str(json).unwrap();
        assert!(verdict.has_typos);
        assert_eq!(verdict.corrected_text, "tu fais quoi");
        assert_eq!(verdict.confidence, 90);
    }
}
