//! Auto-correction of the owner's own outgoing messages.
//!
//! The exclusion chain runs before the oracle call: reserved traffic and
//! bot-authored replies must never be rewritten, and skipping them early
//! also avoids paying for a judgment that would be discarded.

use super::Gateway;
use sosie_core::message::{MessageEvent, MessageRef};
use sosie_memory::ProfileLookup;
use tracing::{info, warn};

/// What happened to one outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CorrectionOutcome {
    /// No correction was warranted or allowed.
    Skipped(&'static str),
    /// The sent message was edited in place.
    Applied { corrected: String },
    /// A correction was warranted but could not be applied.
    Failed(String),
}

impl Gateway {
    /// Inspect an outgoing message and, when warranted, edit it in place.
    pub(crate) async fn maybe_correct(&self, event: &MessageEvent) -> CorrectionOutcome {
        let cfg = &self.config.correction;
        let cmd = &self.config.commands;
        let text = event.text.as_str();
        let lower = text.trim().to_lowercase();

        if text.chars().count() < cfg.min_chars {
            return CorrectionOutcome::Skipped("too short");
        }
        if lower.starts_with(&format!("{} ", cmd.command_prefix.to_lowercase())) {
            return CorrectionOutcome::Skipped("reserved command");
        }
        if lower.starts_with(&format!("{} ", cmd.assistant_prefix.to_lowercase())) {
            return CorrectionOutcome::Skipped("assistant query");
        }
        if text.trim_start().starts_with("🤖") {
            return CorrectionOutcome::Skipped("assistant marker");
        }
        // Checked before any oracle work: a tagged id means this outgoing
        // event is a bot-authored reply coming back around.
        if self.tags.consume(&event.id_candidates).await {
            return CorrectionOutcome::Skipped("tagged bot reply");
        }

        // Correction is keyed by the *recipient*: a per-contact setting wins
        // over the global flag.
        let enabled = match self.store.find_profile(&event.raw_chat_id).await {
            Ok(ProfileLookup::Found(profile)) => profile.auto_correct,
            Ok(ProfileLookup::NoProfile) => self.runtime.autocorrect_enabled(),
            Err(e) => {
                warn!("profile lookup failed, using global flag: {e}");
                self.runtime.autocorrect_enabled()
            }
        };
        if !enabled {
            return CorrectionOutcome::Skipped("disabled for recipient");
        }

        let history = self
            .store
            .recent_history(&event.raw_chat_id, cfg.context_messages, event.timestamp)
            .await
            .unwrap_or_default();

        let verdict = match self.corrector.judge(text, &history).await {
            Ok(v) => v,
            Err(e) => {
                // Oracle failure means no correction, never a retry.
                warn!("correction oracle failed: {e}");
                return CorrectionOutcome::Failed(format!("oracle: {e}"));
            }
        };

        if !verdict.applies_to(text, cfg.min_confidence) {
            return CorrectionOutcome::Skipped("no confident correction");
        }

        let target = MessageRef {
            raw_chat_id: event.raw_chat_id.clone(),
            message_id: event.primary_id().to_string(),
            sent_at: event.timestamp,
        };

        match self
            .channel
            .edit_message(&target, &verdict.corrected_text)
            .await
        {
            Ok(true) => CorrectionOutcome::Applied {
                corrected: verdict.corrected_text,
            },
            Ok(false) => {
                // Expected steady-state outcome: window expired or the
                // transport has no edit capability right now.
                info!("edit not possible for {}", target.message_id);
                CorrectionOutcome::Failed("edit window expired or unavailable".into())
            }
            Err(e) => {
                warn!("edit attempt failed: {e}");
                CorrectionOutcome::Failed(e.to_string())
            }
        }
    }
}
