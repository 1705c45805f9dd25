//! Message pipeline: dedup → command routing → direction-specific handling.

use super::autocorrect::CorrectionOutcome;
use super::Gateway;
use crate::commands::{self, Command, CommandContext};
use sosie_core::{
    error::SosieError,
    identity,
    message::{Direction, MessageEvent},
};
use tracing::{debug, info};

impl Gateway {
    /// Process one transport event through the full pipeline.
    pub(super) async fn handle_event(&self, event: &MessageEvent) -> Result<(), SosieError> {
        // --- 1. DEDUPLICATION ---
        // Before anything side-effecting: the transport delivers the same
        // logical message through several overlapping events.
        if !self.dedup.should_process(&event.id_candidates).await {
            debug!("duplicate delivery dropped: {}", event.primary_id());
            return Ok(());
        }

        let preview: String = event.text.chars().take(60).collect();
        info!(
            "[{}] {} {}: {preview}",
            self.channel.name(),
            match event.direction {
                Direction::Inbound => "from",
                Direction::Outbound => "to",
            },
            identity::normalize(&event.raw_chat_id),
        );

        // --- 2. COMMAND ROUTING ---
        let is_self_chat = event.direction == Direction::Outbound
            && identity::matches(&event.raw_chat_id, &self.config.agent.owner_number);

        if let Some(cmd) = Command::parse(
            &event.text,
            event.direction,
            is_self_chat,
            &self.config.commands,
        ) {
            return match cmd {
                Command::Assistant(question) => {
                    self.handle_assistant_query(event, &question).await
                }
                Command::Admin(admin) => {
                    info!("admin command: {admin:?}");
                    let ctx = CommandContext {
                        runtime: &self.runtime,
                        store: &self.store,
                        uptime: &self.uptime,
                        provider_name: self.provider.name(),
                        context_ttl_minutes: self.config.commands.context_ttl_minutes,
                    };
                    let ack = commands::handle(admin, &ctx).await?;
                    self.send_tagged(&event.raw_chat_id, &ack).await
                }
            };
        }

        // --- 3. GROUP GATE ---
        // Groups only ever see the assistant trigger, handled above.
        if event.is_group {
            debug!("group message ignored");
            return Ok(());
        }

        // --- 4. DIRECTION SPLIT ---
        match event.direction {
            Direction::Outbound => {
                match self.maybe_correct(event).await {
                    CorrectionOutcome::Applied { corrected } => {
                        info!("auto-correct: \"{}\" -> \"{corrected}\"", event.text);
                    }
                    CorrectionOutcome::Skipped(reason) => {
                        debug!("auto-correct skipped: {reason}");
                    }
                    CorrectionOutcome::Failed(reason) => {
                        // The message stays as sent.
                        info!("auto-correct not applied: {reason}");
                    }
                }
                Ok(())
            }
            Direction::Inbound => self.handle_inbound(event).await,
        }
    }
}
