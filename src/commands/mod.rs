//! Reserved command parsing and administrative actions.
//!
//! Two channels exist. The assistant trigger (`paf <question>`) works in any
//! chat and both directions. Administrative verbs ride on outgoing messages
//! that are either self-addressed or carry the command prefix; anything
//! unrecognized there falls through to normal message handling, so a casual
//! note-to-self never produces an error.

#[cfg(test)]
mod tests;

use sosie_core::{
    config::CommandConfig,
    error::SosieError,
    message::Direction,
    runtime::{RuntimeState, TemporaryContext},
};
use sosie_memory::Store;
use std::time::Instant;

/// A recognized reserved command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Direct assistant query (any chat, any direction).
    Assistant(String),
    Admin(AdminCommand),
}

/// Administrative verbs on the owner's command channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    Pause,
    Resume,
    Status,
    ContextSet(String),
    ContextClear,
    Help,
}

impl Command {
    /// Parse a message into a command.
    ///
    /// `is_self_chat` must be true when the message is outgoing and its
    /// recipient resolves to the owner's own number.
    pub fn parse(
        text: &str,
        direction: Direction,
        is_self_chat: bool,
        config: &CommandConfig,
    ) -> Option<Self> {
        let trimmed = text.trim();
        let lower = trimmed.to_lowercase();

        // Assistant trigger first: it outranks the admin channel everywhere.
        let assistant_trigger = format!("{} ", config.assistant_prefix.to_lowercase());
        if let Some(question) = lower
            .starts_with(&assistant_trigger)
            .then(|| trimmed[assistant_trigger.len()..].trim())
        {
            if question.is_empty() {
                return None;
            }
            return Some(Self::Assistant(question.to_string()));
        }

        // Admin channel: outgoing, self-addressed or explicitly prefixed.
        // In the self chat the prefix is optional; anywhere else it is
        // mandatory so normal conversation can never trip a verb.
        if direction != Direction::Outbound {
            return None;
        }
        let prefix = format!("{} ", config.command_prefix.to_lowercase());
        let prefixed = lower.starts_with(&prefix);
        if !prefixed && !is_self_chat {
            return None;
        }
        let verb_offset = if prefixed { prefix.len() } else { 0 };
        let verb = &lower[verb_offset..];

        let admin = match verb {
            "pause" | "stop" => AdminCommand::Pause,
            "resume" | "start" => AdminCommand::Resume,
            "status" => AdminCommand::Status,
            "help" => AdminCommand::Help,
            "context clear" => AdminCommand::ContextClear,
            _ => {
                if verb.starts_with("context ") {
                    let offset = verb_offset + "context ".len();
                    let description = trimmed[offset..].trim();
                    if description.is_empty() {
                        return None;
                    }
                    AdminCommand::ContextSet(description.to_string())
                } else if prefixed && verb.starts_with(&assistant_trigger) {
                    // Legacy alias: `bot paf <question>`.
                    let offset = verb_offset + assistant_trigger.len();
                    let question = trimmed[offset..].trim();
                    if question.is_empty() {
                        return None;
                    }
                    return Some(Self::Assistant(question.to_string()));
                } else {
                    // Unknown verb: fall through to normal handling.
                    return None;
                }
            }
        };

        Some(Self::Admin(admin))
    }
}

/// Grouped context for admin command execution.
pub struct CommandContext<'a> {
    pub runtime: &'a RuntimeState,
    pub store: &'a Store,
    pub uptime: &'a Instant,
    pub provider_name: &'a str,
    pub context_ttl_minutes: i64,
}

/// Execute an admin command. Mutates the runtime state, persists the flags,
/// and returns exactly one acknowledgement text.
pub async fn handle(cmd: AdminCommand, ctx: &CommandContext<'_>) -> Result<String, SosieError> {
    let ack = match cmd {
        AdminCommand::Pause => {
            ctx.runtime.set_paused(true);
            "🛑 Bot mis en pause".to_string()
        }
        AdminCommand::Resume => {
            ctx.runtime.set_paused(false);
            "✅ Bot réactivé".to_string()
        }
        AdminCommand::Status => {
            let context_line = match ctx.runtime.active_context().await {
                Some(c) => format!("📍 Contexte: \"{}\"", c.description),
                None => "📍 Contexte: aucun".to_string(),
            };
            format!(
                "Bot status: {}\n✏️ Auto-correction: {}\n🔌 Master switch: {}\n{}\n🧠 Provider: {}\n⏱️ Uptime: {} min",
                if ctx.runtime.is_paused() {
                    "⏸️ En pause"
                } else {
                    "✅ Actif"
                },
                if ctx.runtime.autocorrect_enabled() {
                    "activée"
                } else {
                    "désactivée"
                },
                if ctx.store.master_switch().await? {
                    "on"
                } else {
                    "off"
                },
                context_line,
                ctx.provider_name,
                ctx.uptime.elapsed().as_secs() / 60,
            )
        }
        AdminCommand::ContextSet(description) => {
            let context = TemporaryContext::new(
                description.clone(),
                chrono::Duration::minutes(ctx.context_ttl_minutes),
            );
            ctx.runtime.set_context(context).await;
            format!("📍 Contexte mis à jour: \"{description}\"")
        }
        AdminCommand::ContextClear => {
            ctx.runtime.clear_context().await;
            "🧹 Contexte temporaire effacé".to_string()
        }
        AdminCommand::Help => "Commandes disponibles:\n\
             • bot pause/stop - Met le bot en pause\n\
             • bot resume/start - Réactive le bot\n\
             • bot status - Affiche le statut\n\
             • bot context [description] - Définit un contexte temporaire\n\
             • bot context clear - Efface le contexte temporaire\n\
             • paf [question] - Pose une question à l'assistant\n\
             • bot help - Affiche cette aide\n\n\
             Exemple: bot context je suis au bar avec Vincent"
            .to_string(),
    };

    // Persist so a restart comes back with the same posture.
    ctx.store.save_flags(&ctx.runtime.flags().await).await?;

    Ok(ack)
}
