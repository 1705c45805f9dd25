//! Auto-reply orchestration and the direct assistant query path.

use super::Gateway;
use chrono::Timelike;
use rand::prelude::IndexedRandom;
use rand::Rng;
use sosie_core::{
    context::{Context, ContextEntry},
    error::SosieError,
    message::{MediaKind, MessageEvent, MessageRecord},
    runtime::TemporaryContext,
    sentiment::{self, Sentiment},
};
use sosie_memory::{ContactProfile, ProfileLookup};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Canned reactions per media class — a quick human acknowledgement instead
/// of an LLM reply the model could not ground anyway.
const PHOTO_REACTIONS: &[&str] = &["waw 😍", "trop bien!", "stylé!", "😮", "canon!", "👌", "joli!"];
const VIDEO_REACTIONS: &[&str] = &["je regarde", "2sec", "ah ouais!", "😂", "excellent", "mdr"];
const AUDIO_REACTIONS: &[&str] = &["j'écoute", "ok je mets le son", "👍", "2sec"];
const STICKER_REACTIONS: &[&str] = &["😂", "mdr", "😅", "ahah", "👍"];
const DOCUMENT_REACTIONS: &[&str] = &["je regarde", "ok je dl", "merci", "👍", "reçu"];

fn media_reaction(kind: MediaKind) -> &'static str {
    let pool = match kind {
        MediaKind::Photo => PHOTO_REACTIONS,
        MediaKind::Video => VIDEO_REACTIONS,
        MediaKind::Audio => AUDIO_REACTIONS,
        MediaKind::Sticker => STICKER_REACTIONS,
        MediaKind::Document => DOCUMENT_REACTIONS,
    };
    let mut rng = rand::rng();
    pool.choose(&mut rng).copied().unwrap_or("👍")
}

/// Coarse time-of-day label injected into the persona prompt.
pub(super) fn time_of_day_label(hour: u32) -> &'static str {
    match hour {
        0..=8 => "matin_tot",
        9..=11 => "matin",
        12..=13 => "midi",
        14..=17 => "aprem",
        18..=21 => "soir",
        _ => "nuit",
    }
}

fn history_to_entries(history: &[MessageRecord]) -> Vec<ContextEntry> {
    history
        .iter()
        .map(|r| ContextEntry {
            role: if r.from_me { "assistant" } else { "user" }.to_string(),
            content: r.text.clone(),
        })
        .collect()
}

impl Gateway {
    /// Handle a non-command inbound message: gate, generate, pace, send.
    pub(super) async fn handle_inbound(&self, event: &MessageEvent) -> Result<(), SosieError> {
        // --- GATES (first failure short-circuits, log only) ---
        if self.runtime.is_paused() {
            info!("skip: bot paused");
            return Ok(());
        }
        if !self.store.master_switch().await? {
            info!("skip: master switch off");
            return Ok(());
        }

        let profile = match self.store.find_profile(&event.raw_chat_id).await? {
            ProfileLookup::Found(p) => {
                if !p.enabled || !p.auto_reply {
                    info!("skip: contact {} disabled or auto-reply off", p.name);
                    return Ok(());
                }
                Some(p)
            }
            ProfileLookup::NoProfile => {
                if !self.config.agent.default_enabled {
                    info!("skip: unconfigured contact and default disabled");
                    return Ok(());
                }
                None
            }
        };

        // --- MEDIA: quick canned reaction, no oracle ---
        if let Some(kind) = event.media {
            let reaction = media_reaction(kind);
            tokio::time::sleep(Duration::from_millis(1_000)).await;
            self.channel
                .send_text(&event.raw_chat_id, reaction)
                .await?;
            self.store
                .record_exchange(
                    &event.raw_chat_id,
                    false,
                    &format!("[{kind:?}]"),
                    None,
                    event.timestamp,
                )
                .await?;
            self.store
                .record_exchange(
                    &event.raw_chat_id,
                    true,
                    reaction,
                    None,
                    chrono::Utc::now(),
                )
                .await?;
            info!("media reaction sent: {reaction}");
            return Ok(());
        }

        // --- CONTEXT & PROMPT ---
        let sentiment = sentiment::classify(&event.text);
        let temp_ctx = self.runtime.active_context().await;
        debug!("sentiment: {sentiment:?}, temporary context: {}", temp_ctx.is_some());

        self.store
            .record_exchange(
                &event.raw_chat_id,
                false,
                &event.text,
                Some(sentiment_label(sentiment)),
                event.timestamp,
            )
            .await?;

        let history = self
            .store
            .recent_history(
                &event.raw_chat_id,
                self.config.memory.history_window,
                event.timestamp,
            )
            .await?;

        let context = Context {
            system_prompt: self.persona_prompt(profile.as_ref(), sentiment, temp_ctx.as_ref()),
            history: history_to_entries(&history),
            current_message: event.text.clone(),
            model: Some(self.config.provider.reply_model.clone()),
            temperature: Some(0.9),
            max_tokens: Some(150),
        };

        let completion = self.provider.complete(&context).await?;

        // --- PACING ---
        let delay = self
            .pacing
            .plan(&event.raw_chat_id, completion.text.chars().count())
            .await;
        let thinking = self.apply_context_floor(delay.thinking, temp_ctx.as_ref());

        info!(
            "reply planned: thinking {:.1}s, typing {:.1}s",
            thinking.as_secs_f32(),
            delay.typing.as_secs_f32(),
        );

        tokio::time::sleep(thinking).await;
        if let Err(e) = self.channel.start_typing(&event.raw_chat_id).await {
            debug!("typing indicator failed: {e}");
        }
        tokio::time::sleep(delay.typing).await;
        let _ = self.channel.stop_typing(&event.raw_chat_id).await;

        let sent = self
            .channel
            .send_text(&event.raw_chat_id, &completion.text)
            .await?;

        self.store
            .record_exchange(&event.raw_chat_id, true, &completion.text, None, sent.sent_at)
            .await?;

        info!("auto-reply sent: {}", completion.text);
        Ok(())
    }

    /// Direct assistant query: no persona, no pacing, robot-marked reply.
    pub(super) async fn handle_assistant_query(
        &self,
        event: &MessageEvent,
        question: &str,
    ) -> Result<(), SosieError> {
        info!("assistant query: {question}");
        let _ = self.channel.start_typing(&event.raw_chat_id).await;

        let history = self
            .store
            .recent_history(&event.raw_chat_id, 5, event.timestamp)
            .await
            .unwrap_or_default();

        let now = chrono::Local::now();
        let system_prompt = format!(
            "Tu es un assistant IA sur WhatsApp. Date: {}, Heure: {}.\n\
             Réponds de manière concise (max 800 caractères).\n\
             Détecte la langue de la question et réponds dans la même langue.\n\
             Utilise des emojis pour la lisibilité.",
            now.format("%Y-%m-%d"),
            now.format("%H:%M"),
        );

        let context = Context {
            system_prompt,
            history: history_to_entries(&history),
            current_message: question.to_string(),
            model: Some(self.config.provider.assistant_model.clone()),
            temperature: Some(0.7),
            max_tokens: Some(800),
        };

        let text = match self.provider.complete(&context).await {
            Ok(completion) => {
                if completion.text.starts_with("🤖") {
                    completion.text
                } else {
                    format!("🤖 {}", completion.text)
                }
            }
            Err(e) => {
                warn!("assistant query failed: {e}");
                "🤖 ❌ Erreur assistant, réessaie".to_string()
            }
        };

        let _ = self.channel.stop_typing(&event.raw_chat_id).await;
        // Tagged either way: even the error reply must never be
        // "corrected" into something that looks human-authored.
        self.send_tagged(&event.raw_chat_id, &text).await
    }

    /// Floor-clamp a computed delay with the temporary-context heuristic.
    /// A floor, never a ceiling: being "busy" can only slow the reply down.
    pub(super) fn apply_context_floor(
        &self,
        thinking: Duration,
        temp_ctx: Option<&TemporaryContext>,
    ) -> Duration {
        let Some((min_secs, max_secs)) = temp_ctx.and_then(|c| c.delay_floor()) else {
            return thinking;
        };
        let mut rng = rand::rng();
        let floor = Duration::from_secs(rng.random_range(min_secs..=max_secs));
        thinking.max(floor)
    }

    /// Build the persona system prompt for one reply.
    fn persona_prompt(
        &self,
        profile: Option<&ContactProfile>,
        sentiment: Sentiment,
        temp_ctx: Option<&TemporaryContext>,
    ) -> String {
        let owner = &self.config.agent.owner_name;
        let contact_name = profile.map(|p| p.name.as_str()).unwrap_or("Le contact");

        let base = match profile {
            Some(p) => match &p.custom_prompt {
                Some(custom) => custom.clone(),
                None => relationship_prompt(owner, p),
            },
            None => format!("Tu es {owner} et tu parles à quelqu'un. Reste naturel et bref."),
        };

        let mut prompt = format!(
            "{base}\n\n\
             RÈGLE ABSOLUE : Tu ES {owner}, pas un assistant. Si on te demande \
             si tu es un bot ou une IA, tu nies catégoriquement.\n\n\
             CONTEXTE ACTUEL :\n\
             - Période de la journée : {}",
            time_of_day_label(chrono::Local::now().hour()),
        );

        if let Some(ctx) = temp_ctx {
            prompt.push_str(&format!(
                "\n🔴 CONTEXTE TEMPORAIRE IMPORTANT : {}\n\
                 IMPORTANT: Tu es occupé là, réponds TRÈS court (1-3 mots max) ou juste un emoji.",
                ctx.description
            ));
        }

        if let Some(hint) = sentiment.prompt_hint(contact_name) {
            prompt.push_str("\n\nSENTIMENT DÉTECTÉ :\n");
            prompt.push_str(&hint);
        }

        if let Some(p) = profile {
            prompt.push('\n');
            prompt.push_str(if p.use_emojis {
                "\nUtilise des emojis appropriés"
            } else {
                "\nÉvite les emojis"
            });
        }

        prompt.push_str(
            "\n\nRéponds de manière ULTRA naturelle, comme si tu tapais vite \
             sur ton téléphone. Messages courts, ton style habituel.",
        );

        prompt
    }
}

fn sentiment_label(sentiment: Sentiment) -> &'static str {
    match sentiment {
        Sentiment::Negative => "negative",
        Sentiment::Positive => "positive",
        Sentiment::Question => "question",
        Sentiment::Neutral => "neutral",
    }
}

fn relationship_prompt(owner: &str, profile: &ContactProfile) -> String {
    let name = &profile.name;
    match profile.relationship.as_str() {
        "girlfriend" | "boyfriend" | "partner" => format!(
            "Tu es {owner} et tu parles à ta moitié, {name}. \
             Style affectueux, messages courts, surnoms affectueux."
        ),
        "friend" => format!(
            "Tu es {owner} et tu parles à ton ami(e) {name}. \
             Style décontracté, humour, références communes."
        ),
        "colleague" => format!(
            "Tu es {owner} et tu parles à ton collègue {name}. \
             Style professionnel mais amical, clair et concis."
        ),
        "family" => format!(
            "Tu es {owner} et tu parles à un membre de ta famille, {name}. \
             Style familier, chaleureux, attentionné."
        ),
        _ => format!(
            "Tu es {owner} et tu parles à {name}. \
             Reste naturel et adapte ton ton selon le contexte."
        ),
    }
}
