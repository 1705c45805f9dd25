//! Typo-correction oracle over the OpenAI-compatible API.
//!
//! Asks a small model, in structured-JSON mode, whether an outgoing message
//! contains genuine typos. The caller applies its own confidence and
//! exclusion rules on the returned verdict.

use async_trait::async_trait;
use sosie_core::{
    error::SosieError,
    message::MessageRecord,
    traits::{CorrectionVerdict, Corrector},
};
use tracing::debug;

use crate::openai::{post_chat, ChatCompletionRequest, ChatMessage, ResponseFormat};

/// Correction judge backed by an OpenAI-compatible endpoint.
pub struct OpenAiCorrector {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiCorrector {
    pub fn from_config(base_url: String, api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
            model,
        }
    }
}

const JUDGE_PROMPT: &str = "\
Tu es un correcteur pour messages WhatsApp.
RÈGLES:
- Corrige UNIQUEMENT les vraies fautes de frappe
- NE JAMAIS traduire ou changer la langue du message
- Garde le style SMS et les abréviations volontaires (tkt, jsp, mdr, lol, wdyt, etc)
- Ne touche pas aux expressions familières (bah, oué, du coup)

Réponds UNIQUEMENT avec un JSON de ce format exact:
{
  \"hasTypos\": true/false,
  \"correctedText\": \"texte corrigé, ou texte original si pas de fautes\",
  \"confidence\": 0-100
}";

/// Render recent history into the context block the judge sees.
fn context_block(history: &[MessageRecord]) -> String {
    if history.is_empty() {
        return String::new();
    }
    let mut block = String::from("\n\nCONTEXTE DE LA CONVERSATION:\n");
    for record in history {
        let who = if record.from_me { "Moi" } else { "Contact" };
        block.push_str(&format!("{who}: {}\n", record.text));
    }
    block
}

#[async_trait]
impl Corrector for OpenAiCorrector {
    async fn judge(
        &self,
        text: &str,
        history: &[MessageRecord],
    ) -> Result<CorrectionVerdict, SosieError> {
        debug!("corrector: judging {:?}", text);

        let system = format!("{JUDGE_PROMPT}{}", context_block(history));
        let body = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".into(),
                    content: system,
                },
                ChatMessage {
                    role: "user".into(),
                    content: text.to_string(),
                },
            ],
            temperature: Some(0.1),
            max_tokens: Some(200),
            response_format: Some(ResponseFormat {
                kind: "json_object",
            }),
        };

        let parsed = post_chat(&self.client, &self.base_url, &self.api_key, &body).await?;

        let content = parsed
            .choices
            .as_ref()
            .and_then(|c| c.first())
            .and_then(|c| c.message.as_ref())
            .map(|m| m.content.as_str())
            .ok_or_else(|| SosieError::Provider("corrector: empty response".into()))?;

        let verdict: CorrectionVerdict = serde_json::from_str(content)
            .map_err(|e| SosieError::Provider(format!("corrector: malformed verdict: {e}")))?;

        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_context_block_empty_history() {
        assert!(context_block(&[]).is_empty());
    }

    #[test]
    fn test_context_block_labels_speakers() {
        let history = vec![
            MessageRecord {
                from_me: false,
                text: "tu viens ce soir?".into(),
                timestamp: Utc::now(),
            },
            MessageRecord {
                from_me: true,
                text: "oui oui".into(),
                timestamp: Utc::now(),
            },
        ];
        let block = context_block(&history);
        assert!(block.contains("Contact: tu viens ce soir?"));
        assert!(block.contains("Moi: oui oui"));
    }

    #[test]
    fn test_verdict_parse_from_judge_output() {
        let content = r#"{"hasTypos":true,"correctedText":"tu fais quoi","confidence":90}"#;
        let verdict: CorrectionVerdict = serde_json::from_str(content).unwrap();
        assert!(verdict.applies_to("tu fai koi", 70));
    }

    #[test]
    fn test_malformed_verdict_is_an_error() {
        let content = "désolé, je ne peux pas";
        assert!(serde_json::from_str::<CorrectionVerdict>(content).is_err());
    }
}
