//! OpenAI-compatible API provider.
//!
//! Works with OpenAI's API and any compatible endpoint. The request types
//! are `pub(crate)` and reused by the correction oracle.

use async_trait::async_trait;
use sosie_core::{
    context::{ApiMessage, Context},
    error::SosieError,
    message::Completion,
    traits::Provider,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

/// OpenAI-compatible completion provider.
pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiProvider {
    /// Create from config values. `model` is the default; `Context::model`
    /// overrides it per call.
    pub fn from_config(base_url: String, api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
            model,
        }
    }
}

/// Build OpenAI-format messages (system as a leading message role).
pub(crate) fn build_messages(system: &str, api_messages: &[ApiMessage]) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(api_messages.len() + 1);
    if !system.is_empty() {
        messages.push(ChatMessage {
            role: "system".to_string(),
            content: system.to_string(),
        });
    }
    for m in api_messages {
        messages.push(ChatMessage {
            role: m.role.clone(),
            content: m.content.clone(),
        });
    }
    messages
}

#[derive(Serialize, Deserialize, Clone)]
pub(crate) struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Serialize)]
pub(crate) struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

/// `{"type": "json_object"}` forces structured-JSON responses.
#[derive(Serialize)]
pub(crate) struct ResponseFormat {
    #[serde(rename = "type")]
    pub kind: &'static str,
}

#[derive(Deserialize)]
pub(crate) struct ChatCompletionResponse {
    pub choices: Option<Vec<ChatChoice>>,
    pub model: Option<String>,
    pub usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
pub(crate) struct ChatChoice {
    pub message: Option<ChatMessage>,
}

#[derive(Deserialize)]
pub(crate) struct ChatUsage {
    pub total_tokens: Option<u64>,
}

pub(crate) async fn post_chat(
    client: &reqwest::Client,
    base_url: &str,
    api_key: &str,
    body: &ChatCompletionRequest,
) -> Result<ChatCompletionResponse, SosieError> {
    let url = format!("{}/chat/completions", base_url.trim_end_matches('/'));
    debug!("openai: POST {url} model={}", body.model);

    let resp = client
        .post(&url)
        .header("Authorization", format!("Bearer {api_key}"))
        .json(body)
        .send()
        .await
        .map_err(|e| SosieError::Provider(format!("openai request failed: {e}")))?;

    if !resp.status().is_success() {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        return Err(SosieError::Provider(format!(
            "openai returned {status}: {text}"
        )));
    }

    resp.json()
        .await
        .map_err(|e| SosieError::Provider(format!("openai: failed to parse response: {e}")))
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn requires_api_key(&self) -> bool {
        true
    }

    async fn complete(&self, context: &Context) -> Result<Completion, SosieError> {
        let (system, api_messages) = context.to_api_messages();
        let effective_model = context.model.as_deref().unwrap_or(&self.model);
        let start = Instant::now();

        let body = ChatCompletionRequest {
            model: effective_model.to_string(),
            messages: build_messages(&system, &api_messages),
            temperature: context.temperature,
            max_tokens: context.max_tokens,
            response_format: None,
        };

        let parsed = post_chat(&self.client, &self.base_url, &self.api_key, &body).await?;

        let text = parsed
            .choices
            .as_ref()
            .and_then(|c| c.first())
            .and_then(|c| c.message.as_ref())
            .map(|m| m.content.clone())
            .ok_or_else(|| SosieError::Provider("openai: empty completion".into()))?;

        let tokens = parsed.usage.as_ref().and_then(|u| u.total_tokens);
        let elapsed_ms = start.elapsed().as_millis() as u64;

        Ok(Completion {
            text,
            model: parsed.model,
            tokens_used: tokens,
            processing_time_ms: elapsed_ms,
        })
    }

    async fn is_available(&self) -> bool {
        if self.api_key.is_empty() {
            warn!("openai: no API key configured");
            return false;
        }
        let url = format!("{}/models", self.base_url.trim_end_matches('/'));
        match self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                warn!("openai not available: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_name() {
        let p = OpenAiProvider::from_config(
            "https://api.openai.com/v1".into(),
            "sk-test".into(),
            "gpt-4o-mini".into(),
        );
        assert_eq!(p.name(), "openai");
        assert!(p.requires_api_key());
    }

    #[test]
    fn test_build_messages() {
        let api_msgs = vec![
            ApiMessage {
                role: "user".into(),
                content: "salut".into(),
            },
            ApiMessage {
                role: "assistant".into(),
                content: "hey".into(),
            },
        ];
        let messages = build_messages("Tu es Nicolas.", &api_msgs);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[2].role, "assistant");
    }

    #[test]
    fn test_build_messages_empty_system() {
        let api_msgs = vec![ApiMessage {
            role: "user".into(),
            content: "salut".into(),
        }];
        let messages = build_messages("", &api_msgs);
        assert_eq!(messages.len(), 1);
    }

    #[test]
    fn test_request_serialization_omits_unset_fields() {
        let body = ChatCompletionRequest {
            model: "gpt-4o-mini".into(),
            messages: vec![],
            temperature: Some(0.9),
            max_tokens: None,
            response_format: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["temperature"], 0.9);
        assert!(json.get("max_tokens").is_none());
        assert!(json.get("response_format").is_none());
    }

    #[test]
    fn test_response_parsing() {
        let json = r#"{"choices":[{"message":{"role":"assistant","content":"oui et toi"},"finish_reason":"stop"}],"model":"gpt-4o-mini","usage":{"total_tokens":42}}"#;
        let resp: ChatCompletionResponse = serde_json::from_str(json).unwrap();
        let text = resp
            .choices
            .as_ref()
            .and_then(|c| c.first())
            .and_then(|c| c.message.as_ref())
            .map(|m| m.content.clone());
        assert_eq!(text, Some("oui et toi".into()));
    }
}
