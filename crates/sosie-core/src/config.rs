use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::SosieError;

/// Top-level Sosie configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub pacing: PacingConfig,
    #[serde(default)]
    pub correction: CorrectionConfig,
    #[serde(default)]
    pub commands: CommandConfig,
}

/// Persona and general agent settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// First name the persona answers as.
    #[serde(default = "default_owner_name")]
    pub owner_name: String,
    /// The owner's own phone number — used to recognize self-addressed
    /// messages (the admin command channel). Any format; matched loosely.
    #[serde(default)]
    pub owner_number: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Reply to contacts without a configured profile?
    #[serde(default)]
    pub default_enabled: bool,
    /// Excuse pool for user-visible failure messages.
    #[serde(default = "default_excuses")]
    pub excuses: Vec<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            owner_name: default_owner_name(),
            owner_number: String::new(),
            data_dir: default_data_dir(),
            default_enabled: false,
            excuses: default_excuses(),
        }
    }
}

/// Completion/correction oracle configuration (OpenAI-compatible API).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    /// Model for persona auto-replies.
    #[serde(default = "default_reply_model")]
    pub reply_model: String,
    /// Model for direct assistant queries.
    #[serde(default = "default_assistant_model")]
    pub assistant_model: String,
    /// Model for typo-correction judgments.
    #[serde(default = "default_correction_model")]
    pub correction_model: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            reply_model: default_reply_model(),
            assistant_model: default_assistant_model(),
            correction_model: default_correction_model(),
        }
    }
}

/// Channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChannelConfig {
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,
}

/// WhatsApp transport config.
///
/// Session data is stored at `{data_dir}/whatsapp_session/`. Pairing is done
/// by scanning a QR code (like WhatsApp Web).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Memory config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// History window injected into reply prompts.
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    /// Rolling log cap per chat.
    #[serde(default = "default_log_cap")]
    pub log_cap_per_chat: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            history_window: default_history_window(),
            log_cap_per_chat: default_log_cap(),
        }
    }
}

/// Control API config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_api_host")]
    pub host: String,
    #[serde(default = "default_api_port")]
    pub port: u16,
    /// Bearer token. Empty = no auth (local use only).
    #[serde(default)]
    pub api_key: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: default_api_host(),
            port: default_api_port(),
            api_key: String::new(),
        }
    }
}

/// Conversational pacing parameters (all durations in milliseconds).
///
/// The Busy thinking minimum must stay above the Active maximum plus the
/// length cap, so a "busy" reply can never look faster than an "active" one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingConfig {
    #[serde(default = "default_active_thinking_min")]
    pub active_thinking_min_ms: u64,
    #[serde(default = "default_active_thinking_max")]
    pub active_thinking_max_ms: u64,
    #[serde(default = "default_active_typing_min")]
    pub active_typing_min_ms: u64,
    #[serde(default = "default_active_typing_max")]
    pub active_typing_max_ms: u64,
    #[serde(default = "default_busy_thinking_min")]
    pub busy_thinking_min_ms: u64,
    #[serde(default = "default_busy_thinking_max")]
    pub busy_thinking_max_ms: u64,
    #[serde(default = "default_busy_typing_min")]
    pub busy_typing_min_ms: u64,
    #[serde(default = "default_busy_typing_max")]
    pub busy_typing_max_ms: u64,
    /// Extra thinking time per planned character.
    #[serde(default = "default_length_ms_per_char")]
    pub length_ms_per_char: u64,
    #[serde(default = "default_length_cap_ms")]
    pub length_cap_ms: u64,
    /// Responses spent in Active before going Busy: drawn from this range.
    #[serde(default = "default_active_run_min")]
    pub active_run_min: u32,
    #[serde(default = "default_active_run_max")]
    pub active_run_max: u32,
    /// Responses spent in Busy before returning to Active.
    #[serde(default = "default_busy_run_min")]
    pub busy_run_min: u32,
    #[serde(default = "default_busy_run_max")]
    pub busy_run_max: u32,
    /// Idle gap after which a chat's momentum resets.
    #[serde(default = "default_idle_reset_secs")]
    pub idle_reset_secs: u64,
    /// Wholesale sweep of per-chat state, dedup set, and reply tags.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            active_thinking_min_ms: default_active_thinking_min(),
            active_thinking_max_ms: default_active_thinking_max(),
            active_typing_min_ms: default_active_typing_min(),
            active_typing_max_ms: default_active_typing_max(),
            busy_thinking_min_ms: default_busy_thinking_min(),
            busy_thinking_max_ms: default_busy_thinking_max(),
            busy_typing_min_ms: default_busy_typing_min(),
            busy_typing_max_ms: default_busy_typing_max(),
            length_ms_per_char: default_length_ms_per_char(),
            length_cap_ms: default_length_cap_ms(),
            active_run_min: default_active_run_min(),
            active_run_max: default_active_run_max(),
            busy_run_min: default_busy_run_min(),
            busy_run_max: default_busy_run_max(),
            idle_reset_secs: default_idle_reset_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

/// Auto-correction config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectionConfig {
    /// Confidence the oracle must exceed (strictly) for a correction to apply.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: u8,
    /// Transport edit window — edits older than this are not attempted.
    #[serde(default = "default_edit_window_secs")]
    pub edit_window_secs: u64,
    /// Preceding messages given to the oracle as context.
    #[serde(default = "default_correction_context")]
    pub context_messages: usize,
    /// Messages shorter than this are never analyzed.
    #[serde(default = "default_correction_min_chars")]
    pub min_chars: usize,
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            min_confidence: default_min_confidence(),
            edit_window_secs: default_edit_window_secs(),
            context_messages: default_correction_context(),
            min_chars: default_correction_min_chars(),
        }
    }
}

/// Reserved command prefixes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandConfig {
    /// Direct assistant query trigger (works in any chat, both directions).
    #[serde(default = "default_assistant_prefix")]
    pub assistant_prefix: String,
    /// Administrative command prefix.
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
    /// Default TTL for `context` set through commands.
    #[serde(default = "default_context_ttl_minutes")]
    pub context_ttl_minutes: i64,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            assistant_prefix: default_assistant_prefix(),
            command_prefix: default_command_prefix(),
            context_ttl_minutes: default_context_ttl_minutes(),
        }
    }
}

// --- Default value functions ---

fn default_owner_name() -> String {
    "Nicolas".to_string()
}
fn default_data_dir() -> String {
    "~/.sosie".to_string()
}
fn default_excuses() -> Vec<String> {
    vec![
        "Désolé, mon téléphone bug un peu là".into(),
        "mon tel beugue".into(),
        "pardon je capte super mal".into(),
    ]
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_reply_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_assistant_model() -> String {
    "gpt-4o".to_string()
}
fn default_correction_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_true() -> bool {
    true
}
fn default_db_path() -> String {
    "~/.sosie/sosie.db".to_string()
}
fn default_history_window() -> usize {
    10
}
fn default_log_cap() -> usize {
    50
}
fn default_api_host() -> String {
    "127.0.0.1".to_string()
}
fn default_api_port() -> u16 {
    3920
}
fn default_active_thinking_min() -> u64 {
    3_000
}
fn default_active_thinking_max() -> u64 {
    8_000
}
fn default_active_typing_min() -> u64 {
    1_000
}
fn default_active_typing_max() -> u64 {
    3_000
}
fn default_busy_thinking_min() -> u64 {
    60_000
}
fn default_busy_thinking_max() -> u64 {
    300_000
}
fn default_busy_typing_min() -> u64 {
    2_000
}
fn default_busy_typing_max() -> u64 {
    5_000
}
fn default_length_ms_per_char() -> u64 {
    30
}
fn default_length_cap_ms() -> u64 {
    3_000
}
fn default_active_run_min() -> u32 {
    3
}
fn default_active_run_max() -> u32 {
    5
}
fn default_busy_run_min() -> u32 {
    1
}
fn default_busy_run_max() -> u32 {
    2
}
fn default_idle_reset_secs() -> u64 {
    600
}
fn default_sweep_interval_secs() -> u64 {
    7_200
}
fn default_min_confidence() -> u8 {
    70
}
fn default_edit_window_secs() -> u64 {
    900
}
fn default_correction_context() -> usize {
    5
}
fn default_correction_min_chars() -> usize {
    6
}
fn default_assistant_prefix() -> String {
    "paf".to_string()
}
fn default_command_prefix() -> String {
    "bot".to_string()
}
fn default_context_ttl_minutes() -> i64 {
    30
}

/// Expand `~` to the home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file does not exist.
pub fn load(path: &str) -> Result<Config, SosieError> {
    let path = Path::new(path);
    if !path.exists() {
        tracing::info!("Config file not found at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| SosieError::Config(format!("failed to read {}: {e}", path.display())))?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| SosieError::Config(format!("failed to parse config: {e}")))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        let cfg = Config::default();
        assert_eq!(cfg.correction.min_confidence, 70);
        assert_eq!(cfg.correction.edit_window_secs, 900);
        assert_eq!(cfg.pacing.idle_reset_secs, 600);
        assert_eq!(cfg.commands.assistant_prefix, "paf");
        assert!(!cfg.agent.default_enabled);
        assert!(!cfg.agent.excuses.is_empty());
    }

    #[test]
    fn test_busy_floor_above_active_ceiling() {
        // The pacing invariant the whole phase machine leans on.
        let p = PacingConfig::default();
        assert!(p.busy_thinking_min_ms > p.active_thinking_max_ms + p.length_cap_ms);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [agent]
            owner_name = "Nico"
            owner_number = "+33612345678"

            [provider]
            api_key = "sk-test"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.agent.owner_name, "Nico");
        assert_eq!(cfg.provider.api_key, "sk-test");
        assert_eq!(cfg.provider.reply_model, "gpt-4o-mini");
        assert!(cfg.channel.whatsapp.enabled);
        assert_eq!(cfg.pacing.active_run_min, 3);
    }

    #[test]
    fn test_pacing_overrides_from_toml() {
        let p: PacingConfig = toml::from_str(
            r#"
            busy_thinking_min_ms = 30000
            active_run_min = 2
            active_run_max = 2
            "#,
        )
        .unwrap();
        assert_eq!(p.busy_thinking_min_ms, 30_000);
        assert_eq!(p.active_run_min, 2);
        assert_eq!(p.busy_run_max, 2);
    }

    #[test]
    fn test_shellexpand() {
        std::env::set_var("HOME", "/home/test");
        assert_eq!(shellexpand("~/x/y"), "/home/test/x/y");
        assert_eq!(shellexpand("/abs/path"), "/abs/path");
    }
}
