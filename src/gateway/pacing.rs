//! Per-chat conversational pacing.
//!
//! A chat alternates between two behavioral phases. `Active` answers within
//! seconds, like someone holding their phone; `Busy` answers within minutes,
//! like someone who put it down. A phase lasts for a response count drawn
//! fresh on entry, and any idle gap longer than the reset threshold snaps
//! the chat back to `Active` with zero momentum.
//!
//! This is a business-time state machine: it computes durations, the caller
//! sleeps them. State mutation happens in one serialized section per call,
//! so concurrent handlers for the same chat cannot interleave an increment
//! with a phase transition.

use chrono::{DateTime, Utc};
use rand::Rng;
use sosie_core::{config::PacingConfig, identity};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// Behavioral phase of one chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Active,
    Busy,
}

/// Delay plan for one reply: silent "thinking" first, then the typing
/// indicator for the typing portion.
#[derive(Debug, Clone, Copy)]
pub struct ReplyDelay {
    pub thinking: Duration,
    pub typing: Duration,
}

struct ChatPacing {
    phase: Phase,
    responses_in_phase: u32,
    /// Responses after which the phase flips; drawn on phase entry.
    threshold: u32,
    last_message_at: DateTime<Utc>,
}

impl ChatPacing {
    fn fresh(config: &PacingConfig, rng: &mut impl Rng, now: DateTime<Utc>) -> Self {
        Self {
            phase: Phase::Active,
            responses_in_phase: 0,
            threshold: rng.random_range(config.active_run_min..=config.active_run_max),
            last_message_at: now,
        }
    }
}

/// Plans reply delays for all chats.
pub struct PacingPlanner {
    config: PacingConfig,
    chats: Mutex<HashMap<String, ChatPacing>>,
}

impl PacingPlanner {
    pub fn new(config: PacingConfig) -> Self {
        Self {
            config,
            chats: Mutex::new(HashMap::new()),
        }
    }

    /// Plan the delay for the next response in `raw_chat_id`.
    pub async fn plan(&self, raw_chat_id: &str, planned_len: usize) -> ReplyDelay {
        self.plan_at(raw_chat_id, planned_len, Utc::now()).await
    }

    pub(crate) async fn plan_at(
        &self,
        raw_chat_id: &str,
        planned_len: usize,
        now: DateTime<Utc>,
    ) -> ReplyDelay {
        let chat_id = identity::normalize(raw_chat_id);
        let cfg = &self.config;
        let mut chats = self.chats.lock().await;
        // ThreadRng is created after the last await so the future stays Send.
        let mut rng = rand::rng();

        let state = chats
            .entry(chat_id.clone())
            .or_insert_with(|| ChatPacing::fresh(cfg, &mut rng, now));

        // Long silence clears momentum: whatever phase the chat was in, the
        // next reply looks like a fresh pickup of the phone.
        let idle = now.signed_duration_since(state.last_message_at);
        if idle.num_seconds() > cfg.idle_reset_secs as i64 {
            *state = ChatPacing::fresh(cfg, &mut rng, now);
        }

        let (thinking_ms, typing_ms) = match state.phase {
            Phase::Active => (
                rng.random_range(cfg.active_thinking_min_ms..=cfg.active_thinking_max_ms),
                rng.random_range(cfg.active_typing_min_ms..=cfg.active_typing_max_ms),
            ),
            Phase::Busy => (
                rng.random_range(cfg.busy_thinking_min_ms..=cfg.busy_thinking_max_ms),
                rng.random_range(cfg.busy_typing_min_ms..=cfg.busy_typing_max_ms),
            ),
        };

        state.responses_in_phase += 1;
        if state.responses_in_phase >= state.threshold {
            let (next, run_min, run_max) = match state.phase {
                Phase::Active => (Phase::Busy, cfg.busy_run_min, cfg.busy_run_max),
                Phase::Busy => (Phase::Active, cfg.active_run_min, cfg.active_run_max),
            };
            debug!("chat {chat_id}: phase {:?} -> {next:?}", state.phase);
            state.phase = next;
            state.responses_in_phase = 0;
            state.threshold = rng.random_range(run_min..=run_max);
        }
        state.last_message_at = now;

        // Long replies take longer to "type out", up to a cap.
        let length_ms = (planned_len as u64 * cfg.length_ms_per_char).min(cfg.length_cap_ms);

        ReplyDelay {
            thinking: Duration::from_millis(thinking_ms + length_ms),
            typing: Duration::from_millis(typing_ms),
        }
    }

    /// Phase a chat is currently in, if it has state.
    #[cfg(test)]
    pub(crate) async fn phase_of(&self, raw_chat_id: &str) -> Option<Phase> {
        let chat_id = identity::normalize(raw_chat_id);
        self.chats.lock().await.get(&chat_id).map(|s| s.phase)
    }

    /// Wholesale clear of all per-chat state. Returns the number of chats
    /// dropped.
    pub async fn sweep(&self) -> usize {
        let mut chats = self.chats.lock().await;
        let n = chats.len();
        *chats = HashMap::new();
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    /// Deterministic config: fixed delays, Active lasts exactly 3 responses,
    /// Busy exactly 1.
    fn fixed_config() -> PacingConfig {
        PacingConfig {
            active_thinking_min_ms: 1_000,
            active_thinking_max_ms: 1_000,
            active_typing_min_ms: 100,
            active_typing_max_ms: 100,
            busy_thinking_min_ms: 60_000,
            busy_thinking_max_ms: 60_000,
            busy_typing_min_ms: 200,
            busy_typing_max_ms: 200,
            length_ms_per_char: 30,
            length_cap_ms: 3_000,
            active_run_min: 3,
            active_run_max: 3,
            busy_run_min: 1,
            busy_run_max: 1,
            idle_reset_secs: 600,
            sweep_interval_secs: 7_200,
        }
    }

    const CHAT: &str = "33612345678@c.us";

    #[tokio::test]
    async fn test_active_then_busy_then_active() {
        let planner = PacingPlanner::new(fixed_config());
        let now = Utc::now();

        // Three active responses.
        for _ in 0..3 {
            let d = planner.plan_at(CHAT, 0, now).await;
            assert_eq!(d.thinking, Duration::from_millis(1_000));
        }
        assert_eq!(planner.phase_of(CHAT).await, Some(Phase::Busy));

        // One busy response, then back to active.
        let d = planner.plan_at(CHAT, 0, now).await;
        assert_eq!(d.thinking, Duration::from_millis(60_000));
        assert_eq!(planner.phase_of(CHAT).await, Some(Phase::Active));
    }

    #[tokio::test]
    async fn test_idle_gap_resets_to_active() {
        let planner = PacingPlanner::new(fixed_config());
        let now = Utc::now();

        // Drive the chat into Busy.
        for _ in 0..3 {
            planner.plan_at(CHAT, 0, now).await;
        }
        assert_eq!(planner.phase_of(CHAT).await, Some(Phase::Busy));

        // More than 10 minutes of silence: next delay is an Active one,
        // regardless of the prior phase.
        let later = now + ChronoDuration::minutes(11);
        let d = planner.plan_at(CHAT, 0, later).await;
        assert_eq!(d.thinking, Duration::from_millis(1_000));
    }

    #[tokio::test]
    async fn test_idle_gap_just_under_threshold_keeps_phase() {
        let planner = PacingPlanner::new(fixed_config());
        let now = Utc::now();

        for _ in 0..3 {
            planner.plan_at(CHAT, 0, now).await;
        }
        let later = now + ChronoDuration::minutes(9);
        let d = planner.plan_at(CHAT, 0, later).await;
        assert_eq!(d.thinking, Duration::from_millis(60_000));
    }

    #[tokio::test]
    async fn test_length_component_is_capped() {
        let planner = PacingPlanner::new(fixed_config());
        let now = Utc::now();

        let d = planner.plan_at(CHAT, 10, now).await;
        assert_eq!(d.thinking, Duration::from_millis(1_000 + 300));

        let d = planner.plan_at(CHAT, 100_000, now).await;
        assert_eq!(d.thinking, Duration::from_millis(1_000 + 3_000));
    }

    #[tokio::test]
    async fn test_default_thresholds_flip_within_bounds() {
        let planner = PacingPlanner::new(PacingConfig::default());
        let now = Utc::now();

        let mut flips_at = 0;
        for i in 1..=6 {
            planner.plan_at(CHAT, 0, now).await;
            if planner.phase_of(CHAT).await == Some(Phase::Busy) {
                flips_at = i;
                break;
            }
        }
        // Active persists for 3 to 5 responses.
        assert!(
            (3..=5).contains(&flips_at),
            "phase flipped after {flips_at} responses"
        );
    }

    #[tokio::test]
    async fn test_busy_delay_dominates_active_delay() {
        // With default parameters, the slowest possible Active reply is
        // still faster than the fastest possible Busy reply.
        let cfg = PacingConfig::default();
        assert!(cfg.busy_thinking_min_ms > cfg.active_thinking_max_ms + cfg.length_cap_ms);
    }

    #[tokio::test]
    async fn test_chats_are_paced_independently() {
        let planner = PacingPlanner::new(fixed_config());
        let now = Utc::now();

        for _ in 0..3 {
            planner.plan_at(CHAT, 0, now).await;
        }
        assert_eq!(planner.phase_of(CHAT).await, Some(Phase::Busy));

        // A different chat starts fresh.
        let d = planner.plan_at("33698765432@c.us", 0, now).await;
        assert_eq!(d.thinking, Duration::from_millis(1_000));
    }

    #[tokio::test]
    async fn test_chat_keys_are_identity_normalized() {
        let planner = PacingPlanner::new(fixed_config());
        let now = Utc::now();

        planner.plan_at("33612345678@c.us", 0, now).await;
        // Same chat through a different raw format shares the state.
        planner.plan_at("+33 6 12 34 56 78", 0, now).await;
        planner.plan_at("33612345678@s.whatsapp.net", 0, now).await;
        assert_eq!(planner.phase_of(CHAT).await, Some(Phase::Busy));
    }

    #[tokio::test]
    async fn test_sweep_drops_all_state() {
        let planner = PacingPlanner::new(fixed_config());
        planner.plan_at(CHAT, 0, Utc::now()).await;
        assert_eq!(planner.sweep().await, 1);
        assert_eq!(planner.phase_of(CHAT).await, None);
    }
}
