//! Shared runtime state: pause flag, auto-correction flag, temporary context.
//!
//! Owned by the gateway and injected into every component that needs it, so
//! tests can run isolated instances. Writes come only from the command
//! surface and the control API; reads happen on every message.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

/// A time-boxed free-text override injected into the reply prompt.
///
/// Single slot, not per-chat. Expires automatically and is never silently
/// extended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemporaryContext {
    pub description: String,
    pub set_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Delay floor in seconds, sampled by the caller within `(min, max)`.
pub type DelayFloor = (u64, u64);

const DRIVING_KW: &[&str] = &["conduis", "voiture", "route", "driving", "car"];
const MEETING_KW: &[&str] = &["réunion", "meeting", "rendez-vous", "rdv"];
const CINEMA_KW: &[&str] = &["ciné", "cinéma", "film", "cinema", "movie"];

impl TemporaryContext {
    pub fn new(description: impl Into<String>, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            description: description.into(),
            set_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Minimum-delay range implied by the context description.
    ///
    /// Someone supposedly driving or sitting in a cinema does not answer in
    /// four seconds — the range is a *floor* on the computed delay, never a
    /// ceiling on it.
    pub fn delay_floor(&self) -> Option<DelayFloor> {
        let desc = self.description.to_lowercase();
        if CINEMA_KW.iter().any(|kw| desc.contains(kw)) {
            return Some((300, 600));
        }
        if DRIVING_KW.iter().any(|kw| desc.contains(kw)) {
            return Some((120, 300));
        }
        if MEETING_KW.iter().any(|kw| desc.contains(kw)) {
            return Some((60, 180));
        }
        None
    }
}

/// Persisted snapshot of the runtime flags, restored at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeFlags {
    pub paused: bool,
    pub autocorrect_enabled: bool,
    pub temporary_context: Option<TemporaryContext>,
}

/// Live runtime state shared across the gateway.
///
/// Flags are atomics (read-mostly, unsynchronized reads are fine); the
/// context slot is a mutex because it holds a string.
#[derive(Debug)]
pub struct RuntimeState {
    paused: AtomicBool,
    autocorrect: AtomicBool,
    context: Mutex<Option<TemporaryContext>>,
}

impl Default for RuntimeState {
    fn default() -> Self {
        Self {
            paused: AtomicBool::new(false),
            autocorrect: AtomicBool::new(true),
            context: Mutex::new(None),
        }
    }
}

impl RuntimeState {
    pub fn from_flags(flags: &RuntimeFlags) -> Self {
        Self {
            paused: AtomicBool::new(flags.paused),
            autocorrect: AtomicBool::new(flags.autocorrect_enabled),
            context: Mutex::new(flags.temporary_context.clone()),
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Relaxed);
    }

    pub fn autocorrect_enabled(&self) -> bool {
        self.autocorrect.load(Ordering::Relaxed)
    }

    pub fn set_autocorrect(&self, enabled: bool) {
        self.autocorrect.store(enabled, Ordering::Relaxed);
    }

    /// Current temporary context, if set and not expired.
    ///
    /// An expired context is dropped from the slot on read.
    pub async fn active_context(&self) -> Option<TemporaryContext> {
        let mut slot = self.context.lock().await;
        match slot.as_ref() {
            Some(ctx) if ctx.is_active(Utc::now()) => Some(ctx.clone()),
            Some(_) => {
                *slot = None;
                None
            }
            None => None,
        }
    }

    pub async fn set_context(&self, ctx: TemporaryContext) {
        *self.context.lock().await = Some(ctx);
    }

    pub async fn clear_context(&self) {
        *self.context.lock().await = None;
    }

    /// Snapshot for persistence.
    pub async fn flags(&self) -> RuntimeFlags {
        RuntimeFlags {
            paused: self.is_paused(),
            autocorrect_enabled: self.autocorrect_enabled(),
            temporary_context: self.context.lock().await.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_state() {
        let state = RuntimeState::default();
        assert!(!state.is_paused());
        assert!(state.autocorrect_enabled());
        assert!(state.active_context().await.is_none());
    }

    #[tokio::test]
    async fn test_context_expiry_clears_slot() {
        let state = RuntimeState::default();
        let mut ctx = TemporaryContext::new("je conduis", Duration::minutes(30));
        ctx.expires_at = Utc::now() - Duration::seconds(1);
        state.set_context(ctx).await;
        assert!(state.active_context().await.is_none());
        // Slot was cleared, not just filtered.
        assert!(state.flags().await.temporary_context.is_none());
    }

    #[tokio::test]
    async fn test_flags_round_trip() {
        let state = RuntimeState::default();
        state.set_paused(true);
        state.set_autocorrect(false);
        state
            .set_context(TemporaryContext::new("au ciné", Duration::minutes(30)))
            .await;

        let flags = state.flags().await;
        let restored = RuntimeState::from_flags(&flags);
        assert!(restored.is_paused());
        assert!(!restored.autocorrect_enabled());
        assert!(restored.active_context().await.is_some());
    }

    #[test]
    fn test_delay_floor_driving() {
        let ctx = TemporaryContext::new("je conduis là", Duration::minutes(30));
        assert_eq!(ctx.delay_floor(), Some((120, 300)));
    }

    #[test]
    fn test_delay_floor_cinema_wins_over_meeting() {
        let ctx = TemporaryContext::new("ciné puis réunion", Duration::minutes(30));
        assert_eq!(ctx.delay_floor(), Some((300, 600)));
    }

    #[test]
    fn test_delay_floor_none_for_plain_context() {
        let ctx = TemporaryContext::new("au bar avec Vincent", Duration::minutes(30));
        assert_eq!(ctx.delay_floor(), None);
    }
}
