//! Gateway — the event loop connecting the transport, the oracles, the
//! store, and the pacing machinery.
//!
//! One task per message event; the catch-all boundary in `dispatch` makes
//! sure a failing handler excuses itself to the contact and never takes the
//! loop down.

mod autocorrect;
mod dedup;
mod pacing;
mod pipeline;
mod reply;


pub(crate) use dedup::{ReplyTagSet, SeenSet};
pub(crate) use pacing::PacingPlanner;

use rand::prelude::IndexedRandom;
use sosie_core::{
    config::Config,
    error::SosieError,
    message::MessageEvent,
    runtime::RuntimeState,
    traits::{Channel, Corrector, Provider},
};
use sosie_memory::Store;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Dedup set capacity — far above anything a personal account produces
/// between two sweeps.
const DEDUP_CAPACITY: usize = 4096;

/// Reply tag capacity — bounds in-flight bot-authored message markers.
const TAG_CAPACITY: usize = 1024;

/// The central gateway.
pub struct Gateway {
    pub(crate) provider: Arc<dyn Provider>,
    pub(crate) corrector: Arc<dyn Corrector>,
    pub(crate) channel: Arc<dyn Channel>,
    pub(crate) store: Store,
    pub(crate) runtime: Arc<RuntimeState>,
    pub(crate) config: Config,
    pub(crate) dedup: SeenSet,
    pub(crate) tags: ReplyTagSet,
    pub(crate) pacing: PacingPlanner,
    pub(crate) uptime: Instant,
}

impl Gateway {
    pub fn new(
        provider: Arc<dyn Provider>,
        corrector: Arc<dyn Corrector>,
        channel: Arc<dyn Channel>,
        store: Store,
        runtime: Arc<RuntimeState>,
        config: Config,
    ) -> Self {
        let pacing = PacingPlanner::new(config.pacing.clone());
        Self {
            provider,
            corrector,
            channel,
            store,
            runtime,
            config,
            dedup: SeenSet::new(DEDUP_CAPACITY),
            tags: ReplyTagSet::new(TAG_CAPACITY),
            pacing,
            uptime: Instant::now(),
        }
    }

    /// Run the main event loop until ctrl-c.
    pub async fn run(self: Arc<Self>) -> anyhow::Result<()> {
        info!(
            "sosie gateway running | provider: {} | channel: {} | paused: {}",
            self.provider.name(),
            self.channel.name(),
            self.runtime.is_paused(),
        );

        let mut rx = self
            .channel
            .start()
            .await
            .map_err(|e| anyhow::anyhow!("failed to start channel: {e}"))?;

        // Periodic sweep of dedup set, reply tags, and pacing state.
        let sweeper = self.clone();
        let sweep_interval = Duration::from_secs(self.config.pacing.sweep_interval_secs);
        let sweep_handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_interval);
            ticker.tick().await; // immediate first tick
            loop {
                ticker.tick().await;
                let dropped_ids = sweeper.dedup.sweep().await;
                let dropped_tags = sweeper.tags.sweep().await;
                let dropped_chats = sweeper.pacing.sweep().await;
                info!(
                    "sweep: {dropped_ids} seen ids, {dropped_tags} tags, {dropped_chats} chat states cleared"
                );
            }
        });

        // Control API.
        let api_handle = if self.config.api.enabled {
            let api_config = self.config.api.clone();
            let api_state = crate::api::ApiState {
                runtime: self.runtime.clone(),
                store: self.store.clone(),
                uptime: self.uptime,
                api_key: (!api_config.api_key.is_empty()).then(|| api_config.api_key.clone()),
                context_ttl_minutes: self.config.commands.context_ttl_minutes,
            };
            Some(tokio::spawn(async move {
                crate::api::serve(api_config, api_state).await;
            }))
        } else {
            None
        };

        loop {
            tokio::select! {
                Some(event) = rx.recv() => {
                    let gw = self.clone();
                    tokio::spawn(async move {
                        gw.dispatch(event).await;
                    });
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("received shutdown signal");
                    break;
                }
            }
        }

        self.shutdown(sweep_handle, api_handle).await;
        Ok(())
    }

    /// Per-message catch-all boundary.
    ///
    /// A failed inbound handler sends one excuse so the persona's failure
    /// mode stays "my phone glitched", never a stack trace. Outbound
    /// failures are internal only.
    async fn dispatch(self: Arc<Self>, event: MessageEvent) {
        if let Err(e) = self.handle_event(&event).await {
            error!("message handling failed: {e}");
            if event.is_inbound() && !event.is_group {
                let excuse = self.pick_excuse();
                if let Err(send_err) = self.send_tagged(&event.raw_chat_id, &excuse).await {
                    warn!("failed to send excuse: {send_err}");
                }
            }
        }
    }

    /// Send a bot-authored message and tag it so the auto-correction engine
    /// leaves it alone when it comes back as an outgoing event.
    pub(crate) async fn send_tagged(
        &self,
        raw_chat_id: &str,
        text: &str,
    ) -> Result<(), SosieError> {
        let sent = self.channel.send_text(raw_chat_id, text).await?;
        self.tags.tag(&sent.message_id).await;
        Ok(())
    }

    pub(crate) fn pick_excuse(&self) -> String {
        let mut rng = rand::rng();
        self.config
            .agent
            .excuses
            .choose(&mut rng)
            .cloned()
            .unwrap_or_else(|| "mon tel beugue".to_string())
    }

    async fn shutdown(
        &self,
        sweep_handle: tokio::task::JoinHandle<()>,
        api_handle: Option<tokio::task::JoinHandle<()>>,
    ) {
        info!("shutting down...");

        sweep_handle.abort();
        if let Some(h) = api_handle {
            h.abort();
        }

        // Persist the runtime posture for the next start.
        if let Err(e) = self.store.save_flags(&self.runtime.flags().await).await {
            warn!("failed to persist runtime flags: {e}");
        }

        if let Err(e) = self.channel.stop().await {
            warn!("failed to stop channel: {e}");
        }

        info!("shutdown complete");
    }
}
