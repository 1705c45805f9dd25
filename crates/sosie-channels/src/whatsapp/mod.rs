//! WhatsApp transport — pure Rust implementation via `whatsapp-rust`.
//!
//! Uses the WhatsApp Web protocol (Noise handshake + Signal encryption).
//! Pairing is done by scanning a QR code, like WhatsApp Web. Session state
//! is persisted to `{data_dir}/whatsapp_session/whatsapp.db`.
//!
//! Unlike a notification bot, the persona needs *both* directions of every
//! 1:1 conversation: inbound messages feed the auto-reply path, and the
//! owner's own outbound messages feed the auto-correction path. Events are
//! therefore forwarded unfiltered, with a direction tag, and it is the
//! gateway's job to deduplicate and route them.

mod bot;
mod channel;
mod events;
mod qr;
mod send;

#[cfg(test)]
mod tests;

pub use qr::{generate_qr_terminal, start_pairing};

use sosie_core::message::MessageEvent;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// WhatsApp transport using the WhatsApp Web protocol.
pub struct WhatsAppTransport {
    pub(super) data_dir: String,
    /// Client handle for sending — set once the connection is up.
    pub(super) client: Arc<Mutex<Option<Arc<whatsapp_rust::client::Client>>>>,
    /// Event sender — kept so a reconnect can reuse it.
    pub(super) msg_tx: Arc<Mutex<Option<mpsc::Sender<MessageEvent>>>>,
}

impl WhatsAppTransport {
    /// Create a new transport rooted at `data_dir`.
    pub fn new(data_dir: &str) -> Self {
        Self {
            data_dir: data_dir.to_string(),
            client: Arc::new(Mutex::new(None)),
            msg_tx: Arc::new(Mutex::new(None)),
        }
    }

    /// Whether the WhatsApp client is currently connected.
    pub async fn is_connected(&self) -> bool {
        self.client.lock().await.is_some()
    }

    /// Path of the session database.
    pub(super) fn session_db_path(&self) -> String {
        let dir = sosie_core::config::shellexpand(&self.data_dir);
        let session_dir = format!("{dir}/whatsapp_session");
        let _ = std::fs::create_dir_all(&session_dir);
        format!("{session_dir}/whatsapp.db")
    }
}
