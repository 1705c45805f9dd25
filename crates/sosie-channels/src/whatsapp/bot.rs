//! Bot lifecycle — building and running the WhatsApp connection.

use super::events::handle_whatsapp_message;
use super::qr::generate_qr_terminal;
use super::WhatsAppTransport;
use crate::session::WaSessionStore;
use sosie_core::{error::SosieError, message::MessageEvent};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use wacore::types::events::Event;
use whatsapp_rust::bot::Bot;
use whatsapp_rust_tokio_transport::TokioWebSocketTransportFactory;
use whatsapp_rust_ureq_http_client::UreqHttpClient;

impl WhatsAppTransport {
    /// Build the WhatsApp bot with the event handler and run it in the
    /// background. QR codes are rendered to the terminal when the session
    /// needs (re)pairing.
    pub(super) async fn build_and_run_bot(
        &self,
        tx: mpsc::Sender<MessageEvent>,
    ) -> Result<(), SosieError> {
        let db_path = self.session_db_path();
        info!("whatsapp bot building (session: {db_path})...");

        let backend = Arc::new(
            WaSessionStore::new(&db_path)
                .await
                .map_err(|e| SosieError::Channel(format!("whatsapp session store init failed: {e}")))?,
        );

        let tx_events = tx;
        let client_handle = self.client.clone();

        let mut bot = Bot::builder()
            .with_backend(backend)
            .with_transport_factory(TokioWebSocketTransportFactory::new())
            .with_http_client(UreqHttpClient::new())
            .with_device_props(
                Some("SOSIE".to_string()),
                None,
                Some(waproto::whatsapp::device_props::PlatformType::Desktop),
            )
            .on_event(move |event, client| {
                let tx = tx_events.clone();
                let client_store = client_handle.clone();
                async move {
                    match event {
                        Event::PairingQrCode { code, .. } => {
                            info!("whatsapp QR code generated — scan to pair:");
                            match generate_qr_terminal(&code) {
                                Ok(rendered) => println!("{rendered}"),
                                Err(e) => warn!("QR rendering failed: {e}"),
                            }
                        }
                        Event::PairSuccess(_) => {
                            info!("whatsapp pairing successful");
                        }
                        Event::Connected(_) => {
                            info!("whatsapp connected");
                            *client_store.lock().await = Some(client);
                        }
                        Event::Disconnected(_) => {
                            warn!("whatsapp disconnected");
                            *client_store.lock().await = None;
                        }
                        Event::LoggedOut(_) => {
                            warn!("whatsapp logged out, session invalidated");
                            *client_store.lock().await = None;
                        }
                        Event::Message(msg, msg_info) => {
                            handle_whatsapp_message(*msg, msg_info, &tx).await;
                        }
                        _ => {}
                    }
                }
            })
            .build()
            .await
            .map_err(|e| SosieError::Channel(format!("whatsapp bot build failed: {e}")))?;

        let _handle = bot
            .run()
            .await
            .map_err(|e| SosieError::Channel(format!("whatsapp bot run failed: {e}")))?;

        Ok(())
    }
}
