//! QR code rendering and the standalone pairing flow.

use crate::session::WaSessionStore;
use sosie_core::error::SosieError;
use std::sync::Arc;
use tokio::sync::mpsc;
use wacore::types::events::Event;
use whatsapp_rust::bot::Bot;
use whatsapp_rust_tokio_transport::TokioWebSocketTransportFactory;
use whatsapp_rust_ureq_http_client::UreqHttpClient;

/// Render a compact QR code for terminal display using Unicode half-blocks.
///
/// Packs two rows of modules into one line of text using `▀`, `▄`, `█`, and
/// space, producing a code roughly half the height of a naive renderer.
pub fn generate_qr_terminal(qr_data: &str) -> Result<String, SosieError> {
    use qrcode::{Color, EcLevel, QrCode};

    let code = QrCode::with_error_correction_level(qr_data.as_bytes(), EcLevel::L)
        .map_err(|e| SosieError::Channel(format!("QR generation failed: {e}")))?;

    let width = code.width();
    let colors: Vec<Color> = code.into_colors();
    let is_dark = |row: usize, col: usize| -> bool {
        if row < width && col < width {
            colors[row * width + col] == Color::Dark
        } else {
            false
        }
    };

    let mut out = String::new();
    let mut row = 0;
    while row < width {
        for col in 0..width {
            let top = is_dark(row, col);
            let bottom = if row + 1 < width {
                is_dark(row + 1, col)
            } else {
                false
            };
            out.push(match (top, bottom) {
                (true, true) => '█',
                (true, false) => '▀',
                (false, true) => '▄',
                (false, false) => ' ',
            });
        }
        out.push('\n');
        row += 2;
    }

    Ok(out)
}

/// Start a standalone pairing flow for the `pair` CLI command.
///
/// Returns `(qr_rx, done_rx)`: QR data strings arrive as WhatsApp rotates
/// codes, and `done_rx` yields once pairing completes.
pub async fn start_pairing(
    data_dir: &str,
) -> Result<(mpsc::Receiver<String>, mpsc::Receiver<bool>), SosieError> {
    let (qr_tx, qr_rx) = mpsc::channel::<String>(4);
    let (done_tx, done_rx) = mpsc::channel::<bool>(1);

    let dir = sosie_core::config::shellexpand(data_dir);
    let session_dir = format!("{dir}/whatsapp_session");
    let _ = std::fs::create_dir_all(&session_dir);
    let db_path = format!("{session_dir}/whatsapp.db");

    let backend = Arc::new(
        WaSessionStore::new(&db_path)
            .await
            .map_err(|e| SosieError::Channel(format!("whatsapp session store init failed: {e}")))?,
    );

    let mut bot = Bot::builder()
        .with_backend(backend)
        .with_transport_factory(TokioWebSocketTransportFactory::new())
        .with_http_client(UreqHttpClient::new())
        .with_device_props(
            Some("SOSIE".to_string()),
            None,
            Some(waproto::whatsapp::device_props::PlatformType::Desktop),
        )
        .on_event(move |event, _client| {
            let qr_tx = qr_tx.clone();
            let done_tx = done_tx.clone();
            async move {
                match event {
                    Event::PairingQrCode { code, .. } => {
                        let _ = qr_tx.send(code).await;
                    }
                    Event::PairSuccess(_) | Event::Connected(_) => {
                        let _ = done_tx.send(true).await;
                    }
                    _ => {}
                }
            }
        })
        .build()
        .await
        .map_err(|e| SosieError::Channel(format!("whatsapp pairing build failed: {e}")))?;

    let _handle = bot
        .run()
        .await
        .map_err(|e| SosieError::Channel(format!("whatsapp pairing run failed: {e}")))?;

    Ok((qr_rx, done_rx))
}
