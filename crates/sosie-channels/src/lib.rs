//! # sosie-channels
//!
//! Messaging transport integration for Sosie. WhatsApp only: the persona
//! impersonates one account on one network.

pub mod session;
pub mod whatsapp;

pub use whatsapp::WhatsAppTransport;
