//! # sosie-providers
//!
//! Oracle implementations for Sosie: chat completion and typo judgment,
//! both over an OpenAI-compatible API.

pub mod corrector;
pub mod openai;

pub use corrector::OpenAiCorrector;
pub use openai::OpenAiProvider;
