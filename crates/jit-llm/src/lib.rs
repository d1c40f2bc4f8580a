//! Language-model adapter for Jit.
//!
//! [`OpenAiModel`] implements [`jit_core::ModelCapability`] on top of an
//! OpenAI-compatible `/chat/completions` endpoint.

pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod parse;
pub mod prompts;

pub use client::ChatClient;
pub use config::LlmConfig;
pub use error::{LlmError, Result};
pub use model::OpenAiModel;
