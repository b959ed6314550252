//! Inference client: OpenAI-compatible API client for text generation.
//!
//! This module handles all communication with the model endpoint:
//! - Non-streaming chat completions
//! - Fallback chain management
//! - Model configuration (the `models` section of `agentflow.yaml`)
//! - The [`TextGenerator`] seam used by the classifier and responders
//!
//! The client speaks the OpenAI Chat Completions API, so switching models is
//! a config change, not a code change.

pub mod client;
pub mod config;
pub mod errors;
pub mod generator;
pub mod types;

pub use client::InferenceClient;
pub use config::{ModelConfig, ModelsConfig};
pub use errors::InferenceError;
pub use generator::{GenerationRequest, LlmGenerator, TextGenerator};
pub use types::{ChatMessage, Role, SamplingOverrides};
