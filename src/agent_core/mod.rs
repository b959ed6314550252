//! Agent Core: query dispatch for AgentFlow.
//!
//! Submodules:
//! - `classifier`: Intent classification through the text generator
//! - `responders`: HR, email summary, spreadsheet and outline responders
//! - `dispatcher`: Request lifecycle, dataset resolution, routing
//! - `store`: Session dataset cache trait and in-memory backend
//! - `database`: SQLite dataset backend
//! - `types`: Classification and response envelope types
//! - `errors`: Agent-level error types

pub mod classifier;
pub mod database;
pub mod dispatcher;
pub mod errors;
pub mod responders;
pub mod store;
pub mod types;

// Re-exports for convenience
pub use classifier::IntentClassifier;
pub use database::SqliteDatasetStore;
pub use dispatcher::Dispatcher;
pub use errors::AgentError;
pub use responders::{Responder, ResponderKind};
pub use store::{DatasetStore, DatasetSummary, MemoryDatasetStore};
pub use types::{ActionType, Classification, ContentKind, ResponseEnvelope};
