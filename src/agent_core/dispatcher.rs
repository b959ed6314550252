//! Request dispatcher.
//!
//! Owns one query's lifecycle:
//!
//! ```text
//! Validating → ResolvingDataset → Classifying → Routing → Responding
//!      └──────────────────────────────────────────┴────→ Failed
//! ```
//!
//! Every path ends in a [`ResponseEnvelope`]; nothing escapes as an error.

use std::sync::Arc;

use super::classifier::IntentClassifier;
use super::errors::AgentError;
use super::responders::{Responder, ResponderKind};
use super::store::DatasetStore;
use super::types::{ActionType, Classification, ResponseEnvelope};
use crate::inference::TextGenerator;
use crate::workforce::{self, Dataset};

/// Validation message for blank queries.
pub const EMPTY_QUERY_MESSAGE: &str = "Query cannot be empty.";

/// Guidance returned for workforce questions with no dataset to answer from.
pub const DATASET_NOT_FOUND_MESSAGE: &str = "I couldn't find the data you're referring to. \
Please specify which dataset you'd like to use (e.g., \"Analyze the information from the Q1 Report\").";

/// Words that introduce a dataset name, in priority order.
pub const DATASET_KEYWORDS: [&str; 5] = ["information", "data", "knowledge", "details", "report"];

/// Words dropped from the front of an extracted dataset name.
const NAME_FILLERS: [&str; 7] = ["from", "in", "on", "of", "about", "for", "the"];

/// Query bodies are logged only up to this many characters.
const LOG_QUERY_CHARS: usize = 80;

/// Lifecycle states, logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Validating,
    ResolvingDataset,
    Classifying,
    Routing,
    Responding,
    Failed,
}

// ─── Dataset references ─────────────────────────────────────────────────────

/// What a query says about which dataset to use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetReference {
    /// Dataset named in the query, if any.
    pub name: Option<String>,
    /// The part of the query to analyze.
    pub query: String,
}

/// Split `"<question> <keyword> <dataset name>"`.
///
/// Keywords are tried in [`DATASET_KEYWORDS`] order, each at its first
/// occurrence. The first one followed by a usable name wins; the text before
/// it becomes the question. Without a match the whole query is the question.
pub fn extract_dataset_reference(query: &str) -> DatasetReference {
    // ASCII lowercasing keeps byte offsets aligned with `query`.
    let lower = query.to_ascii_lowercase();

    for keyword in DATASET_KEYWORDS {
        let Some(idx) = lower.find(keyword) else {
            continue;
        };
        let name = clean_dataset_name(&query[idx + keyword.len()..]);
        if name.is_empty() {
            continue;
        }
        return DatasetReference {
            name: Some(name),
            query: query[..idx].trim().to_string(),
        };
    }

    DatasetReference {
        name: None,
        query: query.trim().to_string(),
    }
}

/// `" from the Q1 Report?"` → `"Q1 Report"`.
fn clean_dataset_name(raw: &str) -> String {
    let mut name = raw
        .trim()
        .trim_end_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace());

    loop {
        let Some((first, rest)) = name.split_once(char::is_whitespace) else {
            break;
        };
        if !NAME_FILLERS.iter().any(|f| first.eq_ignore_ascii_case(f)) {
            break;
        }
        name = rest.trim_start();
    }

    if NAME_FILLERS.iter().any(|f| name.eq_ignore_ascii_case(f)) {
        return String::new();
    }
    name.to_string()
}

fn truncate_for_log(query: &str) -> &str {
    match query.char_indices().nth(LOG_QUERY_CHARS) {
        Some((idx, _)) => &query[..idx],
        None => query,
    }
}

// ─── Dispatcher ─────────────────────────────────────────────────────────────

/// Routes queries to the workforce engine or a responder.
#[derive(Clone)]
pub struct Dispatcher {
    classifier: IntentClassifier,
    generator: Arc<dyn TextGenerator>,
    store: Arc<dyn DatasetStore>,
}

impl Dispatcher {
    /// `generator` backs the responders; the classifier carries its own.
    pub fn new(
        classifier: IntentClassifier,
        generator: Arc<dyn TextGenerator>,
        store: Arc<dyn DatasetStore>,
    ) -> Self {
        Self {
            classifier,
            generator,
            store,
        }
    }

    pub fn store(&self) -> &Arc<dyn DatasetStore> {
        &self.store
    }

    fn enter(session_id: &str, state: DispatchState) {
        tracing::debug!(session = %session_id, state = ?state, "dispatch state");
    }

    /// Answer one query for `session_id`.
    pub async fn dispatch(&self, session_id: &str, raw_query: &str) -> ResponseEnvelope {
        Self::enter(session_id, DispatchState::Validating);
        let query = raw_query.trim();
        if query.is_empty() {
            Self::enter(session_id, DispatchState::Failed);
            tracing::info!(session = %session_id, "rejected empty query");
            return ResponseEnvelope::error(raw_query, EMPTY_QUERY_MESSAGE);
        }
        tracing::info!(session = %session_id, query = %truncate_for_log(query), "query received");

        Self::enter(session_id, DispatchState::ResolvingDataset);
        let reference = extract_dataset_reference(query);
        let dataset = self.resolve_dataset(session_id, reference.name.as_deref()).await;

        Self::enter(session_id, DispatchState::Classifying);
        let classification = self.classifier.classify(query).await;

        Self::enter(session_id, DispatchState::Routing);
        match self.route(raw_query, &classification, &reference, dataset).await {
            Ok(envelope) => {
                Self::enter(session_id, DispatchState::Responding);
                tracing::info!(
                    session = %session_id,
                    action = %classification.action_type,
                    kind = ?envelope.kind(),
                    "query answered"
                );
                envelope
            }
            Err(e) => {
                Self::enter(session_id, DispatchState::Failed);
                tracing::error!(
                    session = %session_id,
                    action = %classification.action_type,
                    error = %e,
                    "query failed"
                );
                ResponseEnvelope::error(raw_query, e.to_string())
            }
        }
    }

    /// Named dataset if the query names one, else the session default.
    async fn resolve_dataset(
        &self,
        session_id: &str,
        name: Option<&str>,
    ) -> Result<Option<Arc<Dataset>>, AgentError> {
        let dataset = match name {
            Some(name) => self.store.get(session_id, name).await,
            None => self.store.default_for(session_id).await,
        };
        match &dataset {
            Ok(found) => tracing::info!(
                session = %session_id,
                dataset = name.unwrap_or("<default>"),
                found = found.is_some(),
                "dataset resolved"
            ),
            Err(e) => tracing::warn!(session = %session_id, error = %e, "dataset lookup failed"),
        }
        dataset
    }

    async fn route(
        &self,
        user_query: &str,
        classification: &Classification,
        reference: &DatasetReference,
        dataset: Result<Option<Arc<Dataset>>, AgentError>,
    ) -> Result<ResponseEnvelope, AgentError> {
        let processed = classification.processed_query.as_str();

        let envelope = match classification.action_type {
            ActionType::Hr => {
                let answer = self.responder(ResponderKind::Hr).respond(processed).await?;
                ResponseEnvelope::text(user_query, answer)
            }
            ActionType::Workforce => {
                let Some(dataset) = dataset? else {
                    return Ok(ResponseEnvelope::text(user_query, DATASET_NOT_FOUND_MESSAGE));
                };
                let question = if reference.query.is_empty() {
                    user_query.trim()
                } else {
                    reference.query.as_str()
                };
                let answer = workforce::answer(&question.to_lowercase(), Some(dataset.as_ref()));
                ResponseEnvelope::text(user_query, answer)
            }
            ActionType::SummarizeEmail => {
                let summary = self
                    .responder(ResponderKind::EmailSummary)
                    .respond(processed)
                    .await?;
                ResponseEnvelope::text(user_query, format!("Summary: {summary}"))
            }
            ActionType::GenerateSpreadsheet => {
                let csv = self
                    .responder(ResponderKind::Spreadsheet)
                    .respond(processed)
                    .await?;
                ResponseEnvelope::tabular(user_query, csv, Self::filename(classification))
            }
            ActionType::GenerateDocumentOutline => {
                let outline = self
                    .responder(ResponderKind::DocumentOutline)
                    .respond(processed)
                    .await?;
                ResponseEnvelope::outline(user_query, outline, Self::filename(classification))
            }
            ActionType::GeneralResponse => ResponseEnvelope::text(user_query, processed),
        };
        Ok(envelope)
    }

    fn responder(&self, kind: ResponderKind) -> Responder {
        Responder::new(kind, Arc::clone(&self.generator))
    }

    fn filename(classification: &Classification) -> String {
        classification
            .filename
            .clone()
            .or_else(|| classification.action_type.default_filename().map(String::from))
            .unwrap_or_default()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::agent_core::classifier::tests::ScriptedGenerator;
    use crate::agent_core::classifier::CLASSIFIER_FALLBACK;
    use crate::agent_core::store::{DatasetSummary, MemoryDatasetStore};
    use crate::agent_core::types::ContentKind;
    use crate::inference::InferenceError;
    use crate::workforce::{Record, CAPABILITY_RESPONSE};

    fn decision(action: &str, processed: &str) -> String {
        serde_json::json!({"actionType": action, "processedQuery": processed}).to_string()
    }

    fn person(name: &str, active: bool) -> Record {
        Record {
            id: name.to_lowercase(),
            full_name: Some(name.to_string()),
            active: Some(active.to_string()),
            ..Default::default()
        }
    }

    fn crew(name: &str, active: usize, inactive: usize) -> Dataset {
        let mut records = Vec::new();
        for i in 0..active {
            records.push(person(&format!("Active{i}"), true));
        }
        for i in 0..inactive {
            records.push(person(&format!("Idle{i}"), false));
        }
        Dataset {
            name: name.to_string(),
            records,
        }
    }

    struct Harness {
        dispatcher: Dispatcher,
        classifier_gen: Arc<ScriptedGenerator>,
        responder_gen: Arc<ScriptedGenerator>,
        store: Arc<MemoryDatasetStore>,
    }

    fn harness(classifier_replies: Vec<String>, responder_replies: &[&str]) -> Harness {
        let classifier_gen = Arc::new(ScriptedGenerator::new(
            classifier_replies.into_iter().map(Ok).collect(),
        ));
        let responder_gen = Arc::new(ScriptedGenerator::ok(responder_replies));
        let store = Arc::new(MemoryDatasetStore::new());
        let dispatcher = Dispatcher::new(
            IntentClassifier::new(classifier_gen.clone()),
            responder_gen.clone(),
            store.clone(),
        );
        Harness {
            dispatcher,
            classifier_gen,
            responder_gen,
            store,
        }
    }

    #[tokio::test]
    async fn test_empty_query_skips_classifier() {
        let h = harness(vec![], &[]);
        let env = h.dispatcher.dispatch("s1", "   ").await;
        assert_eq!(env.kind(), ContentKind::Error);
        assert_eq!(env.content(), EMPTY_QUERY_MESSAGE);
        assert_eq!(env.error_detail(), Some(EMPTY_QUERY_MESSAGE));
        assert_eq!(h.classifier_gen.calls(), 0);
    }

    #[tokio::test]
    async fn test_workforce_without_dataset_gives_guidance() {
        let h = harness(vec![decision("workforce", "how many active users")], &[]);
        let env = h.dispatcher.dispatch("s1", "How many active users?").await;
        assert_eq!(env.kind(), ContentKind::Text);
        assert_eq!(env.content(), DATASET_NOT_FOUND_MESSAGE);
        assert_eq!(h.responder_gen.calls(), 0);
    }

    #[tokio::test]
    async fn test_workforce_uses_session_default() {
        let h = harness(
            vec![
                decision("workforce", "active users"),
                decision("workforce", "active users"),
            ],
            &[],
        );
        h.store.put("s1", crew("roster", 3, 2)).await.unwrap();

        let first = h.dispatcher.dispatch("s1", "How many active users are there?").await;
        assert_eq!(first.content(), "There are 3 active users.");
        assert_eq!(first.user_query(), "How many active users are there?");

        // Same question, unchanged dataset: same answer.
        let second = h.dispatcher.dispatch("s1", "How many active users are there?").await;
        assert_eq!(first.content(), second.content());
        assert_ne!(first.id(), second.id());
    }

    #[tokio::test]
    async fn test_workforce_uses_named_dataset() {
        let h = harness(vec![decision("workforce", "active users")], &[]);
        h.store.put("s1", crew("Q1 Report", 4, 0)).await.unwrap();
        h.store.put("s1", crew("latest", 1, 0)).await.unwrap();

        let env = h
            .dispatcher
            .dispatch("s1", "How many active users are in the data from the Q1 Report?")
            .await;
        assert_eq!(env.content(), "There are 4 active users.");
    }

    #[tokio::test]
    async fn test_unknown_named_dataset_gives_guidance() {
        let h = harness(vec![decision("workforce", "active users")], &[]);
        h.store.put("s1", crew("roster", 2, 0)).await.unwrap();
        let env = h
            .dispatcher
            .dispatch("s1", "how many active users in the report for Q9")
            .await;
        assert_eq!(env.content(), DATASET_NOT_FOUND_MESSAGE);
    }

    #[tokio::test]
    async fn test_workforce_unmatched_question() {
        let h = harness(vec![decision("workforce", "who is on shift")], &[]);
        h.store.put("s1", crew("roster", 1, 0)).await.unwrap();
        let env = h.dispatcher.dispatch("s1", "Who is on the night shift?").await;
        assert_eq!(env.content(), CAPABILITY_RESPONSE);
    }

    #[tokio::test]
    async fn test_hr_and_email_routes() {
        let h = harness(
            vec![
                decision("hr", "parental leave policy"),
                decision("summarize_email", "Hi team, the offsite moved to May."),
            ],
            &[r#"{"answer":"Twelve weeks."}"#, r#"{"summary":"Offsite moved to May."}"#],
        );
        let hr = h.dispatcher.dispatch("s1", "What is the parental leave policy?").await;
        assert_eq!(hr.kind(), ContentKind::Text);
        assert_eq!(hr.content(), "Twelve weeks.");

        let email = h
            .dispatcher
            .dispatch("s1", "Summarize: Hi team, the offsite moved to May.")
            .await;
        assert_eq!(email.content(), "Summary: Offsite moved to May.");

        let prompts = h.responder_gen.prompts.lock().unwrap();
        assert!(prompts[1].prompt.contains("Hi team, the offsite moved to May."));
    }

    #[tokio::test]
    async fn test_spreadsheet_and_outline_carry_filenames() {
        let h = harness(
            vec![
                decision("generate_spreadsheet", "weekly shifts"),
                serde_json::json!({
                    "actionType": "generate_document_outline",
                    "processedQuery": "onboarding",
                    "filename": "onboarding_outline.txt"
                })
                .to_string(),
            ],
            &[
                r#"{"spreadsheetData":"day,shift\nMon,AM"}"#,
                r#"{"outline":"1. Welcome"}"#,
            ],
        );

        let sheet = h.dispatcher.dispatch("s1", "make a table of weekly shifts").await;
        assert_eq!(sheet.kind(), ContentKind::Tabular);
        assert_eq!(sheet.content(), "day,shift\nMon,AM");
        assert_eq!(sheet.filename(), Some("spreadsheet.csv"));

        let outline = h
            .dispatcher
            .dispatch("s1", "start a Google Doc about onboarding")
            .await;
        assert_eq!(outline.kind(), ContentKind::Outline);
        assert_eq!(outline.content(), "1. Welcome");
        assert_eq!(outline.filename(), Some("onboarding_outline.txt"));
    }

    #[tokio::test]
    async fn test_general_response_and_classifier_fallback() {
        let h = harness(vec![decision("general_response", "Hello! How can I help?")], &[]);
        let env = h.dispatcher.dispatch("s1", "hi").await;
        assert_eq!(env.content(), "Hello! How can I help?");

        // Classifier script exhausted: the generator errors, the classifier recovers.
        let env = h.dispatcher.dispatch("s1", "hi again").await;
        assert_eq!(env.kind(), ContentKind::Text);
        assert_eq!(env.content(), CLASSIFIER_FALLBACK);
    }

    #[tokio::test]
    async fn test_responder_failure_becomes_error_envelope() {
        let classifier_gen = Arc::new(ScriptedGenerator::new(vec![Ok(decision("hr", "benefits"))]));
        let responder_gen = Arc::new(ScriptedGenerator::new(vec![Err(InferenceError::Timeout {
            duration_secs: 60,
        })]));
        let dispatcher = Dispatcher::new(
            IntentClassifier::new(classifier_gen),
            responder_gen,
            Arc::new(MemoryDatasetStore::new()),
        );

        let env = dispatcher.dispatch("s1", "What benefits do we offer?").await;
        assert_eq!(env.kind(), ContentKind::Error);
        assert_eq!(env.content(), "hr responder failed: inference timeout after 60s");
        assert_eq!(env.error_detail(), Some(env.content()));
    }

    struct BrokenStore;

    #[async_trait]
    impl DatasetStore for BrokenStore {
        async fn put(&self, _: &str, _: Dataset) -> Result<(), AgentError> {
            Err(AgentError::DatabaseError { reason: "disk full".into() })
        }
        async fn get(&self, _: &str, _: &str) -> Result<Option<Arc<Dataset>>, AgentError> {
            Err(AgentError::DatabaseError { reason: "disk full".into() })
        }
        async fn default_for(&self, _: &str) -> Result<Option<Arc<Dataset>>, AgentError> {
            Err(AgentError::DatabaseError { reason: "disk full".into() })
        }
        async fn list(&self, _: &str) -> Result<Vec<DatasetSummary>, AgentError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_store_failure_only_affects_workforce() {
        let classifier_gen = Arc::new(ScriptedGenerator::new(vec![
            Ok(decision("workforce", "active users")),
            Ok(decision("general_response", "Sure.")),
        ]));
        let dispatcher = Dispatcher::new(
            IntentClassifier::new(classifier_gen),
            Arc::new(ScriptedGenerator::ok(&[])),
            Arc::new(BrokenStore),
        );

        let env = dispatcher.dispatch("s1", "how many active users").await;
        assert_eq!(env.kind(), ContentKind::Error);
        assert_eq!(env.content(), "database error: disk full");

        let env = dispatcher.dispatch("s1", "can you help?").await;
        assert_eq!(env.content(), "Sure.");
    }

    #[test]
    fn test_extract_dataset_reference() {
        let r = extract_dataset_reference("Analyze the information from the Q1 Report");
        assert_eq!(r.name.as_deref(), Some("Q1 Report"));
        assert_eq!(r.query, "Analyze the");

        let r = extract_dataset_reference("Average salary in the DATA for Plant 7?");
        assert_eq!(r.name.as_deref(), Some("Plant 7"));
        assert_eq!(r.query, "Average salary in the");

        // "information" wins over a later "data"
        let r = extract_dataset_reference("list users data information about crew B");
        assert_eq!(r.name.as_deref(), Some("crew B"));

        // keyword with nothing after it is skipped
        let r = extract_dataset_reference("How many active users are in the data?");
        assert_eq!(r.name, None);
        assert_eq!(r.query, "How many active users are in the data?");
    }

    #[test]
    fn test_clean_dataset_name() {
        assert_eq!(clean_dataset_name(" from the Q1 Report?"), "Q1 Report");
        assert_eq!(clean_dataset_name(" about the "), "");
        assert_eq!(clean_dataset_name(" Theory Crew"), "Theory Crew");
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundaries() {
        let long = "é".repeat(200);
        assert_eq!(truncate_for_log(&long).chars().count(), LOG_QUERY_CHARS);
        assert_eq!(truncate_for_log("short"), "short");
    }
}
