//! Intent classifier.
//!
//! Asks the text generator to pick one of six action types for a query and
//! to rewrite the query for the chosen responder. The reply is expected to be
//! a JSON object; anything else degrades to a polite `general_response`.
//! [`IntentClassifier::classify`] never fails.

use std::sync::Arc;

use serde::Deserialize;

use super::types::{ActionType, Classification};
use crate::inference::{GenerationRequest, SamplingOverrides, TextGenerator};

/// Answer used when the generator fails or returns nothing usable.
pub const CLASSIFIER_FALLBACK: &str =
    "I'm sorry, I couldn't process your request. Please try again.";

/// Routing is a decision, not prose; keep sampling tight.
const CLASSIFIER_SAMPLING: SamplingOverrides = SamplingOverrides {
    temperature: Some(0.1),
    top_p: Some(0.2),
};

const CLASSIFIER_SYSTEM: &str = "You are AgentFlow, an assistant that routes user requests. \
Reply with a single JSON object and nothing else.";

/// Build the routing instruction for one query.
fn build_prompt(query: &str) -> String {
    format!(
        r#"Decide how to handle the user's query. You can delegate to:
1. An HR agent: HR policies, employee benefits, leave requests.
2. A workforce agent: work schedules, personnel overviews, team assignments, substitutions, and statistics about the workforce.
3. An email summarizer. If the user asks for a summary but has not pasted the email, ask them to paste it.
4. A spreadsheet generator: tables and spreadsheets described in words. Output must be CSV.
5. A document outliner: outlines or starting content for documents, such as "start a Google Doc about project planning".

Rules for "actionType":
- HR question: "hr". "processedQuery" is the HR question.
- Workforce management question: "workforce". "processedQuery" is the workforce question.
- Summarize an email:
  - email content included in the query: "summarize_email", "processedQuery" is the email content.
  - email content missing: "general_response", "processedQuery" asks the user to paste the email content.
- Create a spreadsheet or table: "generate_spreadsheet". "processedQuery" is the description. Suggest "filename" like "topic_spreadsheet.csv".
- Create a document, an outline, or "start a Google Doc about X": "generate_document_outline". "processedQuery" is the topic. Suggest "filename" like "topic_outline.txt".
- Anything else, or when unsure: "general_response", and "processedQuery" is a helpful answer.

Reply with JSON of the form:
{{"actionType": "...", "processedQuery": "...", "originalQuery": "...", "filename": "..."}}
"originalQuery" must be exactly the user's query. Omit "filename" unless one applies.

User query: "{query}""#
    )
}

// ─── Reply parsing ──────────────────────────────────────────────────────────

/// The generator's JSON reply. Field names tolerate snake_case.
#[derive(Debug, Deserialize)]
struct RawDecision {
    #[serde(rename = "actionType", alias = "action_type")]
    action_type: ActionType,
    #[serde(default, rename = "processedQuery", alias = "processed_query")]
    processed_query: Option<String>,
    #[serde(default)]
    filename: Option<String>,
}

/// Slice from the first `{` to the last `}`; models like wrapping JSON in
/// markdown fences.
pub(crate) fn extract_json(text: &str) -> &str {
    if let Some(start) = text.find('{') {
        if let Some(end) = text.rfind('}') {
            if end > start {
                return &text[start..=end];
            }
        }
    }
    text
}

/// Turn a generator reply into a classification, or `None` if it has no
/// usable structure.
fn parse_decision(raw: &str, original_query: &str) -> Option<Classification> {
    let decision: RawDecision = match serde_json::from_str(extract_json(raw)) {
        Ok(d) => d,
        Err(e) => {
            tracing::warn!(error = %e, "classifier reply is not a valid decision");
            return None;
        }
    };

    let processed = decision
        .processed_query
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty());

    let processed = match (decision.action_type, processed) {
        (_, Some(q)) => q,
        // A general response without an answer has nothing to show.
        (ActionType::GeneralResponse, None) => return None,
        (_, None) => original_query.to_string(),
    };

    let mut classification = Classification::new(decision.action_type, processed, original_query);
    classification.filename = decision.filename;
    Some(classification.normalize())
}

// ─── IntentClassifier ───────────────────────────────────────────────────────

/// Maps raw queries to a [`Classification`].
#[derive(Clone)]
pub struct IntentClassifier {
    generator: Arc<dyn TextGenerator>,
}

impl IntentClassifier {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Classify `query`. Generator failures and unstructured replies become a
    /// `general_response` carrying [`CLASSIFIER_FALLBACK`].
    pub async fn classify(&self, query: &str) -> Classification {
        let request = GenerationRequest::new(build_prompt(query))
            .with_system(CLASSIFIER_SYSTEM)
            .expect_json()
            .with_sampling(CLASSIFIER_SAMPLING);

        let classification = match self.generator.generate(request).await {
            Ok(reply) => parse_decision(&reply, query),
            Err(e) => {
                tracing::warn!(error = %e, "classifier generation failed");
                None
            }
        }
        .unwrap_or_else(|| Self::fallback(query));

        tracing::info!(
            action = %classification.action_type,
            filename = ?classification.filename,
            "query classified"
        );
        classification
    }

    fn fallback(query: &str) -> Classification {
        Classification::new(ActionType::GeneralResponse, CLASSIFIER_FALLBACK, query)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
