//! Single-purpose responders.
//!
//! Each responder wraps the text generator with a fixed instruction and asks
//! for a JSON object with one field. Models do not always comply, so a reply
//! without that field is used as-is after trimming.

use std::sync::Arc;

use super::classifier::extract_json;
use super::errors::AgentError;
use crate::inference::{GenerationRequest, TextGenerator};

/// The responder families the dispatcher can route to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponderKind {
    Hr,
    EmailSummary,
    Spreadsheet,
    DocumentOutline,
}

impl ResponderKind {
    /// Name used in logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            ResponderKind::Hr => "hr responder",
            ResponderKind::EmailSummary => "email summarizer",
            ResponderKind::Spreadsheet => "spreadsheet generator",
            ResponderKind::DocumentOutline => "document outliner",
        }
    }

    /// JSON field the reply is expected to carry.
    pub fn field(&self) -> &'static str {
        match self {
            ResponderKind::Hr => "answer",
            ResponderKind::EmailSummary => "summary",
            ResponderKind::Spreadsheet => "spreadsheetData",
            ResponderKind::DocumentOutline => "outline",
        }
    }

    fn prompt(&self, input: &str) -> String {
        let body = match self {
            ResponderKind::Hr => format!(
                "You are an AI-powered HR agent. Use your knowledge of HR policies and \
                 procedures to answer the following question:\n\n{input}"
            ),
            ResponderKind::EmailSummary => {
                format!("Summarize the following email content:\n\n{input}")
            }
            ResponderKind::Spreadsheet => format!(
                "You are an expert at generating spreadsheets in CSV format.\n\n\
                 Based on the user's description, create a spreadsheet in CSV format that \
                 fulfills their requirements. Put the headers in the first row and one data \
                 record on each following row. Keep the data consistent with the description.\n\n\
                 Description: {input}"
            ),
            ResponderKind::DocumentOutline => format!(
                "You help people start documents. Write an outline, or opening content, for a \
                 document about the following topic. Use headings and short bullet points.\n\n\
                 Topic: {input}"
            ),
        };
        format!(
            "{body}\n\nReply with a JSON object of the form {{\"{}\": \"...\"}}.",
            self.field()
        )
    }
}

/// A responder bound to a generator.
#[derive(Clone)]
pub struct Responder {
    kind: ResponderKind,
    generator: Arc<dyn TextGenerator>,
}

impl Responder {
    pub fn new(kind: ResponderKind, generator: Arc<dyn TextGenerator>) -> Self {
        Self { kind, generator }
    }

    pub fn kind(&self) -> ResponderKind {
        self.kind
    }

    /// Send `input` through this responder's instruction and return the text
    /// to show the user.
    pub async fn respond(&self, input: &str) -> Result<String, AgentError> {
        let collaborator = self.kind.name();
        tracing::info!(responder = collaborator, input_chars = input.len(), "calling responder");

        let request = GenerationRequest::new(self.kind.prompt(input)).expect_json();
        let reply = self
            .generator
            .generate(request)
            .await
            .map_err(|source| AgentError::CollaboratorFailed {
                collaborator,
                source,
            })?;

        extract_field(&reply, self.kind.field()).ok_or(AgentError::EmptyReply { collaborator })
    }
}

/// Pull `field` out of a JSON reply, falling back to the trimmed raw text.
/// `None` only when there is nothing to show.
fn extract_field(reply: &str, field: &str) -> Option<String> {
    let from_json = serde_json::from_str::<serde_json::Value>(extract_json(reply))
        .ok()
        .and_then(|v| match v.get(field)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        });

    let text = from_json.unwrap_or_else(|| reply.to_string());
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}
