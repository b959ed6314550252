//! Shared types for the agent core.
//!
//! The classifier's decision and the response envelope returned for every
//! request.

use serde::{Deserialize, Serialize};

// ─── Classification ─────────────────────────────────────────────────────────

/// Default filename for generated spreadsheets.
pub const DEFAULT_SPREADSHEET_FILENAME: &str = "spreadsheet.csv";

/// Default filename for generated document outlines.
pub const DEFAULT_OUTLINE_FILENAME: &str = "document_outline.txt";

/// Which responder handles a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Hr,
    Workforce,
    SummarizeEmail,
    GenerateSpreadsheet,
    GenerateDocumentOutline,
    GeneralResponse,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Hr => "hr",
            ActionType::Workforce => "workforce",
            ActionType::SummarizeEmail => "summarize_email",
            ActionType::GenerateSpreadsheet => "generate_spreadsheet",
            ActionType::GenerateDocumentOutline => "generate_document_outline",
            ActionType::GeneralResponse => "general_response",
        }
    }

    /// Filename used when the classifier does not suggest one.
    pub fn default_filename(&self) -> Option<&'static str> {
        match self {
            ActionType::GenerateSpreadsheet => Some(DEFAULT_SPREADSHEET_FILENAME),
            ActionType::GenerateDocumentOutline => Some(DEFAULT_OUTLINE_FILENAME),
            _ => None,
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The classifier's decision for one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub action_type: ActionType,
    /// Sub-query tailored to the chosen responder, or the direct answer for
    /// `general_response`.
    pub processed_query: String,
    /// The user's query, verbatim.
    pub original_query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl Classification {
    pub fn new(
        action_type: ActionType,
        processed_query: impl Into<String>,
        original_query: impl Into<String>,
    ) -> Self {
        Self {
            action_type,
            processed_query: processed_query.into(),
            original_query: original_query.into(),
            filename: None,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Fill in the default filename for spreadsheet and outline results and
    /// drop blank filenames everywhere.
    pub fn normalize(mut self) -> Self {
        self.filename = self
            .filename
            .take()
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .or_else(|| self.action_type.default_filename().map(String::from));
        self
    }
}

// ─── Response Envelope ──────────────────────────────────────────────────────

/// How a client should render the envelope's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Text,
    /// CSV text.
    Tabular,
    Outline,
    Error,
    /// Client-side placeholder while a request is in flight. The dispatcher
    /// never produces it.
    Pending,
}

/// The uniform reply to one query. Built once, never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    id: String,
    user_query: String,
    #[serde(rename = "type")]
    kind: ContentKind,
    content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ResponseEnvelope {
    fn build(
        user_query: &str,
        kind: ContentKind,
        content: String,
        filename: Option<String>,
        error: Option<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_query: user_query.to_string(),
            kind,
            content,
            filename,
            error,
        }
    }

    pub fn text(user_query: &str, content: impl Into<String>) -> Self {
        Self::build(user_query, ContentKind::Text, content.into(), None, None)
    }

    pub fn tabular(user_query: &str, csv: impl Into<String>, filename: impl Into<String>) -> Self {
        Self::build(
            user_query,
            ContentKind::Tabular,
            csv.into(),
            Some(filename.into()),
            None,
        )
    }

    pub fn outline(user_query: &str, outline: impl Into<String>, filename: impl Into<String>) -> Self {
        Self::build(
            user_query,
            ContentKind::Outline,
            outline.into(),
            Some(filename.into()),
            None,
        )
    }

    /// Error envelope; the message is both the content and the error detail.
    pub fn error(user_query: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        Self::build(
            user_query,
            ContentKind::Error,
            message.clone(),
            None,
            Some(message),
        )
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn user_query(&self) -> &str {
        &self.user_query
    }

    pub fn kind(&self) -> ContentKind {
        self.kind
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn error_detail(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_fills_default_filenames() {
        let c = Classification::new(ActionType::GenerateSpreadsheet, "sales", "q").normalize();
        assert_eq!(c.filename.as_deref(), Some("spreadsheet.csv"));

        let c = Classification::new(ActionType::GenerateDocumentOutline, "plan", "q")
            .with_filename("  ")
            .normalize();
        assert_eq!(c.filename.as_deref(), Some("document_outline.txt"));

        let c = Classification::new(ActionType::GenerateSpreadsheet, "sales", "q")
            .with_filename("sales_spreadsheet.csv")
            .normalize();
        assert_eq!(c.filename.as_deref(), Some("sales_spreadsheet.csv"));

        let c = Classification::new(ActionType::Hr, "leave?", "q").normalize();
        assert!(c.filename.is_none());
    }

    #[test]
    fn test_classification_wire_names() {
        let c: Classification = serde_json::from_str(
            r#"{"actionType":"summarize_email","processedQuery":"body","originalQuery":"q"}"#,
        )
        .unwrap();
        assert_eq!(c.action_type, ActionType::SummarizeEmail);
        assert_eq!(c.action_type.to_string(), "summarize_email");
    }

    #[test]
    fn test_envelope_serialization() {
        let env = ResponseEnvelope::tabular("make a table", "a,b\n1,2", "t.csv");
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["type"], "tabular");
        assert_eq!(json["userQuery"], "make a table");
        assert_eq!(json["filename"], "t.csv");
        assert!(json.get("error").is_none());
        assert!(!env.id().is_empty());
    }

    #[test]
    fn test_error_envelope_carries_detail() {
        let env = ResponseEnvelope::error("", "Query cannot be empty.");
        assert_eq!(env.kind(), ContentKind::Error);
        assert_eq!(env.content(), "Query cannot be empty.");
        assert_eq!(env.error_detail(), Some("Query cannot be empty."));
        assert!(env.filename().is_none());
    }

    #[test]
    fn test_envelope_ids_are_unique() {
        let a = ResponseEnvelope::text("q", "x");
        let b = ResponseEnvelope::text("q", "x");
        assert_ne!(a.id(), b.id());
        assert_eq!(a.content(), b.content());
    }
}
