//! Per-request execution record, published to the sink as a citation.

use serde::Serialize;
use uuid::Uuid;

use crate::execution::Language;

/// `output` is absent until set, and `null` when set without text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TrackerResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TrackerResult {
    pub fn output(&self) -> Option<&str> {
        self.output.as_ref().and_then(|o| o.as_deref())
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionTracker {
    id: String,
    name: String,
    code: String,
    language: Language,
    result: TrackerResult,
    resolved: bool,
}

/// Citation payload; `result` is present only once the tracker is resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CitationData {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub id: String,
    pub name: String,
    pub code: String,
    pub language: Language,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<TrackerResult>,
}

impl ExecutionTracker {
    pub fn new(name: impl Into<String>, code: impl Into<String>, language: Language) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            code: code.into(),
            language,
            result: TrackerResult::default(),
            resolved: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn set_error(&mut self, error: impl Into<String>) {
        self.result.error = Some(error.into());
        self.resolved = true;
    }

    /// Resolves the tracker even when there is no output text.
    pub fn set_output(&mut self, output: Option<String>) {
        self.result.output = Some(output);
        self.resolved = true;
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    pub fn citation(&self) -> CitationData {
        CitationData {
            kind: "code_execution",
            id: self.id.clone(),
            name: self.name.clone(),
            code: self.code.clone(),
            language: self.language,
            result: self.resolved.then(|| self.result.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unresolved_citation_omits_result() {
        let tracker = ExecutionTracker::new("Python code block", "print(1)", Language::Python);
        let value = serde_json::to_value(tracker.citation()).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "code_execution",
                "id": tracker.id(),
                "name": "Python code block",
                "code": "print(1)",
                "language": "python",
            })
        );
    }

    #[test]
    fn output_resolves_tracker() {
        let mut tracker = ExecutionTracker::new("Bash tool execution", "echo hi", Language::Shell);
        tracker.set_output(Some("hi".into()));
        let value = serde_json::to_value(tracker.citation()).unwrap();
        assert_eq!(value["result"], json!({ "output": "hi" }));
        assert_eq!(value["language"], "bash");
    }

    #[test]
    fn error_alone_resolves_tracker() {
        let mut tracker = ExecutionTracker::new("n", "sleep 9", Language::Shell);
        tracker.set_error("Code timed out after 1 seconds");
        assert!(tracker.is_resolved());
        let value = serde_json::to_value(tracker.citation()).unwrap();
        assert_eq!(
            value["result"],
            json!({ "error": "Code timed out after 1 seconds" })
        );
    }

    #[test]
    fn empty_output_still_resolves() {
        let mut tracker = ExecutionTracker::new("n", "true", Language::Shell);
        tracker.set_output(None);
        let value = serde_json::to_value(tracker.citation()).unwrap();
        assert_eq!(value["result"], json!({ "output": null }));
        assert_eq!(tracker.citation().result.unwrap().output(), None);
    }

    #[test]
    fn ids_are_unique() {
        let a = ExecutionTracker::new("a", "", Language::Python);
        let b = ExecutionTracker::new("a", "", Language::Python);
        assert_ne!(a.id(), b.id());
    }
}
