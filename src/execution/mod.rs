//! Execution engine: request, status and outcome types.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::config::Settings;

pub mod engine;
pub mod interpreter;

pub use engine::Engine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    #[serde(rename = "bash", alias = "sh", alias = "shell")]
    Shell,
}

impl Language {
    /// Wire name, also used as the citation `language` field.
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Shell => "bash",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Language::Python => "Python",
            Language::Shell => "Bash",
        }
    }

    /// Fence tags that name this language, longest first.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Language::Python => &["python3", "python", "py"],
            Language::Shell => &["shell", "bash", "sh"],
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "python" | "python3" | "py" => Ok(Language::Python),
            "bash" | "sh" | "shell" => Ok(Language::Shell),
            other => Err(format!("unsupported language: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Ok,
    Error,
    Timeout,
    InvalidInput,
    SandboxError,
    /// Placeholder before classification; never a reported result.
    Unknown,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::Error => "ERROR",
            Status::Timeout => "TIMEOUT",
            Status::InvalidInput => "INVALID_INPUT",
            Status::SandboxError => "SANDBOX_ERROR",
            Status::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which adapter produced a request; only affects the tracker's display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOrigin {
    Tool,
    Transcript,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    language: Language,
    code: String,
    timeout_seconds: u64,
    debug: bool,
    origin: RequestOrigin,
}

impl ExecutionRequest {
    pub fn new(
        language: Language,
        code: impl Into<String>,
        settings: &Settings,
        origin: RequestOrigin,
    ) -> Self {
        Self {
            language,
            code: code.into(),
            timeout_seconds: settings.max_runtime_seconds,
            debug: settings.debug,
            origin,
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Raw code as supplied, before normalization.
    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn origin(&self) -> RequestOrigin {
        self.origin
    }

    pub fn display_name(&self) -> String {
        match self.origin {
            RequestOrigin::Tool => format!("{} tool execution", self.language.title()),
            RequestOrigin::Transcript => format!("{} code block", self.language.title()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub status: Status,
    pub output: Option<String>,
    pub exit_code: Option<i32>,
}

impl ExecutionOutcome {
    pub fn pending() -> Self {
        Self {
            status: Status::Unknown,
            output: None,
            exit_code: None,
        }
    }

    /// Output with empty text treated as absent.
    pub fn meaningful_output(&self) -> Option<&str> {
        self.output.as_deref().filter(|o| !o.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_parses_aliases() {
        assert_eq!("python3".parse::<Language>().unwrap(), Language::Python);
        assert_eq!(" Bash ".parse::<Language>().unwrap(), Language::Shell);
        assert_eq!("sh".parse::<Language>().unwrap(), Language::Shell);
        assert!("ruby".parse::<Language>().is_err());
    }

    #[test]
    fn status_serializes_as_wire_names() {
        assert_eq!(serde_json::to_string(&Status::Ok).unwrap(), "\"OK\"");
        assert_eq!(
            serde_json::to_string(&Status::SandboxError).unwrap(),
            "\"SANDBOX_ERROR\""
        );
        assert_eq!(
            serde_json::to_string(&Status::InvalidInput).unwrap(),
            "\"INVALID_INPUT\""
        );
        for s in [Status::Ok, Status::Timeout, Status::Unknown] {
            assert_eq!(serde_json::to_value(s).unwrap(), s.as_str());
        }
    }

    #[test]
    fn display_name_depends_on_origin() {
        let settings = Settings::default();
        let tool = ExecutionRequest::new(Language::Shell, "ls", &settings, RequestOrigin::Tool);
        let block =
            ExecutionRequest::new(Language::Python, "1", &settings, RequestOrigin::Transcript);
        assert_eq!(tool.display_name(), "Bash tool execution");
        assert_eq!(block.display_name(), "Python code block");
        assert_eq!(tool.timeout_seconds(), 30);
    }

    #[test]
    fn pending_outcome_is_unknown() {
        let outcome = ExecutionOutcome::pending();
        assert_eq!(outcome.status, Status::Unknown);
        assert_eq!(outcome.meaningful_output(), None);
    }
}
