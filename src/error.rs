//! Typed errors for the execution core and configuration.

use std::path::PathBuf;

use thiserror::Error;

use crate::execution::{Language, Status};

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("Cannot find interpreter for language: {language}")]
    NoInterpreter { language: String },

    #[error("failed to create temporary working directory")]
    TempDir(#[source] std::io::Error),

    #[error("failed to spawn {language} interpreter {}", program.display())]
    Spawn {
        language: Language,
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write code to interpreter stdin")]
    Stdin(#[source] std::io::Error),

    #[error("failed to wait for interpreter process")]
    Wait(#[source] std::io::Error),

    #[error("failed to kill timed out process")]
    Kill(#[source] std::io::Error),

    #[error("Unexplained status: {status} (output: {output:?})")]
    UnclassifiedStatus {
        status: Status,
        output: Option<String>,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Why a transcript yielded nothing to run. Always reported as `INVALID_INPUT`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectError {
    #[error("No messages in conversation.")]
    NoMessages,

    #[error("Last message was not from the AI model.")]
    NotFromAssistant,

    #[error("Last message did not contain well-formed code blocks.")]
    MalformedBlocks,

    #[error("Message does not contain code blocks detected as Python or Bash.")]
    NoRecognizableBlock,
}
