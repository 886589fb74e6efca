//! Run Python or shell snippets in a subprocess under a time budget, and
//! report status, output and progress notifications to an optional sink.
//!
//! **No sandboxing.** Code runs as a plain child process with the privileges
//! of the calling process. A private temporary working directory is the only
//! isolation; there are no resource limits and no filesystem or network
//! containment. Only run code you would run yourself.
//!
//! Two entry shapes share one core ([`runner::CodeRunner`]):
//! - direct: a language and a code string, as a tool call would pass them;
//! - transcript: a chat transcript whose last assistant message carries a
//!   fenced or shebang-marked block.

pub mod config;
pub mod error;
pub mod events;
pub mod execution;
pub mod normalize;
pub mod printer;
pub mod runner;
pub mod tracker;
pub mod transcript;

pub use config::{Config, Settings};
pub use error::{ConfigError, ExecError, SelectError};
pub use events::{AsyncSink, EventNotifier, EventSink, Notification, StatusLevel};
pub use execution::{ExecutionOutcome, ExecutionRequest, Language, Status};
pub use runner::{direct_response, CodeRunner, DirectRequest, RunResult};
pub use tracker::ExecutionTracker;
pub use transcript::{ChatMessage, Role, TranscriptRequest};
