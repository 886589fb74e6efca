//! Orchestration shared by the direct and transcript adapters.
//!
//! Every request walks the same sequence: normalize, publish the tracker,
//! run the engine, publish the resolved tracker, optionally emit a debug
//! status, emit one final message, return `{status, output}`. Any error on
//! the way is caught once, here, and becomes `SANDBOX_ERROR`.

use serde::{Deserialize, Serialize};

use crate::{
    config::Settings,
    error::ExecError,
    events::{EventNotifier, EventSink, StatusLevel},
    execution::{Engine, ExecutionOutcome, ExecutionRequest, Language, RequestOrigin, Status},
    normalize::normalize,
    tracker::ExecutionTracker,
    transcript::{select_code, TranscriptRequest},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunResult {
    pub status: Status,
    pub output: Option<String>,
}

/// Request body of the direct-invocation shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectRequest {
    pub language: Language,
    pub code: String,
}

#[derive(Debug, Clone)]
pub struct CodeRunner {
    settings: Settings,
    engine: Engine,
}

impl CodeRunner {
    pub fn new(settings: Settings) -> Self {
        Self {
            engine: Engine::new(settings.clone()),
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run `code` as given by a tool call.
    pub async fn run_code(
        &self,
        language: Language,
        code: &str,
        sink: Option<EventSink>,
    ) -> RunResult {
        let request = ExecutionRequest::new(language, code, &self.settings, RequestOrigin::Tool);
        let mut notifier = EventNotifier::new(sink);
        self.execute(&request, &mut notifier).await
    }

    /// Direct invocation; returns `{<language key>: code, status, output}`.
    pub async fn run_direct(
        &self,
        request: &DirectRequest,
        sink: Option<EventSink>,
    ) -> serde_json::Value {
        let result = self.run_code(request.language, &request.code, sink).await;
        direct_response(request.language, &request.code, &result)
    }

    /// Transcript invocation: pick a block from the last assistant message and run it.
    pub async fn run_transcript(
        &self,
        request: &TranscriptRequest,
        sink: Option<EventSink>,
    ) -> RunResult {
        let mut notifier = EventNotifier::new(sink);
        let selected = match select_code(&request.messages) {
            Ok(selected) => selected,
            Err(err) => {
                let message = err.to_string();
                tracing::info!(reason = %message, "transcript has no runnable code");
                let detail = if self.settings.debug {
                    format!(
                        "[DEBUG MODE] {message}; body={}; settings=[{}]",
                        serde_json::to_string(request).unwrap_or_default(),
                        self.settings
                    )
                } else {
                    message.clone()
                };
                report_failure(&mut notifier, &detail).await;
                return RunResult {
                    status: Status::InvalidInput,
                    output: Some(message),
                };
            }
        };

        let request = ExecutionRequest::new(
            selected.language,
            selected.code,
            &self.settings,
            RequestOrigin::Transcript,
        );
        self.execute(&request, &mut notifier).await
    }

    async fn execute(&self, request: &ExecutionRequest, notifier: &mut EventNotifier) -> RunResult {
        tracing::info!(
            language = %request.language(),
            origin = ?request.origin(),
            timeout_seconds = request.timeout_seconds(),
            "starting execution"
        );
        let mut tracker = None;
        let result = match self.drive(request, notifier, &mut tracker).await {
            Ok(result) => result,
            Err(err) => {
                let message = format!("Unhandled exception: {err:#}");
                tracing::error!(error = %message, "execution failed");
                if let Some(tracker) = tracker.as_mut() {
                    tracker.set_error(message.clone());
                    if let Err(err) = notifier.code_execution(tracker).await {
                        tracing::warn!(error = %err, "could not publish failed tracker");
                    }
                }
                let detail = if request.debug() {
                    format!(
                        "[DEBUG MODE] {message}; language={}; code={}; settings=[{}]",
                        request.language(),
                        request.code(),
                        self.settings
                    )
                } else {
                    message.clone()
                };
                report_failure(notifier, &detail).await;
                RunResult {
                    status: Status::SandboxError,
                    output: Some(message),
                }
            }
        };
        tracing::info!(status = %result.status, "execution finished");
        result
    }

    async fn drive(
        &self,
        request: &ExecutionRequest,
        notifier: &mut EventNotifier,
        slot: &mut Option<ExecutionTracker>,
    ) -> anyhow::Result<RunResult> {
        let language = request.language();
        let code = normalize(request.code(), language);
        let tracker = slot.insert(ExecutionTracker::new(
            request.display_name(),
            code.clone(),
            language,
        ));
        notifier.clear_status().await?;
        notifier.code_execution(tracker).await?;

        let outcome = self
            .engine
            .run(language, &code, request.timeout_seconds())
            .await?;

        let failure = match outcome.status {
            Status::Timeout => Some(format!(
                "Code timed out after {} seconds",
                request.timeout_seconds()
            )),
            Status::Error => Some(match outcome.exit_code {
                Some(exit) => format!("{}: exited with status {exit}", language.title()),
                None => format!("{}: terminated by signal", language.title()),
            }),
            _ => None,
        };
        if let Some(failure) = failure {
            notifier.fail(&failure).await?;
            tracker.set_error(failure);
        }
        tracker.set_output(outcome.output.clone());
        notifier.code_execution(tracker).await?;

        if request.debug() {
            let level = if outcome.status == Status::Ok {
                StatusLevel::Complete
            } else {
                StatusLevel::Error
            };
            let description = format!(
                "[DEBUG MODE] status={}; output={}; settings=[{}]",
                outcome.status,
                outcome.output.as_deref().unwrap_or("None"),
                self.settings
            );
            notifier.status(&description, level, true).await?;
        }

        let message = final_message(language, &code, &outcome, request.timeout_seconds())?;
        notifier.message(message).await?;

        Ok(RunResult {
            status: outcome.status,
            output: outcome.output,
        })
    }
}

/// The one user-facing message for a classified outcome.
///
/// Only OK, TIMEOUT and ERROR are reportable; anything else means
/// classification went wrong.
pub fn final_message(
    language: Language,
    code: &str,
    outcome: &ExecutionOutcome,
    timeout_seconds: u64,
) -> Result<String, ExecError> {
    let title = language.title();
    let message = match (outcome.status, outcome.meaningful_output()) {
        (Status::Ok, output) => format!(
            "\n<details>\n<summary>Code Execution</summary>\nI executed the following {language} code:\n```{language}\n{code}\n```\n```Output\n{}\n```\n</details>\n",
            output.unwrap_or_default()
        ),
        (Status::Timeout, Some(output)) => format!(
            "\n\n---\nI executed this {title} code and it timed out after {timeout_seconds} seconds:\n```Error\n{output}\n```\n"
        ),
        (Status::Timeout, None) => format!(
            "\n\n---\nI executed this {title} code and it timed out after {timeout_seconds} seconds.\n"
        ),
        (Status::Error, Some(output)) => format!(
            "\n\n---\nI executed this {title} code and got the following error:\n```Error\n{output}\n```\n"
        ),
        (Status::Error, None) => {
            format!("\n\n---\nI executed this {title} code but got an unexplained error.\n")
        }
        (status, _) => {
            return Err(ExecError::UnclassifiedStatus {
                status,
                output: outcome.output.clone(),
            })
        }
    };
    Ok(message)
}

/// JSON returned by the direct shape, keyed by language.
pub fn direct_response(language: Language, code: &str, result: &RunResult) -> serde_json::Value {
    let key = match language {
        Language::Python => "python_code",
        Language::Shell => "bash_command",
    };
    let mut body = serde_json::Map::new();
    body.insert(key.to_string(), serde_json::Value::from(code));
    body.insert("status".into(), serde_json::Value::from(result.status.as_str()));
    body.insert(
        "output".into(),
        result
            .output
            .as_deref()
            .map_or(serde_json::Value::Null, serde_json::Value::from),
    );
    serde_json::Value::Object(body)
}

async fn report_failure(notifier: &mut EventNotifier, description: &str) {
    if let Err(err) = notifier.fail(description).await {
        tracing::warn!(error = %err, "could not report failure to sink");
    }
}
