//! Subprocess runner: one attempt, bounded by a wall-clock timeout.

use std::{
    process::Stdio,
    sync::{Arc, Mutex},
    time::Duration,
};

use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWriteExt},
    process::Command,
    task::JoinHandle,
    time::timeout,
};

use super::{interpreter, ExecutionOutcome, Language, Status};
use crate::{config::Settings, error::ExecError};

/// How long to keep reading pipes after the child is gone. Grandchildren that
/// inherited stdout/stderr can hold them open indefinitely.
/// Background jobs left running by a successful snippet are not killed; they
/// only stop us from waiting on their pipes.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

const READ_CHUNK_SIZE: usize = 8192;

type SharedBuf = Arc<Mutex<Vec<u8>>>;

#[derive(Debug, Clone)]
pub struct Engine {
    settings: Settings,
}

impl Engine {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Run already-normalized `code` and classify the result.
    ///
    /// Non-zero exits and timeouts are outcomes, not errors. `Err` means the
    /// machinery itself failed (no interpreter, spawn or I/O failure).
    pub async fn run(
        &self,
        language: Language,
        code: &str,
        timeout_seconds: u64,
    ) -> Result<ExecutionOutcome, ExecError> {
        let program = interpreter::resolve(language, &self.settings)?;

        // Removed on drop, on every path out of this function.
        let workdir = tempfile::Builder::new()
            .prefix("code_exec_")
            .tempdir()
            .map_err(ExecError::TempDir)?;

        let mut cmd = Command::new(&program);
        cmd.arg("/dev/stdin")
            .current_dir(workdir.path())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|source| ExecError::Spawn {
            language,
            program: program.clone(),
            source,
        })?;
        let pid = child.id();
        tracing::debug!(
            %language,
            ?pid,
            workdir = %workdir.path().display(),
            "spawned interpreter"
        );

        let stdout_buf = SharedBuf::default();
        let stderr_buf = SharedBuf::default();
        let stdout_task = child
            .stdout
            .take()
            .map(|s| tokio::spawn(collect(s, Arc::clone(&stdout_buf))));
        let stderr_task = child
            .stderr
            .take()
            .map(|s| tokio::spawn(collect(s, Arc::clone(&stderr_buf))));

        // Written from a task so a child that never reads stdin cannot stall us.
        let stdin_task = child.stdin.take().map(|mut stdin| {
            let payload = format!("{code}\n");
            tokio::spawn(async move {
                stdin.write_all(payload.as_bytes()).await?;
                stdin.shutdown().await
            })
        });

        let budget = Duration::from_secs(timeout_seconds);
        let mut outcome = ExecutionOutcome::pending();
        let waited = timeout(budget, child.wait()).await;

        let exit_status = match waited {
            Ok(status) => Some(status.map_err(ExecError::Wait)?),
            Err(_) => {
                tracing::warn!(
                    %language,
                    ?pid,
                    timeout_seconds,
                    "code timed out, killing process group"
                );
                kill_process_group(pid);
                child.kill().await.map_err(ExecError::Kill)?;
                None
            }
        };

        drain(stdout_task).await;
        drain(stderr_task).await;
        if let Some(task) = stdin_task {
            if let Ok(Err(err)) = task.await {
                if err.kind() != std::io::ErrorKind::BrokenPipe && exit_status.is_some() {
                    return Err(ExecError::Stdin(err));
                }
            }
        }

        let stdout = take_text(&stdout_buf);
        let stderr = take_text(&stderr_buf);

        match exit_status {
            None => {
                outcome.status = Status::Timeout;
                outcome.output = Some(stderr).filter(|s| !s.is_empty());
            }
            Some(status) if status.success() => {
                outcome.status = Status::Ok;
                outcome.output = Some(stdout);
                outcome.exit_code = Some(0);
            }
            Some(status) => {
                outcome.status = Status::Error;
                outcome.output = Some(stderr);
                outcome.exit_code = status.code();
            }
        }
        tracing::debug!(
            status = %outcome.status,
            exit_code = ?outcome.exit_code,
            "classified execution"
        );

        drop(workdir);
        Ok(outcome)
    }
}

async fn collect<R: AsyncRead + Unpin>(mut reader: R, buf: SharedBuf) {
    let mut chunk = vec![0u8; READ_CHUNK_SIZE];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                if let Ok(mut guard) = buf.lock() {
                    guard.extend_from_slice(&chunk[..n]);
                }
            }
            Err(err) => {
                tracing::debug!(error = %err, "pipe read failed");
                break;
            }
        }
    }
}

async fn drain(task: Option<JoinHandle<()>>) {
    let Some(mut task) = task else { return };
    if timeout(DRAIN_TIMEOUT, &mut task).await.is_err() {
        tracing::warn!("output pipe still open after process exit, abandoning read");
        task.abort();
    }
}

/// Lossy UTF-8, trimmed of surrounding whitespace.
fn take_text(buf: &SharedBuf) -> String {
    let bytes = buf.lock().map(|mut g| std::mem::take(&mut *g)).unwrap_or_default();
    String::from_utf8_lossy(&bytes).trim().to_string()
}

#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    let Some(pid) = pid.and_then(|p| i32::try_from(p).ok()) else {
        return;
    };
    // SAFETY: killpg has no memory-safety preconditions; the child was placed
    // in its own group (pgid == pid) at spawn.
    let rc = unsafe { libc::killpg(pid, libc::SIGKILL) };
    if rc == 0 {
        tracing::debug!(pgid = pid, "killed process group");
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}
