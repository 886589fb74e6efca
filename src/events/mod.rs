//! Notification protocol towards an optional, caller-supplied sink.
//!
//! A sink is either [`EventSink::Blocking`], a plain callback invoked
//! in place, or [`EventSink::Awaited`], whose delivery future the notifier
//! awaits before moving on. The variant is fixed when the sink is built.

use std::{fmt, sync::Arc};

use anyhow::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::Serialize;

use crate::tracker::{CitationData, ExecutionTracker};

/// Longest status description that still gets the repeat delivery.
pub const REPEAT_STATUS_MAX_LEN: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusLevel {
    InProgress,
    Complete,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusData {
    pub status: StatusLevel,
    pub description: String,
    pub done: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageData {
    pub content: String,
}

/// Serialized as `{"type": "...", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum Notification {
    Status(StatusData),
    Message(MessageData),
    Citation(CitationData),
}

impl Notification {
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::Status(_) => "status",
            Notification::Message(_) => "message",
            Notification::Citation(_) => "citation",
        }
    }
}

#[async_trait]
pub trait AsyncSink: Send + Sync {
    async fn deliver(&self, notification: Notification) -> Result<()>;
}

type BlockingFn = dyn Fn(&Notification) -> Result<()> + Send + Sync;
type AsyncFn = dyn Fn(Notification) -> BoxFuture<'static, Result<()>> + Send + Sync;

struct FnSink(Box<AsyncFn>);

#[async_trait]
impl AsyncSink for FnSink {
    async fn deliver(&self, notification: Notification) -> Result<()> {
        (self.0)(notification).await
    }
}

#[derive(Clone)]
pub enum EventSink {
    Blocking(Arc<BlockingFn>),
    Awaited(Arc<dyn AsyncSink>),
}

impl EventSink {
    pub fn blocking<F>(f: F) -> Self
    where
        F: Fn(&Notification) -> Result<()> + Send + Sync + 'static,
    {
        EventSink::Blocking(Arc::new(f))
    }

    pub fn awaited<S: AsyncSink + 'static>(sink: S) -> Self {
        EventSink::Awaited(Arc::new(sink))
    }

    pub fn from_async_fn<F>(f: F) -> Self
    where
        F: Fn(Notification) -> BoxFuture<'static, Result<()>> + Send + Sync + 'static,
    {
        EventSink::Awaited(Arc::new(FnSink(Box::new(f))))
    }

    async fn deliver(&self, notification: &Notification) -> Result<()> {
        match self {
            EventSink::Blocking(f) => (**f)(notification),
            EventSink::Awaited(sink) => sink.deliver(notification.clone()).await,
        }
    }
}

impl fmt::Debug for EventSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventSink::Blocking(_) => f.write_str("EventSink::Blocking"),
            EventSink::Awaited(_) => f.write_str("EventSink::Awaited"),
        }
    }
}

/// Per-request notifier. Not shared between requests.
#[derive(Debug, Default)]
pub struct EventNotifier {
    sink: Option<EventSink>,
    status_prefix: Option<String>,
    emitted_status: bool,
}

impl EventNotifier {
    pub fn new(sink: Option<EventSink>) -> Self {
        Self {
            sink,
            status_prefix: None,
            emitted_status: false,
        }
    }

    pub fn set_status_prefix(&mut self, prefix: impl Into<String>) {
        self.status_prefix = Some(prefix.into());
    }

    pub fn has_emitted_status(&self) -> bool {
        self.emitted_status
    }

    async fn emit(&self, notification: Notification, twice: bool) -> Result<()> {
        tracing::debug!(
            kind = notification.kind(),
            twice,
            payload = %serde_json::to_string(&notification).unwrap_or_default(),
            "emitting event"
        );
        let Some(sink) = &self.sink else {
            return Ok(());
        };
        let times = if twice { 2 } else { 1 };
        for _ in 0..times {
            sink.deliver(&notification).await?;
        }
        Ok(())
    }

    pub async fn status(
        &mut self,
        description: &str,
        level: StatusLevel,
        done: bool,
    ) -> Result<()> {
        self.emitted_status = true;
        let description = match &self.status_prefix {
            Some(prefix) => format!("{prefix}{description}"),
            None => description.to_string(),
        };
        let twice = !done && description.chars().count() <= REPEAT_STATUS_MAX_LEN;
        self.emit(
            Notification::Status(StatusData {
                status: level,
                description,
                done,
            }),
            twice,
        )
        .await
    }

    pub async fn fail(&mut self, description: &str) -> Result<()> {
        self.status(description, StatusLevel::Error, true).await
    }

    pub async fn clear_status(&mut self) -> Result<()> {
        if !self.emitted_status {
            return Ok(());
        }
        self.emitted_status = false;
        self.emit(
            Notification::Status(StatusData {
                status: StatusLevel::Complete,
                description: String::new(),
                done: true,
            }),
            true,
        )
        .await
    }

    pub async fn message(&self, content: impl Into<String>) -> Result<()> {
        self.emit(
            Notification::Message(MessageData {
                content: content.into(),
            }),
            false,
        )
        .await
    }

    /// Citations are replaced in place by receivers, so they always go out twice.
    pub async fn code_execution(&self, tracker: &ExecutionTracker) -> Result<()> {
        self.emit(Notification::Citation(tracker.citation()), true)
            .await
    }
}
