//! Asynchronous provider-task submission and polling.
//!
//! Every mutating call answers 202 Accepted with a task document; the
//! controller polls the task's href until it reaches a terminal state or
//! the caller's deadline passes. A deadline pass is a value
//! (`TaskOutcome::TimedOut`), not an error — callers commonly want to
//! report "still in progress" distinctly from failure.

use tokio::time::{sleep, Duration, Instant};

use crate::client::VcloudClient;
use crate::error::{VcloudError, VcloudResult};
use crate::xml::Element;

/// Provider task status. Anything the provider reports outside the four
/// documented strings is treated as terminal and surfaced raw rather than
/// polled forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Queued,
    Running,
    Success,
    Error,
}

impl TaskStatus {
    fn from_provider(raw: &str) -> Self {
        match raw {
            "queued" | "preRunning" => TaskStatus::Queued,
            "running" => TaskStatus::Running,
            "success" => TaskStatus::Success,
            _ => TaskStatus::Error,
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Success | TaskStatus::Error)
    }
}

/// Immutable snapshot of one task poll. Superseded by re-fetching via the
/// locator, never updated in place.
#[derive(Debug, Clone)]
pub struct Task {
    pub href: String,
    pub status: TaskStatus,
    /// Provider's raw status string, kept for diagnostics.
    pub raw_status: String,
    pub doc: Element,
}

impl Task {
    fn from_doc(doc: Element) -> VcloudResult<Self> {
        let href = doc
            .attr("href")
            .ok_or_else(|| VcloudError::parse("Task document carries no href"))?
            .to_string();
        let raw_status = doc.attr("status").unwrap_or_default().to_string();
        Ok(Self {
            href,
            status: TaskStatus::from_provider(&raw_status),
            raw_status,
            doc,
        })
    }

    /// Provider error detail, when the task carries one.
    pub fn error_message(&self) -> Option<String> {
        self.doc
            .find("Error")
            .and_then(|e| e.attr("message"))
            .map(|s| s.to_string())
    }
}

/// Terminal-or-timeout result of waiting on a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    /// Task reached terminal error; raw status and provider message attached.
    Error { status: String, message: String },
    /// Task was still running at the deadline. It keeps running on the
    /// provider — the caller decides whether to keep watching.
    TimedOut,
}

/// Submits mutations and polls the resulting tasks.
pub struct TaskController<'a> {
    client: &'a VcloudClient,
    poll_interval: Duration,
}

impl<'a> TaskController<'a> {
    pub fn new(client: &'a VcloudClient, poll_interval: Duration) -> Self {
        Self { client, poll_interval }
    }

    /// Submit a mutation. Anything but 202 Accepted is a fatal
    /// `Submission` error — no retry.
    pub async fn submit(
        &self,
        uri: &str,
        content_type: Option<&str>,
        body: Option<String>,
        label: &str,
    ) -> VcloudResult<Task> {
        log::info!("{label}: submitting to {uri}");
        let resp = self.client.post(uri, content_type, body).await?;
        if resp.status != 202 {
            return Err(VcloudError::submission(
                resp.status,
                format!("{label} submission failed: HTTP {} — {}", resp.status, resp.body),
            ));
        }
        let task = Task::from_doc(crate::xml::parse_document(&resp.body)?)?;
        log::debug!("{label}: task {} is {}", task.href, task.raw_status);
        Ok(task)
    }

    /// Fetch a fresh snapshot of the task.
    pub async fn poll(&self, task: &Task) -> VcloudResult<Task> {
        let doc = self.client.get_doc(&task.href).await?;
        Task::from_doc(doc)
    }

    /// Poll until terminal or until `timeout` elapses, sleeping the fixed
    /// interval between polls.
    pub async fn await_completion(
        &self,
        task: Task,
        timeout: Duration,
    ) -> VcloudResult<TaskOutcome> {
        let start = Instant::now();
        let mut task = task;

        loop {
            if task.status.is_terminal() {
                return Ok(match task.status {
                    TaskStatus::Success => TaskOutcome::Success,
                    _ => {
                        let message = task
                            .error_message()
                            .unwrap_or_else(|| format!("task ended as '{}'", task.raw_status));
                        log::warn!("task {} failed: {}", task.href, message);
                        TaskOutcome::Error { status: task.raw_status.clone(), message }
                    }
                });
            }

            sleep(self.poll_interval).await;
            if start.elapsed() >= timeout {
                log::warn!(
                    "task {} still '{}' after {:?}, handing back",
                    task.href,
                    task.raw_status,
                    timeout
                );
                return Ok(TaskOutcome::TimedOut);
            }
            task = self.poll(&task).await?;
        }
    }
}
