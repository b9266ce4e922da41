//! Flow execution.
//!
//! Runs a task's flow in-process on tokio: the probe node first, then every
//! dependent node concurrently, bounded by `max_parallel_steps`. Progress,
//! results and errors are written back to the task store as nodes finish.

use super::error::{ServiceError, ServiceResult};
use crate::domain::error::StepError;
use crate::domain::flow::build_flow;
use crate::domain::media::MediaInfo;
use crate::domain::step::FlowNode;
use crate::domain::task::{Task, TaskStatus};
use crate::domain::validation::validate_payload;
use crate::ports::processor::StepProcessor;
use crate::ports::task_store::TaskStore;
use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::{Map, Value};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Clone, Debug)]
pub struct RunnerConfig {
    pub max_parallel_steps: usize,
    pub step_timeout: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_parallel_steps: 5,
            step_timeout: Duration::from_secs(3600),
        }
    }
}

enum NodeOutcome {
    Done(Value),
    Failed(StepError),
    Canceled,
}

pub struct FlowRunner<S, P> {
    store: S,
    processor: P,
    config: RunnerConfig,
}

impl<S, P> FlowRunner<S, P>
where
    S: TaskStore,
    P: StepProcessor,
{
    pub fn new(store: S, processor: P, config: RunnerConfig) -> Self {
        Self {
            store,
            processor,
            config,
        }
    }

    /// Runs the flow of `task_id` to a terminal status and returns it.
    ///
    /// Step failures end up on the task, not in the returned error; `Err` is
    /// reserved for a missing task or a failing task store.
    pub async fn run(&self, task_id: &str, cancel: &CancellationToken) -> ServiceResult<TaskStatus> {
        let mut task = self
            .store
            .get_task(task_id)
            .await?
            .ok_or_else(|| ServiceError::TaskNotFound(task_id.to_string()))?;

        if let Err(e) = validate_payload(&task.payload) {
            warn!(task_id = %task.id, error = %e, "Rejecting task with invalid payload");
            return self
                .finish(task, TaskStatus::Failed, Map::new(), vec![e.to_string()])
                .await;
        }

        let flow = build_flow(&task);
        let total = flow.nodes().count();
        info!(task_id = %task.id, steps = ?flow.steps(), "Running flow");

        task.status = TaskStatus::Running;
        task.progress = 0;
        task.result = None;
        task.error_log = None;
        self.store.save_task(&task).await?;

        let mut results = Map::new();
        let mut errors = Vec::new();

        let probe = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            outcome = self.run_probe(&flow.root) => Some(outcome),
        };
        let media = match probe {
            None => {
                info!(task_id = %task.id, "Flow canceled before probe finished");
                return self
                    .finish(task, TaskStatus::Canceled, results, errors)
                    .await;
            }
            Some(Err(e)) => {
                error!(task_id = %task.id, error = %e, "Probe failed, skipping dependent steps");
                errors.push(format!("{}: {}", flow.root.step, e));
                return self.finish(task, TaskStatus::Failed, results, errors).await;
            }
            Some(Ok(media)) => media,
        };

        results.insert(
            flow.root.step.as_str().to_string(),
            serde_json::to_value(&media).unwrap_or(Value::Null),
        );
        let mut finished = 1;
        task.progress = percent(finished, total);
        task.result = Some(Value::Object(results.clone()));
        self.save_progress(&task).await;

        let mut canceled = false;
        let mut pending = flow.children.iter();
        let mut in_flight = FuturesUnordered::new();
        for node in pending.by_ref().take(self.config.max_parallel_steps.max(1)) {
            in_flight.push(self.run_child(node, &media, cancel));
        }

        while let Some((node, outcome)) = in_flight.next().await {
            if let Some(next) = pending.next() {
                in_flight.push(self.run_child(next, &media, cancel));
            }

            match outcome {
                NodeOutcome::Done(value) => {
                    debug!(task_id = %task.id, step = %node.step, "Step finished");
                    results.insert(node.step.as_str().to_string(), value);
                }
                NodeOutcome::Failed(e) => {
                    error!(task_id = %task.id, step = %node.step, error = %e, "Step failed");
                    errors.push(format!("{}: {}", node.step, e));
                }
                NodeOutcome::Canceled => {
                    debug!(task_id = %task.id, step = %node.step, "Step canceled");
                    canceled = true;
                }
            }

            finished += 1;
            task.progress = percent(finished, total);
            task.result = Some(Value::Object(results.clone()));
            self.save_progress(&task).await;
        }

        let status = if canceled {
            TaskStatus::Canceled
        } else if errors.is_empty() {
            TaskStatus::Success
        } else {
            TaskStatus::Failed
        };
        self.finish(task, status, results, errors).await
    }

    // Progress is best effort; the final save records the outcome.
    async fn save_progress(&self, task: &Task) {
        if let Err(e) = self.store.save_task(task).await {
            warn!(task_id = %task.id, progress = task.progress, error = %e, "Failed to save progress");
        }
    }

    async fn run_probe(&self, node: &FlowNode) -> Result<MediaInfo, StepError> {
        match tokio::time::timeout(self.config.step_timeout, self.processor.probe(node)).await {
            Ok(result) => result,
            Err(_) => Err(StepError::Timeout {
                step: node.step,
                secs: self.config.step_timeout.as_secs(),
            }),
        }
    }

    async fn run_child<'a>(
        &self,
        node: &'a FlowNode,
        media: &MediaInfo,
        cancel: &CancellationToken,
    ) -> (&'a FlowNode, NodeOutcome) {
        // Not started yet, so nothing to interrupt.
        if cancel.is_cancelled() {
            return (node, NodeOutcome::Canceled);
        }

        let work = tokio::time::timeout(self.config.step_timeout, self.processor.process(node, media));
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => NodeOutcome::Canceled,
            result = work => match result {
                Ok(Ok(value)) => NodeOutcome::Done(value),
                Ok(Err(e)) => NodeOutcome::Failed(e),
                Err(_) => NodeOutcome::Failed(StepError::Timeout {
                    step: node.step,
                    secs: self.config.step_timeout.as_secs(),
                }),
            },
        };
        (node, outcome)
    }

    async fn finish(
        &self,
        mut task: Task,
        status: TaskStatus,
        results: Map<String, Value>,
        errors: Vec<String>,
    ) -> ServiceResult<TaskStatus> {
        task.status = status;
        if status == TaskStatus::Success {
            task.progress = 100;
        }
        task.result = if results.is_empty() {
            None
        } else {
            Some(Value::Object(results))
        };
        task.error_log = if errors.is_empty() {
            None
        } else {
            Some(errors.join("\n"))
        };
        self.store.save_task(&task).await?;

        info!(task_id = %task.id, status = %status, "Flow finished");
        Ok(status)
    }
}

fn percent(finished: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((finished.min(total) * 100) / total) as u8
}
