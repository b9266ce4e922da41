use super::error::ServiceResult;
use super::runner::FlowRunner;
use crate::domain::task::TaskStatus;
use crate::ports::processor::StepProcessor;
use crate::ports::queue::TaskQueuePort;
use crate::ports::task_store::TaskStore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Pulls task ids off the queue and runs their flows.
pub struct WorkerService<S, Q, P> {
    store: S,
    queue: Q,
    runner: FlowRunner<S, P>,
    dequeue_timeout_secs: f64,
    running: Mutex<HashMap<String, CancellationToken>>,
}

impl<S, Q, P> WorkerService<S, Q, P>
where
    S: TaskStore + Clone + 'static,
    Q: TaskQueuePort + 'static,
    P: StepProcessor + 'static,
{
    pub fn new(store: S, queue: Q, runner: FlowRunner<S, P>, dequeue_timeout_secs: f64) -> Self {
        Self {
            store,
            queue,
            runner,
            dequeue_timeout_secs,
            running: Mutex::new(HashMap::new()),
        }
    }

    pub async fn run_worker_loop(&self, worker_id: usize, shutdown: CancellationToken) {
        info!(worker_id, "Worker started");
        loop {
            let next = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                next = self.queue.dequeue_task(self.dequeue_timeout_secs) => next,
            };

            match next {
                Ok(Some(task_id)) => {
                    if let Err(e) = self.process_task(&task_id, worker_id, &shutdown).await {
                        error!(worker_id, task_id = %task_id, error = %e, "Task failed");
                    }
                }
                Ok(None) => continue,
                Err(e) => {
                    error!(worker_id, error = %e, "Queue error");
                    tokio::time::sleep(tokio::time::Duration::from_secs(1)).await;
                }
            }
        }
        info!(worker_id, "Worker stopped");
    }

    /// Run one dequeued task. Tasks that are no longer queued (canceled or
    /// already handled by another worker) are skipped.
    pub async fn process_task(
        &self,
        task_id: &str,
        worker_id: usize,
        shutdown: &CancellationToken,
    ) -> ServiceResult<Option<TaskStatus>> {
        // Registered before the status check so a concurrent cancel is not lost.
        let token = shutdown.child_token();
        self.running
            .lock()
            .await
            .insert(task_id.to_string(), token.clone());

        let outcome = self.run_if_queued(task_id, worker_id, &token).await;

        self.running.lock().await.remove(task_id);
        outcome
    }

    async fn run_if_queued(
        &self,
        task_id: &str,
        worker_id: usize,
        token: &CancellationToken,
    ) -> ServiceResult<Option<TaskStatus>> {
        match self.store.get_task(task_id).await? {
            None => {
                warn!(worker_id, task_id, "Dequeued unknown task");
                return Ok(None);
            }
            Some(task) if task.status != TaskStatus::Queued => {
                debug!(worker_id, task_id, status = %task.status, "Skipping task");
                return Ok(None);
            }
            Some(_) => {}
        }

        info!(worker_id, task_id, "Processing task");
        let status = self.runner.run(task_id, token).await?;
        Ok(Some(status))
    }

    /// Cancel a task. A running task has its flow canceled; a queued task is
    /// marked canceled so no worker picks it up. Returns whether anything
    /// was canceled.
    pub async fn cancel(&self, task_id: &str) -> ServiceResult<bool> {
        if let Some(token) = self.running.lock().await.get(task_id) {
            token.cancel();
            info!(task_id, "Cancel requested for running task");
            return Ok(true);
        }

        match self.store.get_task(task_id).await? {
            Some(mut task) if task.status == TaskStatus::Queued => {
                task.status = TaskStatus::Canceled;
                self.store.save_task(&task).await?;
                info!(task_id, "Canceled queued task");
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// Spawn `count` worker loops sharing one service.
pub fn spawn_workers<S, Q, P>(
    service: Arc<WorkerService<S, Q, P>>,
    count: usize,
    shutdown: CancellationToken,
) -> tokio::task::JoinSet<()>
where
    S: TaskStore + Clone + 'static,
    Q: TaskQueuePort + 'static,
    P: StepProcessor + 'static,
{
    let mut workers = tokio::task::JoinSet::new();
    for i in 0..count {
        let service = service.clone();
        let shutdown = shutdown.clone();
        workers.spawn(async move {
            service.run_worker_loop(i, shutdown).await;
        });
    }
    workers
}
