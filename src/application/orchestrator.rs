use super::error::{ServiceError, ServiceResult};
use crate::domain::task::{Task, TaskPayload, TaskStatus};
use crate::domain::validation::validate_payload;
use crate::ports::queue::TaskQueuePort;
use crate::ports::task_store::TaskStore;
use tracing::info;
use uuid::Uuid;

/// Accepts new processing requests and hands them to the workers.
pub struct OrchestratorService<T, Q> {
    store: T,
    queue: Q,
}

impl<T, Q> OrchestratorService<T, Q>
where
    T: TaskStore,
    Q: TaskQueuePort,
{
    pub fn new(store: T, queue: Q) -> Self {
        Self { store, queue }
    }

    /// Create a queued task for `payload` and enqueue it. Returns the task id.
    pub async fn submit(&self, payload: TaskPayload) -> ServiceResult<String> {
        validate_payload(&payload)?;

        let task = Task::new(Uuid::new_v4().to_string(), payload);
        self.store.save_task(&task).await?;
        self.queue.enqueue_task(&task.id).await?;

        info!(
            task_id = %task.id,
            upload_id = %task.payload.upload_id,
            "Submitted processing task"
        );
        Ok(task.id)
    }

    /// Put a finished task back in the queue. It is rebuilt from the same
    /// payload, so it gets the same flow.
    pub async fn retry(&self, task_id: &str) -> ServiceResult<()> {
        let mut task = self
            .store
            .get_task(task_id)
            .await?
            .ok_or_else(|| ServiceError::TaskNotFound(task_id.to_string()))?;

        if !task.status.is_terminal() {
            return Err(ServiceError::InvalidState {
                task_id: task.id,
                status: task.status,
            });
        }

        task.status = TaskStatus::Queued;
        task.progress = 0;
        task.result = None;
        task.error_log = None;
        self.store.save_task(&task).await?;
        self.queue.enqueue_task(&task.id).await?;

        info!(task_id = %task.id, "Re-queued task");
        Ok(())
    }
}
