use async_trait::async_trait;
use std::error::Error;

/// Queue of task ids waiting for a worker.
#[async_trait]
pub trait TaskQueuePort: Send + Sync {
    /// Enqueue a task id
    async fn enqueue_task(&self, task_id: &str) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Dequeue a task id, waiting up to `timeout_secs`.
    /// Returns `None` when nothing arrived in time.
    async fn dequeue_task(
        &self,
        timeout_secs: f64,
    ) -> Result<Option<String>, Box<dyn Error + Send + Sync>>;
}
