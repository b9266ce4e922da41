use crate::domain::task::Task;
use async_trait::async_trait;
use std::error::Error;

/// Persistent task records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Get a task by id
    async fn get_task(&self, task_id: &str)
        -> Result<Option<Task>, Box<dyn Error + Send + Sync>>;

    /// Insert or replace a task
    async fn save_task(&self, task: &Task) -> Result<(), Box<dyn Error + Send + Sync>>;
}
