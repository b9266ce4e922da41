//! In-process task store and queue.
//!
//! Backs tests and single-process runs where Redis is not available.

use crate::domain::task::Task;
use crate::ports::queue::TaskQueuePort;
use crate::ports::task_store::TaskStore;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify, RwLock};

#[derive(Clone, Default)]
pub struct InMemoryStore {
    tasks: Arc<RwLock<HashMap<String, Task>>>,
    queue: Arc<Mutex<VecDeque<String>>>,
    queued: Arc<Notify>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of task ids waiting in the queue.
    pub async fn queue_len(&self) -> usize {
        self.queue.lock().await.len()
    }
}

#[async_trait]
impl TaskStore for InMemoryStore {
    async fn get_task(&self, task_id: &str) -> Result<Option<Task>, Box<dyn Error + Send + Sync>> {
        Ok(self.tasks.read().await.get(task_id).cloned())
    }

    async fn save_task(&self, task: &Task) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.tasks
            .write()
            .await
            .insert(task.id.clone(), task.clone());
        Ok(())
    }
}

#[async_trait]
impl TaskQueuePort for InMemoryStore {
    async fn enqueue_task(&self, task_id: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.queue.lock().await.push_back(task_id.to_string());
        self.queued.notify_one();
        Ok(())
    }

    async fn dequeue_task(
        &self,
        timeout_secs: f64,
    ) -> Result<Option<String>, Box<dyn Error + Send + Sync>> {
        // 0.0 waits until something arrives
        let deadline = (timeout_secs > 0.0)
            .then(|| tokio::time::Instant::now() + Duration::from_secs_f64(timeout_secs));

        loop {
            if let Some(id) = self.queue.lock().await.pop_front() {
                return Ok(Some(id));
            }
            match deadline {
                Some(deadline) => {
                    if tokio::time::timeout_at(deadline, self.queued.notified())
                        .await
                        .is_err()
                    {
                        return Ok(self.queue.lock().await.pop_front());
                    }
                }
                None => self.queued.notified().await,
            }
        }
    }
}
