//! Redis TaskQueuePort implementation.

use super::error::StoreError;
use super::pool::RedisPool;
use super::TASK_QUEUE;
use crate::ports::queue::TaskQueuePort;
use async_trait::async_trait;
use deadpool_redis::redis::AsyncCommands;

#[async_trait]
impl TaskQueuePort for RedisPool {
    async fn enqueue_task(&self, task_id: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut conn = self.conn().await?;
        conn.lpush::<_, _, ()>(TASK_QUEUE, task_id)
            .await
            .map_err(StoreError::from)?;
        Ok(())
    }

    async fn dequeue_task(
        &self,
        timeout_secs: f64,
    ) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>> {
        let mut conn = self.conn().await?;
        let result: Option<(String, String)> = conn
            .brpop(TASK_QUEUE, timeout_secs)
            .await
            .map_err(StoreError::from)?;
        Ok(result.map(|(_, task_id)| task_id))
    }
}
