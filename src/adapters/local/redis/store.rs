//! Redis TaskStore implementation.

use super::error::StoreError;
use super::pool::RedisPool;
use super::task_key;
use crate::domain::task::Task;
use crate::ports::task_store::TaskStore;
use async_trait::async_trait;
use deadpool_redis::redis::AsyncCommands;

#[async_trait]
impl TaskStore for RedisPool {
    async fn get_task(
        &self,
        task_id: &str,
    ) -> Result<Option<Task>, Box<dyn std::error::Error + Send + Sync>> {
        let mut conn = self.conn().await?;
        let json: Option<String> = conn
            .get(task_key(task_id))
            .await
            .map_err(StoreError::from)?;
        match json {
            Some(data) => Ok(Some(serde_json::from_str(&data).map_err(StoreError::from)?)),
            None => Ok(None),
        }
    }

    async fn save_task(&self, task: &Task) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut conn = self.conn().await?;
        let json = serde_json::to_string(task).map_err(StoreError::from)?;
        conn.set::<_, _, ()>(task_key(&task.id), json)
            .await
            .map_err(StoreError::from)?;
        Ok(())
    }
}
