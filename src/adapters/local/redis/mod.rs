//! Redis adapter.
//!
//! Provides Redis-backed implementations of:
//! - `TaskStore` for task records (JSON under `mediaflow:task:<id>`)
//! - `TaskQueuePort` for the queue of task ids

mod error;
mod pool;
mod queue;
mod store;

pub use error::StoreError;
pub use pool::RedisPool;

/// Redis key constants
const TASK_PREFIX: &str = "mediaflow:task:";
const TASK_QUEUE: &str = "mediaflow:tasks:queued";

fn task_key(task_id: &str) -> String {
    format!("{}{}", TASK_PREFIX, task_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_keys_are_namespaced() {
        assert_eq!(task_key("abc"), "mediaflow:task:abc");
        assert!(!TASK_QUEUE.starts_with(TASK_PREFIX));
    }
}
