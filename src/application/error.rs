use crate::domain::error::ValidationError;
use crate::domain::task::TaskStatus;
use std::error::Error;
use thiserror::Error;

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Errors surfaced by the application services.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("task {0} not found")]
    TaskNotFound(String),

    #[error("invalid payload: {0}")]
    Validation(#[from] ValidationError),

    #[error("task {task_id} is {status}")]
    InvalidState { task_id: String, status: TaskStatus },

    #[error("port error: {0}")]
    Port(#[from] Box<dyn Error + Send + Sync>),
}
