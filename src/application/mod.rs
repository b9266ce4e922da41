//! Application layer - Services that drive the domain through ports.

pub mod error;
pub mod orchestrator;
pub mod runner;
pub mod worker;

pub use error::{ServiceError, ServiceResult};
pub use orchestrator::OrchestratorService;
pub use runner::{FlowRunner, RunnerConfig};
pub use worker::{spawn_workers, WorkerService};
