//! Domain layer - Pure business logic.

pub mod error;
pub mod flow;
pub mod media;
pub mod selector;
pub mod step;
pub mod task;
pub mod validation;

pub use error::{StepError, ValidationError};
pub use flow::{build_flow, build_flow_for, Flow};
pub use media::MediaInfo;
pub use step::{FlowNode, StepInput, StepType};
pub use task::{Task, TaskPayload, TaskStatus};
