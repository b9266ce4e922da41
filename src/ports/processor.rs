use crate::domain::error::StepError;
use crate::domain::media::MediaInfo;
use crate::domain::step::FlowNode;
use async_trait::async_trait;
use serde_json::Value;

/// Runs the leaf work of individual flow nodes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StepProcessor: Send + Sync {
    /// Run the root probe node and extract media metadata.
    async fn probe(&self, node: &FlowNode) -> Result<MediaInfo, StepError>;

    /// Run a dependent node. `media` is the probe's output.
    /// Returns the step result stored on the task.
    async fn process(&self, node: &FlowNode, media: &MediaInfo) -> Result<Value, StepError>;
}
