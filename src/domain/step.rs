//! Step registry and step descriptors.
//!
//! `StepType` is the closed set of processing steps a flow can contain.
//! Everything that dispatches on a step matches on it exhaustively, so a new
//! variant does not compile until every selector and processor handles it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepType {
    Probe,
    Thumbnail,
    Sprite,
    Filmstrip,
    Transcode,
    Audio,
}

impl StepType {
    /// Every known step, root first, then dependents in registry order.
    pub const ALL: [StepType; 6] = [
        StepType::Probe,
        StepType::Thumbnail,
        StepType::Sprite,
        StepType::Filmstrip,
        StepType::Transcode,
        StepType::Audio,
    ];

    /// The steps that depend on probe, in the order the builder evaluates them.
    pub const OPTIONAL: [StepType; 5] = [
        StepType::Thumbnail,
        StepType::Sprite,
        StepType::Filmstrip,
        StepType::Transcode,
        StepType::Audio,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StepType::Probe => "probe",
            StepType::Thumbnail => "thumbnail",
            StepType::Sprite => "sprite",
            StepType::Filmstrip => "filmstrip",
            StepType::Transcode => "transcode",
            StepType::Audio => "audio",
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self, StepType::Probe)
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input handed to a step: identifying references plus the step's own
/// parameters, flattened into one object on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepInput {
    #[serde(rename = "type")]
    pub step: StepType,
    pub upload_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_id: Option<String>,
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl StepInput {
    pub fn new(step: StepType, upload_id: &str, media_id: Option<&str>) -> Self {
        Self {
            step,
            upload_id: upload_id.to_string(),
            media_id: media_id.map(str::to_string),
            params: Map::new(),
        }
    }

    pub fn with_params(mut self, params: Map<String, Value>) -> Self {
        self.params = params;
        self
    }

    /// Typed view of the parameters.
    pub fn params_as<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.params.clone()))
    }
}

/// One node of a flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowNode {
    /// Deterministic id, `<task id>:<step>`.
    pub id: String,
    pub step: StepType,
    pub input: StepInput,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<String>,
}

impl FlowNode {
    pub fn node_id(task_id: &str, step: StepType) -> String {
        format!("{}:{}", task_id, step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn registry_lists_probe_first_then_optional_steps() {
        assert_eq!(StepType::ALL[0], StepType::Probe);
        assert_eq!(&StepType::ALL[1..], &StepType::OPTIONAL[..]);
        assert!(StepType::OPTIONAL.iter().all(|s| !s.is_root()));
    }

    #[test]
    fn step_names_are_lowercase_and_match_serde() {
        for step in StepType::ALL {
            let serialized = serde_json::to_value(step).unwrap();
            assert_eq!(serialized, json!(step.as_str()));
            assert_eq!(step.to_string(), step.as_str().to_lowercase());
        }
    }

    #[test]
    fn step_input_flattens_params_and_omits_missing_media_id() {
        let mut params = Map::new();
        params.insert("width".to_string(), json!(320));
        let input = StepInput::new(StepType::Thumbnail, "up-1", None).with_params(params);

        assert_eq!(
            serde_json::to_value(&input).unwrap(),
            json!({"type": "thumbnail", "uploadId": "up-1", "width": 320})
        );
    }

    #[test]
    fn node_id_combines_task_and_step() {
        assert_eq!(FlowNode::node_id("t1", StepType::Sprite), "t1:sprite");
    }
}
