//! Flow construction.
//!
//! A flow is a two-level DAG: one root step with no dependency and any number
//! of children that each depend on the root and nothing else. Children are
//! mutually independent and may run concurrently once the root finishes.
//!
//! `ConditionalDag` is the generic shape: a root step plus an ordered table of
//! branches, each with a predicate and an input factory. The media pipeline is
//! the `MEDIA_BRANCHES` instance of it, rooted at probe.

use super::selector;
use super::step::{FlowNode, StepInput, StepType};
use super::task::{Task, TaskPayload};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flow {
    pub task_id: String,
    pub root: FlowNode,
    pub children: Vec<FlowNode>,
}

impl Flow {
    /// Root first, then children in registry order.
    pub fn nodes(&self) -> impl Iterator<Item = &FlowNode> {
        std::iter::once(&self.root).chain(self.children.iter())
    }

    pub fn get(&self, step: StepType) -> Option<&FlowNode> {
        self.nodes().find(|node| node.step == step)
    }

    pub fn contains(&self, step: StepType) -> bool {
        self.get(step).is_some()
    }

    pub fn steps(&self) -> Vec<StepType> {
        self.nodes().map(|node| node.step).collect()
    }
}

/// A conditional child of the root.
pub struct Branch<P> {
    pub step: StepType,
    pub select: fn(&P) -> bool,
    pub params: fn(&P) -> Map<String, Value>,
}

pub struct ConditionalDag<'a, P> {
    root: StepType,
    branches: &'a [Branch<P>],
}

impl<'a, P> ConditionalDag<'a, P> {
    pub const fn new(root: StepType, branches: &'a [Branch<P>]) -> Self {
        Self { root, branches }
    }

    pub fn branch_steps(&self) -> impl Iterator<Item = StepType> + '_ {
        self.branches.iter().map(|b| b.step)
    }

    /// Builds the flow for one task. `upload_id` and `media_id` are copied
    /// into every node's input; branch params are merged on top.
    pub fn build(
        &self,
        task_id: &str,
        payload: &P,
        upload_id: &str,
        media_id: Option<&str>,
    ) -> Flow {
        let root_id = FlowNode::node_id(task_id, self.root);
        let root = FlowNode {
            id: root_id.clone(),
            step: self.root,
            input: StepInput::new(self.root, upload_id, media_id),
            depends_on: None,
        };

        let children = self
            .branches
            .iter()
            .filter(|branch| (branch.select)(payload))
            .map(|branch| FlowNode {
                id: FlowNode::node_id(task_id, branch.step),
                step: branch.step,
                input: StepInput::new(branch.step, upload_id, media_id)
                    .with_params((branch.params)(payload)),
                depends_on: Some(root_id.clone()),
            })
            .collect();

        Flow {
            task_id: task_id.to_string(),
            root,
            children,
        }
    }
}

/// Media pipeline branches, in registry order.
pub const MEDIA_BRANCHES: [Branch<TaskPayload>; 5] = [
    Branch {
        step: StepType::Thumbnail,
        select: selector::wants_thumbnail,
        params: thumbnail_params,
    },
    Branch {
        step: StepType::Sprite,
        select: selector::wants_sprite,
        params: sprite_params,
    },
    Branch {
        step: StepType::Filmstrip,
        select: selector::wants_filmstrip,
        params: filmstrip_params,
    },
    Branch {
        step: StepType::Transcode,
        select: selector::wants_transcode,
        params: transcode_params,
    },
    Branch {
        step: StepType::Audio,
        select: selector::wants_audio,
        params: audio_params,
    },
];

pub const MEDIA_DAG: ConditionalDag<'static, TaskPayload> =
    ConditionalDag::new(StepType::Probe, &MEDIA_BRANCHES);

/// Builds the processing flow for a task. Pure and deterministic: the same
/// task always yields the same node ids and inputs.
pub fn build_flow(task: &Task) -> Flow {
    build_flow_for(&task.id, &task.payload)
}

pub fn build_flow_for(task_id: &str, payload: &TaskPayload) -> Flow {
    MEDIA_DAG.build(
        task_id,
        payload,
        &payload.upload_id,
        payload.media_id.as_deref(),
    )
}

fn thumbnail_params(payload: &TaskPayload) -> Map<String, Value> {
    config_params(payload.thumbnail.as_ref())
}

fn sprite_params(payload: &TaskPayload) -> Map<String, Value> {
    config_params(payload.sprite.as_ref())
}

fn filmstrip_params(payload: &TaskPayload) -> Map<String, Value> {
    config_params(payload.filmstrip.as_ref())
}

fn transcode_params(payload: &TaskPayload) -> Map<String, Value> {
    config_params(payload.transcode.as_ref())
}

fn audio_params(payload: &TaskPayload) -> Map<String, Value> {
    config_params(payload.audio.as_ref())
}

// `enabled` only drives selection, it is not a step parameter.
fn config_params<T: Serialize>(config: Option<&T>) -> Map<String, Value> {
    match config.map(serde_json::to_value) {
        Some(Ok(Value::Object(mut map))) => {
            map.remove("enabled");
            map
        }
        _ => Map::new(),
    }
}
