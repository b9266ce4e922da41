//! Step selection predicates.
//!
//! Each predicate looks at one sub-config of the payload and nothing else.
//! An absent sub-config means "not requested", never an error.

use super::step::StepType;
use super::task::TaskPayload;

pub fn wants_thumbnail(payload: &TaskPayload) -> bool {
    payload.thumbnail.is_some()
}

pub fn wants_sprite(payload: &TaskPayload) -> bool {
    payload.sprite.is_some()
}

pub fn wants_filmstrip(payload: &TaskPayload) -> bool {
    payload.filmstrip.is_some()
}

// Transcode and audio need an explicit `enabled: true`; presence alone is not enough.
pub fn wants_transcode(payload: &TaskPayload) -> bool {
    payload.transcode.as_ref().is_some_and(|t| t.enabled)
}

pub fn wants_audio(payload: &TaskPayload) -> bool {
    payload.audio.as_ref().is_some_and(|a| a.enabled)
}

/// Whether `step` belongs in the flow for `payload`.
pub fn is_selected(step: StepType, payload: &TaskPayload) -> bool {
    match step {
        StepType::Probe => true,
        StepType::Thumbnail => wants_thumbnail(payload),
        StepType::Sprite => wants_sprite(payload),
        StepType::Filmstrip => wants_filmstrip(payload),
        StepType::Transcode => wants_transcode(payload),
        StepType::Audio => wants_audio(payload),
    }
}

/// Selected steps in registry order, probe included.
pub fn selected_steps(payload: &TaskPayload) -> Vec<StepType> {
    StepType::ALL
        .into_iter()
        .filter(|step| is_selected(*step, payload))
        .collect()
}
