//! Payload validation.
//!
//! Runs before flow construction. The builder itself assumes a valid payload
//! and never fails, so anything malformed has to be caught here.

use super::error::ValidationError;
use super::task::TaskPayload;
use regex::Regex;
use std::sync::LazyLock;

static BITRATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+[kKmM]?$").expect("bitrate pattern is valid"));

pub const IMAGE_FORMATS: [&str; 3] = ["jpg", "png", "webp"];
pub const AUDIO_FORMATS: [&str; 5] = ["mp3", "aac", "wav", "flac", "opus"];

pub const MAX_DIMENSION: u32 = 8192;
pub const MAX_GRID: u32 = 100;
pub const MAX_FILMSTRIP_FRAMES: u32 = 500;

pub fn validate_payload(payload: &TaskPayload) -> Result<(), ValidationError> {
    validate_upload_id(&payload.upload_id)?;

    if let Some(media_id) = &payload.media_id {
        if media_id.trim().is_empty() {
            return Err(ValidationError::invalid("mediaId", "must not be empty"));
        }
    }

    if let Some(thumb) = &payload.thumbnail {
        if let Some(ts) = thumb.timestamp_secs() {
            if !ts.is_finite() || ts < 0.0 {
                return Err(ValidationError::invalid(
                    "thumbnail.timestamp",
                    "must be a non-negative number of seconds",
                ));
            }
        }
        bounded("thumbnail.width", thumb.width, MAX_DIMENSION)?;
        bounded("thumbnail.height", thumb.height, MAX_DIMENSION)?;
        one_of("thumbnail.format", thumb.format.as_deref(), &IMAGE_FORMATS)?;
    }

    if let Some(sprite) = &payload.sprite {
        if let Some(interval) = sprite.interval_secs() {
            if !interval.is_finite() || interval <= 0.0 {
                return Err(ValidationError::invalid(
                    "sprite.interval",
                    "must be greater than zero",
                ));
            }
        }
        bounded("sprite.columns", sprite.columns, MAX_GRID)?;
        bounded("sprite.rows", sprite.rows, MAX_GRID)?;
        bounded("sprite.tileWidth", sprite.tile_width, MAX_DIMENSION)?;
        bounded("sprite.tileHeight", sprite.tile_height, MAX_DIMENSION)?;
    }

    if let Some(strip) = &payload.filmstrip {
        bounded("filmstrip.frames", strip.frames, MAX_FILMSTRIP_FRAMES)?;
        bounded("filmstrip.width", strip.width, MAX_DIMENSION)?;
        bounded("filmstrip.height", strip.height, MAX_DIMENSION)?;
    }

    if let Some(transcode) = &payload.transcode {
        bounded("transcode.height", transcode.height, MAX_DIMENSION)?;
        if let Some(crf) = transcode.crf {
            if crf > 51 {
                return Err(ValidationError::invalid(
                    "transcode.crf",
                    "must be between 0 and 51",
                ));
            }
        }
        bitrate("transcode.bitrate", transcode.bitrate.as_deref())?;
    }

    if let Some(audio) = &payload.audio {
        one_of("audio.format", audio.format.as_deref(), &AUDIO_FORMATS)?;
        bitrate("audio.bitrate", audio.bitrate.as_deref())?;
        if let Some(channels) = audio.channels {
            if !(1..=8).contains(&channels) {
                return Err(ValidationError::invalid(
                    "audio.channels",
                    "must be between 1 and 8",
                ));
            }
        }
        if let Some(rate) = audio.sample_rate {
            if !(8_000..=192_000).contains(&rate) {
                return Err(ValidationError::invalid(
                    "audio.sampleRate",
                    "must be between 8000 and 192000",
                ));
            }
        }
    }

    Ok(())
}

// The upload id becomes part of storage keys.
fn validate_upload_id(upload_id: &str) -> Result<(), ValidationError> {
    if upload_id.trim().is_empty() {
        return Err(ValidationError::MissingUploadId);
    }
    if upload_id.contains(['/', '\\']) || upload_id.contains("..") {
        return Err(ValidationError::invalid(
            "uploadId",
            "must not contain path separators",
        ));
    }
    Ok(())
}

fn bounded(field: &str, value: Option<u32>, max: u32) -> Result<(), ValidationError> {
    match value {
        Some(0) => Err(ValidationError::invalid(field, "must be greater than zero")),
        Some(v) if v > max => Err(ValidationError::invalid(
            field,
            format!("must be at most {}", max),
        )),
        _ => Ok(()),
    }
}

fn bitrate(field: &str, value: Option<&str>) -> Result<(), ValidationError> {
    match value {
        Some(v) if !BITRATE.is_match(v) => Err(ValidationError::invalid(
            field,
            format!("'{}' is not a bitrate like 128k", v),
        )),
        _ => Ok(()),
    }
}

fn one_of(field: &str, value: Option<&str>, allowed: &[&str]) -> Result<(), ValidationError> {
    match value {
        Some(v) if !allowed.contains(&v) => Err(ValidationError::invalid(
            field,
            format!("'{}' is not one of {}", v, allowed.join(", ")),
        )),
        _ => Ok(()),
    }
}
