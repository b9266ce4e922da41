use super::error::StepError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Media metadata extracted by the probe step. Every other step reads it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaInfo {
    /// Duration in seconds
    pub duration: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_codec: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_codec: Option<String>,
    pub has_audio: bool,
}

impl MediaInfo {
    pub fn has_video(&self) -> bool {
        self.video_codec.is_some()
    }

    /// Parses `ffprobe -print_format json -show_format -show_streams` output.
    pub fn from_ffprobe(probe: &Value) -> Result<Self, StepError> {
        let streams = probe
            .get("streams")
            .and_then(|s| s.as_array())
            .ok_or_else(|| StepError::InvalidProbe("missing streams".to_string()))?;

        let video = streams.iter().find(|s| codec_type(s) == Some("video"));
        let audio = streams.iter().find(|s| codec_type(s) == Some("audio"));

        // Container duration first, then the video stream's own.
        let duration = probe
            .get("format")
            .and_then(|f| f.get("duration"))
            .and_then(number)
            .or_else(|| video.and_then(|v| v.get("duration")).and_then(number))
            .ok_or_else(|| StepError::InvalidProbe("missing duration".to_string()))?;

        if video.is_none() && audio.is_none() {
            return Err(StepError::InvalidProbe(
                "no audio or video stream".to_string(),
            ));
        }

        Ok(MediaInfo {
            duration,
            width: video.and_then(|v| dimension(v, "width")),
            height: video.and_then(|v| dimension(v, "height")),
            frame_rate: video
                .and_then(|v| v.get("avg_frame_rate").or_else(|| v.get("r_frame_rate")))
                .and_then(|r| r.as_str())
                .and_then(parse_rational),
            video_codec: video.and_then(|v| codec_name(v)),
            audio_codec: audio.and_then(|a| codec_name(a)),
            has_audio: audio.is_some(),
        })
    }
}

fn codec_type(stream: &Value) -> Option<&str> {
    stream.get("codec_type").and_then(|v| v.as_str())
}

fn codec_name(stream: &Value) -> Option<String> {
    stream
        .get("codec_name")
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

fn dimension(stream: &Value, key: &str) -> Option<u32> {
    stream
        .get(key)
        .and_then(|v| v.as_u64())
        .and_then(|v| u32::try_from(v).ok())
        .filter(|v| *v > 0)
}

// ffprobe prints most numbers as strings.
fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Parses a frame rate like `30000/1001`. `0/0` means unknown.
fn parse_rational(rate: &str) -> Option<f64> {
    match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 || num == 0.0 {
                None
            } else {
                Some(num / den)
            }
        }
        None => rate.trim().parse().ok().filter(|r: &f64| *r > 0.0),
    }
}
