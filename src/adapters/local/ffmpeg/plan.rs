//! ffmpeg / ffprobe argument construction.
//!
//! Pure functions: given a node's parameters and the probed media, decide the
//! command line, the artifact file name and the details reported back on the
//! task. Nothing here touches the filesystem.

use crate::domain::error::StepError;
use crate::domain::media::MediaInfo;
use crate::domain::step::{StepInput, StepType};
use crate::domain::task::{AudioConfig, FilmstripConfig, SpriteConfig, ThumbnailConfig, TranscodeConfig};
use serde_json::{json, Map, Value};
use std::path::Path;

const SPRITE_GRID: u32 = 5;
const SPRITE_TILE_WIDTH: u32 = 160;
const FILMSTRIP_FRAMES: u32 = 10;
const FILMSTRIP_HEIGHT: u32 = 120;
const DEFAULT_CRF: u32 = 23;

/// What to run for one dependent step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepPlan {
    pub args: Vec<String>,
    /// Artifact file name, also the last element of `args`
    pub file_name: String,
    /// Extra fields merged into the step result
    pub details: Map<String, Value>,
}

pub fn probe_args(source: &Path) -> Vec<String> {
    vec![
        "-v".into(),
        "error".into(),
        "-print_format".into(),
        "json".into(),
        "-show_format".into(),
        "-show_streams".into(),
        path_arg(source),
    ]
}

/// Plans a dependent step. `out_dir` is where ffmpeg writes the artifact.
pub fn plan_step(
    input: &StepInput,
    media: &MediaInfo,
    source: &Path,
    out_dir: &Path,
) -> Result<StepPlan, StepError> {
    match input.step {
        StepType::Probe => Err(StepError::InvalidProbe(
            "probe has no ffmpeg plan".to_string(),
        )),
        StepType::Thumbnail => thumbnail(&params(input)?, media, source, out_dir),
        StepType::Sprite => sprite(&params(input)?, media, source, out_dir),
        StepType::Filmstrip => filmstrip(&params(input)?, media, source, out_dir),
        StepType::Transcode => transcode(&params(input)?, media, source, out_dir),
        StepType::Audio => audio(&params(input)?, media, source, out_dir),
    }
}

fn params<T: serde::de::DeserializeOwned>(input: &StepInput) -> Result<T, StepError> {
    input.params_as().map_err(|source| StepError::Params {
        step: input.step,
        source,
    })
}

fn thumbnail(
    cfg: &ThumbnailConfig,
    media: &MediaInfo,
    source: &Path,
    out_dir: &Path,
) -> Result<StepPlan, StepError> {
    require_video(media)?;
    let latest = (media.duration - 0.1).max(0.0);
    let timestamp = cfg.timestamp_secs().unwrap_or(media.duration * 0.1).clamp(0.0, latest);
    let format = cfg.format.as_deref().unwrap_or("jpg");
    let file_name = format!("thumbnail.{}", format);

    let mut args = vec![
        "-y".into(),
        "-ss".into(),
        format!("{:.3}", timestamp),
        "-i".into(),
        path_arg(source),
        "-frames:v".into(),
        "1".into(),
    ];
    if let Some(scale) = scale_filter(cfg.width, cfg.height) {
        args.push("-vf".into());
        args.push(scale);
    }
    args.push(path_arg(&out_dir.join(&file_name)));

    Ok(StepPlan {
        args,
        file_name,
        details: details(json!({ "timestamp": timestamp })),
    })
}

fn sprite(
    cfg: &SpriteConfig,
    media: &MediaInfo,
    source: &Path,
    out_dir: &Path,
) -> Result<StepPlan, StepError> {
    require_video(media)?;
    let columns = cfg.columns.unwrap_or(SPRITE_GRID);
    let rows = cfg.rows.unwrap_or(SPRITE_GRID);
    let interval = cfg
        .interval_secs()
        .unwrap_or_else(|| media.duration / (f64::from(columns) * f64::from(rows)))
        .max(0.1);
    let tile_width = cfg.tile_width.unwrap_or(SPRITE_TILE_WIDTH);
    let scale = scale_filter(Some(tile_width), cfg.tile_height)
        .unwrap_or_else(|| format!("scale={}:-2", tile_width));
    let file_name = "sprite.jpg".to_string();

    let args = vec![
        "-y".into(),
        "-i".into(),
        path_arg(source),
        "-vf".into(),
        format!("fps=1/{},{},tile={}x{}", interval, scale, columns, rows),
        "-frames:v".into(),
        "1".into(),
        path_arg(&out_dir.join(&file_name)),
    ];

    Ok(StepPlan {
        args,
        file_name,
        details: details(json!({
            "columns": columns,
            "rows": rows,
            "interval": interval,
            "tileWidth": tile_width,
        })),
    })
}

fn filmstrip(
    cfg: &FilmstripConfig,
    media: &MediaInfo,
    source: &Path,
    out_dir: &Path,
) -> Result<StepPlan, StepError> {
    require_video(media)?;
    if media.duration <= 0.0 {
        return Err(StepError::InvalidProbe("zero duration".to_string()));
    }
    let frames = cfg.frames.unwrap_or(FILMSTRIP_FRAMES);
    let height = cfg.height.or(if cfg.width.is_none() {
        Some(FILMSTRIP_HEIGHT)
    } else {
        None
    });
    let scale = scale_filter(cfg.width, height)
        .unwrap_or_else(|| format!("scale=-2:{}", FILMSTRIP_HEIGHT));
    let file_name = "filmstrip.jpg".to_string();

    let args = vec![
        "-y".into(),
        "-i".into(),
        path_arg(source),
        "-vf".into(),
        format!(
            "fps={:.6},{},tile={}x1",
            f64::from(frames) / media.duration,
            scale,
            frames
        ),
        "-frames:v".into(),
        "1".into(),
        path_arg(&out_dir.join(&file_name)),
    ];

    Ok(StepPlan {
        args,
        file_name,
        details: details(json!({ "frames": frames })),
    })
}

fn transcode(
    cfg: &TranscodeConfig,
    media: &MediaInfo,
    source: &Path,
    out_dir: &Path,
) -> Result<StepPlan, StepError> {
    require_video(media)?;
    let file_name = "transcode.mp4".to_string();

    let mut args = vec![
        "-y".into(),
        "-i".into(),
        path_arg(source),
        "-map".into(),
        "0:v:0".into(),
        "-map".into(),
        "0:a:0?".into(),
        "-c:v".into(),
        cfg.codec.clone().unwrap_or_else(|| "libx264".to_string()),
        "-preset".into(),
        cfg.preset.clone().unwrap_or_else(|| "medium".to_string()),
        "-crf".into(),
        cfg.crf.unwrap_or(DEFAULT_CRF).to_string(),
    ];
    if let Some(bitrate) = &cfg.bitrate {
        args.push("-b:v".into());
        args.push(bitrate.clone());
    }

    // Never upscale.
    let target_height = match (cfg.height, media.height) {
        (Some(wanted), Some(actual)) if wanted < actual => Some(wanted),
        (Some(wanted), None) => Some(wanted),
        _ => None,
    };
    if let Some(height) = target_height {
        args.push("-vf".into());
        args.push(format!("scale=-2:{}", height));
    }

    args.extend([
        "-c:a".into(),
        "aac".into(),
        "-movflags".into(),
        "+faststart".into(),
        path_arg(&out_dir.join(&file_name)),
    ]);

    let height = target_height.or(media.height);
    Ok(StepPlan {
        args,
        file_name,
        details: details(json!({ "height": height })),
    })
}

fn audio(
    cfg: &AudioConfig,
    media: &MediaInfo,
    source: &Path,
    out_dir: &Path,
) -> Result<StepPlan, StepError> {
    if !media.has_audio {
        return Err(StepError::NoAudioStream);
    }
    let format = cfg.format.as_deref().unwrap_or("mp3");
    let (codec, lossless) = match format {
        "aac" => ("aac", false),
        "wav" => ("pcm_s16le", true),
        "flac" => ("flac", true),
        "opus" => ("libopus", false),
        _ => ("libmp3lame", false),
    };
    let extension = if format == "aac" { "m4a" } else { format };
    let file_name = format!("audio.{}", extension);

    let mut args = vec![
        "-y".into(),
        "-i".into(),
        path_arg(source),
        "-vn".into(),
        "-c:a".into(),
        codec.to_string(),
    ];
    if let (Some(bitrate), false) = (&cfg.bitrate, lossless) {
        args.push("-b:a".into());
        args.push(bitrate.clone());
    }
    if let Some(channels) = cfg.channels {
        args.push("-ac".into());
        args.push(channels.to_string());
    }
    if let Some(rate) = cfg.sample_rate {
        args.push("-ar".into());
        args.push(rate.to_string());
    }
    args.push(path_arg(&out_dir.join(&file_name)));

    Ok(StepPlan {
        args,
        file_name,
        details: details(json!({ "format": format })),
    })
}

fn require_video(media: &MediaInfo) -> Result<(), StepError> {
    if media.has_video() {
        Ok(())
    } else {
        Err(StepError::NoVideoStream)
    }
}

/// `-2` keeps the aspect ratio with an even dimension.
fn scale_filter(width: Option<u32>, height: Option<u32>) -> Option<String> {
    match (width, height) {
        (Some(w), Some(h)) => Some(format!("scale={}:{}", w, h)),
        (Some(w), None) => Some(format!("scale={}:-2", w)),
        (None, Some(h)) => Some(format!("scale=-2:{}", h)),
        (None, None) => None,
    }
}

fn details(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::flow::build_flow_for;
    use crate::domain::task::TaskPayload;
    use std::path::PathBuf;

    fn media() -> MediaInfo {
        MediaInfo {
            duration: 50.0,
            width: Some(1920),
            height: Some(1080),
            frame_rate: Some(30.0),
            video_codec: Some("h264".to_string()),
            audio_codec: Some("aac".to_string()),
            has_audio: true,
        }
    }

    fn input_for(payload: serde_json::Value, step: StepType) -> StepInput {
        let payload: TaskPayload = serde_json::from_value(payload).unwrap();
        build_flow_for("t1", &payload)
            .get(step)
            .map(|node| node.input.clone())
            .unwrap()
    }

    fn plan_for(input: &StepInput, media: &MediaInfo) -> Result<StepPlan, StepError> {
        plan_step(input, media, &PathBuf::from("/w/source"), &PathBuf::from("/w/out"))
    }

    #[test]
    fn probe_args_request_json() {
        let args = probe_args(&PathBuf::from("/w/source"));
        assert_eq!(
            args,
            vec![
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
                "/w/source"
            ]
        );
    }

    #[test]
    fn thumbnail_defaults_to_ten_percent_jpg() {
        let input = input_for(
            serde_json::json!({"uploadId": "up-1", "thumbnail": {}}),
            StepType::Thumbnail,
        );
        let plan = plan_for(&input, &media()).unwrap();

        assert_eq!(plan.file_name, "thumbnail.jpg");
        assert_eq!(plan.args[1..3], ["-ss".to_string(), "5.000".to_string()]);
        assert!(!plan.args.contains(&"-vf".to_string()));
        assert_eq!(plan.args.last().unwrap(), "/w/out/thumbnail.jpg");
    }

    #[test]
    fn thumbnail_timestamp_is_clamped_into_media() {
        let input = input_for(
            serde_json::json!({
                "uploadId": "up-1",
                "thumbnail": {"timestamp": 900.0, "width": 320, "format": "webp"}
            }),
            StepType::Thumbnail,
        );
        let plan = plan_for(&input, &media()).unwrap();

        assert_eq!(plan.args[2], "49.900");
        assert!(plan.args.contains(&"scale=320:-2".to_string()));
        assert_eq!(plan.file_name, "thumbnail.webp");
        assert_eq!(plan.details["timestamp"], serde_json::json!(49.9));
    }

    #[test]
    fn sprite_spreads_tiles_across_duration() {
        let input = input_for(
            serde_json::json!({"uploadId": "up-1", "sprite": {"columns": 5, "rows": 2}}),
            StepType::Sprite,
        );
        let plan = plan_for(&input, &media()).unwrap();

        assert!(plan
            .args
            .contains(&"fps=1/5,scale=160:-2,tile=5x2".to_string()));
        assert_eq!(plan.details["interval"], serde_json::json!(5.0));
    }

    #[test]
    fn oversized_sprite_grid_does_not_overflow() {
        let input = input_for(
            serde_json::json!({"uploadId": "up-1", "sprite": {"columns": 70000, "rows": 70000}}),
            StepType::Sprite,
        );
        let plan = plan_for(&input, &media()).unwrap();

        assert!(plan
            .args
            .contains(&"fps=1/0.1,scale=160:-2,tile=70000x70000".to_string()));
    }

    #[test]
    fn filmstrip_tiles_frames_horizontally() {
        let input = input_for(
            serde_json::json!({"uploadId": "up-1", "filmstrip": {"frames": 5}}),
            StepType::Filmstrip,
        );
        let plan = plan_for(&input, &media()).unwrap();

        assert!(plan
            .args
            .contains(&"fps=0.100000,scale=-2:120,tile=5x1".to_string()));
        assert_eq!(plan.file_name, "filmstrip.jpg");
    }

    #[test]
    fn transcode_never_upscales() {
        let input = input_for(
            serde_json::json!({"uploadId": "up-1", "transcode": {"enabled": true, "height": 2160}}),
            StepType::Transcode,
        );
        let plan = plan_for(&input, &media()).unwrap();
        assert!(!plan.args.iter().any(|a| a.starts_with("scale=")));
        assert_eq!(plan.details["height"], serde_json::json!(1080));

        let input = input_for(
            serde_json::json!({
                "uploadId": "up-1",
                "transcode": {"enabled": true, "height": 720, "crf": 28, "bitrate": "2M"}
            }),
            StepType::Transcode,
        );
        let plan = plan_for(&input, &media()).unwrap();
        assert!(plan.args.contains(&"scale=-2:720".to_string()));
        assert!(plan.args.windows(2).any(|w| w == ["-crf", "28"]));
        assert!(plan.args.windows(2).any(|w| w == ["-b:v", "2M"]));
    }

    #[test]
    fn audio_maps_format_to_codec() {
        let input = input_for(
            serde_json::json!({
                "uploadId": "up-1",
                "audio": {"enabled": true, "format": "aac", "bitrate": "256k", "channels": 1, "sampleRate": 44100}
            }),
            StepType::Audio,
        );
        let plan = plan_for(&input, &media()).unwrap();

        assert_eq!(plan.file_name, "audio.m4a");
        assert!(plan.args.windows(2).any(|w| w == ["-c:a", "aac"]));
        assert!(plan.args.windows(2).any(|w| w == ["-b:a", "256k"]));
        assert!(plan.args.windows(2).any(|w| w == ["-ac", "1"]));
        assert!(plan.args.windows(2).any(|w| w == ["-ar", "44100"]));
    }

    #[test]
    fn lossless_audio_ignores_bitrate() {
        let input = input_for(
            serde_json::json!({"uploadId": "up-1", "audio": {"enabled": true, "format": "flac", "bitrate": "320k"}}),
            StepType::Audio,
        );
        let plan = plan_for(&input, &media()).unwrap();
        assert!(!plan.args.contains(&"-b:a".to_string()));
    }

    #[test]
    fn missing_streams_fail_the_step() {
        let audio_only = MediaInfo {
            duration: 10.0,
            has_audio: true,
            audio_codec: Some("mp3".to_string()),
            ..Default::default()
        };
        let input = input_for(
            serde_json::json!({"uploadId": "up-1", "sprite": {}}),
            StepType::Sprite,
        );
        assert!(matches!(plan_for(&input, &audio_only), Err(StepError::NoVideoStream)));

        let silent = MediaInfo {
            has_audio: false,
            ..media()
        };
        let input = input_for(
            serde_json::json!({"uploadId": "up-1", "audio": {"enabled": true}}),
            StepType::Audio,
        );
        assert!(matches!(plan_for(&input, &silent), Err(StepError::NoAudioStream)));
    }
}
