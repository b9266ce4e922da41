use super::cmd::CommandRunner;
use super::plan::{plan_step, probe_args};
use crate::domain::error::StepError;
use crate::domain::media::MediaInfo;
use crate::domain::step::{FlowNode, StepType};
use crate::ports::processor::StepProcessor;
use crate::ports::storage::{derived_key, source_key, StoragePort};
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::process::Output;
use tempfile::TempDir;
use tracing::{debug, info};

/// Runs flow nodes with the ffmpeg and ffprobe command line tools.
///
/// Each node works in its own temporary directory: the source is downloaded
/// from storage, processed, and the artifact uploaded under
/// `derived/<uploadId>/`.
pub struct FfmpegProcessor<R, S> {
    runner: R,
    storage: S,
    ffmpeg: String,
    ffprobe: String,
}

impl<R, S> FfmpegProcessor<R, S>
where
    R: CommandRunner,
    S: StoragePort,
{
    pub fn new(runner: R, storage: S) -> Self {
        Self {
            runner,
            storage,
            ffmpeg: String::from("ffmpeg"),
            ffprobe: String::from("ffprobe"),
        }
    }

    pub fn with_binaries(mut self, ffmpeg: impl Into<String>, ffprobe: impl Into<String>) -> Self {
        self.ffmpeg = ffmpeg.into();
        self.ffprobe = ffprobe.into();
        self
    }

    async fn fetch_source(&self, node: &FlowNode) -> Result<(TempDir, PathBuf), StepError> {
        let workdir = tempfile::tempdir()?;
        let source = workdir.path().join("source");
        self.storage
            .download(&source_key(&node.input.upload_id), &source)
            .await
            .map_err(StepError::storage)?;
        Ok((workdir, source))
    }

    async fn run_checked(
        &self,
        step: StepType,
        program: &str,
        args: &[String],
    ) -> Result<Output, StepError> {
        debug!(%step, program, ?args, "Running command");
        let output = self.runner.run(program, args).await?;
        if !output.status.success() {
            return Err(StepError::Command {
                step,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output)
    }
}

#[async_trait]
impl<R, S> StepProcessor for FfmpegProcessor<R, S>
where
    R: CommandRunner,
    S: StoragePort,
{
    async fn probe(&self, node: &FlowNode) -> Result<MediaInfo, StepError> {
        let (_workdir, source) = self.fetch_source(node).await?;

        let output = self
            .run_checked(node.step, &self.ffprobe, &probe_args(&source))
            .await?;
        let probe: Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| StepError::InvalidProbe(e.to_string()))?;
        let media = MediaInfo::from_ffprobe(&probe)?;

        info!(
            upload_id = %node.input.upload_id,
            duration = media.duration,
            "Probed source"
        );
        Ok(media)
    }

    async fn process(&self, node: &FlowNode, media: &MediaInfo) -> Result<Value, StepError> {
        // The root is handled by `probe`.
        if node.step.is_root() {
            return Err(StepError::InvalidProbe(format!(
                "{} is not a dependent step",
                node.step
            )));
        }

        let (workdir, source) = self.fetch_source(node).await?;
        let plan = plan_step(&node.input, media, &source, workdir.path())?;

        self.run_checked(node.step, &self.ffmpeg, &plan.args).await?;

        let artifact = workdir.path().join(&plan.file_name);
        if !tokio::fs::try_exists(&artifact).await.unwrap_or(false) {
            return Err(StepError::NoOutput { step: node.step });
        }

        let key = derived_key(&node.input.upload_id, &plan.file_name);
        self.storage
            .upload(&artifact, &key)
            .await
            .map_err(StepError::storage)?;
        info!(step = %node.step, key = %key, "Uploaded artifact");

        let mut result = plan.details;
        result.insert("key".to_string(), Value::String(key));
        Ok(Value::Object(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::local::ffmpeg::cmd::MockCommandRunner;
    use crate::adapters::local::fs::FsAdapter;
    use crate::domain::flow::build_flow_for;
    use crate::domain::task::TaskPayload;
    use serde_json::json;
    use std::os::unix::process::ExitStatusExt;
    use std::process::ExitStatus;
    use tempfile::tempdir;

    fn output(code: i32, stdout: &str, stderr: &str) -> Output {
        Output {
            status: ExitStatus::from_raw(code << 8),
            stdout: stdout.as_bytes().to_vec(),
            stderr: stderr.as_bytes().to_vec(),
        }
    }

    fn storage_with_upload() -> (TempDir, FsAdapter) {
        let root = tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("uploads")).unwrap();
        std::fs::write(root.path().join("uploads/up-1"), b"fake video").unwrap();
        let storage = FsAdapter::new(root.path());
        (root, storage)
    }

    fn flow() -> crate::domain::flow::Flow {
        let payload: TaskPayload = serde_json::from_value(json!({
            "uploadId": "up-1",
            "thumbnail": {"width": 320},
            "audio": {"enabled": true, "format": "mp3"}
        }))
        .unwrap();
        build_flow_for("t1", &payload)
    }

    const PROBE_JSON: &str = r#"{
        "streams": [
            {"codec_type": "video", "codec_name": "h264", "width": 640, "height": 360, "avg_frame_rate": "25/1"},
            {"codec_type": "audio", "codec_name": "aac"}
        ],
        "format": {"duration": "8.0"}
    }"#;

    #[tokio::test]
    async fn probe_parses_ffprobe_output() {
        let (_root, storage) = storage_with_upload();
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|program, args| {
                program.ends_with("ffprobe") && args.last().is_some_and(|a| a.ends_with("source"))
            })
            .times(1)
            .returning(|_, _| Ok(output(0, PROBE_JSON, "")));

        let processor = FfmpegProcessor::new(runner, storage);
        let media = processor.probe(&flow().root).await.unwrap();

        assert_eq!(media.duration, 8.0);
        assert_eq!(media.height, Some(360));
        assert!(media.has_audio);
    }

    #[tokio::test]
    async fn probe_failure_reports_stderr() {
        let (_root, storage) = storage_with_upload();
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .returning(|_, _| Ok(output(1, "", "moov atom not found\n")));

        let processor = FfmpegProcessor::new(runner, storage);
        let err = processor.probe(&flow().root).await.unwrap_err();

        match err {
            StepError::Command { step, stderr } => {
                assert_eq!(step, StepType::Probe);
                assert_eq!(stderr, "moov atom not found");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn missing_upload_is_a_storage_error() {
        let root = tempdir().unwrap();
        let processor = FfmpegProcessor::new(MockCommandRunner::new(), FsAdapter::new(root.path()));

        let err = processor.probe(&flow().root).await.unwrap_err();
        assert!(matches!(err, StepError::Storage(_)));
    }

    #[tokio::test]
    async fn thumbnail_is_uploaded_under_derived_key() {
        let (root, storage) = storage_with_upload();
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|program, args| {
                program.starts_with("/opt/ffmpeg") && args.contains(&"scale=320:-2".to_string())
            })
            .times(1)
            .returning(|_, args| {
                std::fs::write(args.last().unwrap(), b"jpeg").unwrap();
                Ok(output(0, "", ""))
            });

        let processor =
            FfmpegProcessor::new(runner, storage).with_binaries("/opt/ffmpeg", "/opt/ffprobe");
        let flow = flow();
        let node = flow.get(StepType::Thumbnail).unwrap();
        let media = MediaInfo::from_ffprobe(&serde_json::from_str(PROBE_JSON).unwrap()).unwrap();

        let result = processor.process(node, &media).await.unwrap();

        assert_eq!(result["key"], json!("derived/up-1/thumbnail.jpg"));
        assert_eq!(
            std::fs::read(root.path().join("derived/up-1/thumbnail.jpg")).unwrap(),
            b"jpeg"
        );
    }

    #[tokio::test]
    async fn root_node_is_not_processed() {
        let (_root, storage) = storage_with_upload();
        let mut runner = MockCommandRunner::new();
        runner.expect_run().times(0);

        let processor = FfmpegProcessor::new(runner, storage);
        let media = MediaInfo::from_ffprobe(&serde_json::from_str(PROBE_JSON).unwrap()).unwrap();

        let err = processor.process(&flow().root, &media).await.unwrap_err();
        assert!(matches!(err, StepError::InvalidProbe(_)));
    }

    #[tokio::test]
    async fn silent_ffmpeg_run_is_no_output() {
        let (_root, storage) = storage_with_upload();
        let mut runner = MockCommandRunner::new();
        runner.expect_run().returning(|_, _| Ok(output(0, "", "")));

        let processor = FfmpegProcessor::new(runner, storage);
        let flow = flow();
        let node = flow.get(StepType::Audio).unwrap();
        let media = MediaInfo::from_ffprobe(&serde_json::from_str(PROBE_JSON).unwrap()).unwrap();

        let err = processor.process(node, &media).await.unwrap_err();
        assert!(matches!(err, StepError::NoOutput { step: StepType::Audio }));
    }
}
