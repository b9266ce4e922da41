//! ffmpeg-backed step processing.

pub mod cmd;
pub mod plan;
pub mod processor;

pub use cmd::{CommandRunner, SystemCommandRunner};
pub use processor::FfmpegProcessor;
