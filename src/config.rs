//! Configuration for the worker process.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Worker configuration, read from the environment.
#[derive(Clone, Debug)]
pub struct WorkerConfig {
    /// Redis connection URL for the task store and queue
    pub redis_url: String,
    /// Root directory of the filesystem storage
    pub storage_dir: PathBuf,
    /// Number of concurrent worker loops
    pub workers: usize,
    /// Maximum dependent steps of one flow running at once
    pub max_parallel_steps: usize,
    /// Per-step timeout in seconds
    pub step_timeout_secs: u64,
    /// How long a worker blocks waiting for a task id
    pub dequeue_timeout_secs: f64,
    /// ffmpeg executable
    pub ffmpeg_path: String,
    /// ffprobe executable
    pub ffprobe_path: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            redis_url: String::from("redis://127.0.0.1/"),
            storage_dir: PathBuf::from("./data"),
            workers: 4,
            max_parallel_steps: 5,
            step_timeout_secs: 3600,
            dequeue_timeout_secs: 5.0,
            ffmpeg_path: String::from("ffmpeg"),
            ffprobe_path: String::from("ffprobe"),
        }
    }
}

impl WorkerConfig {
    /// Load configuration from environment variables (and `.env`).
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    /// Missing or unparseable values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            redis_url: lookup("REDIS_URL").unwrap_or(defaults.redis_url),
            storage_dir: lookup("STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_dir),
            workers: parsed::<usize>(&lookup, "WORKERS")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.workers),
            max_parallel_steps: parsed::<usize>(&lookup, "MAX_PARALLEL_STEPS")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_parallel_steps),
            step_timeout_secs: parsed::<u64>(&lookup, "STEP_TIMEOUT_SECS")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.step_timeout_secs),
            dequeue_timeout_secs: parsed::<f64>(&lookup, "DEQUEUE_TIMEOUT_SECS")
                .filter(|n| n.is_finite() && *n >= 0.0)
                .unwrap_or(defaults.dequeue_timeout_secs),
            ffmpeg_path: lookup("FFMPEG_PATH").unwrap_or(defaults.ffmpeg_path),
            ffprobe_path: lookup("FFPROBE_PATH").unwrap_or(defaults.ffprobe_path),
        }
    }

    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_secs)
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = WorkerConfig::from_lookup(|_| None);
        assert_eq!(config.redis_url, "redis://127.0.0.1/");
        assert_eq!(config.workers, 4);
        assert_eq!(config.max_parallel_steps, 5);
        assert_eq!(config.step_timeout(), Duration::from_secs(3600));
        assert_eq!(config.ffprobe_path, "ffprobe");
    }

    #[test]
    fn reads_overrides() {
        let config = WorkerConfig::from_lookup(lookup_from(&[
            ("REDIS_URL", "redis://cache:6379/"),
            ("STORAGE_DIR", "/srv/media"),
            ("WORKERS", "8"),
            ("MAX_PARALLEL_STEPS", "2"),
            ("DEQUEUE_TIMEOUT_SECS", "1.5"),
            ("FFMPEG_PATH", "/opt/ffmpeg/bin/ffmpeg"),
        ]));
        assert_eq!(config.redis_url, "redis://cache:6379/");
        assert_eq!(config.storage_dir, PathBuf::from("/srv/media"));
        assert_eq!(config.workers, 8);
        assert_eq!(config.max_parallel_steps, 2);
        assert_eq!(config.dequeue_timeout_secs, 1.5);
        assert_eq!(config.ffmpeg_path, "/opt/ffmpeg/bin/ffmpeg");
    }

    #[test]
    fn invalid_numbers_fall_back() {
        let config = WorkerConfig::from_lookup(lookup_from(&[
            ("WORKERS", "lots"),
            ("MAX_PARALLEL_STEPS", "0"),
            ("STEP_TIMEOUT_SECS", "-3"),
        ]));
        assert_eq!(config.workers, 4);
        assert_eq!(config.max_parallel_steps, 5);
        assert_eq!(config.step_timeout_secs, 3600);
    }
}
