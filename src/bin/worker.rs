//! Worker Binary - Runs flows for queued tasks
//!
//! It wires up:
//! - Redis task store and queue
//! - Filesystem storage and the ffmpeg step processor
//! - A pool of worker loops, stopped on ctrl-c

use mediaflow::adapters::local::{FfmpegProcessor, FsAdapter, RedisPool, SystemCommandRunner};
use mediaflow::application::{spawn_workers, FlowRunner, RunnerConfig, WorkerService};
use mediaflow::config::WorkerConfig;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let config = WorkerConfig::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // 1. Adapters
    let redis = match RedisPool::new(&config.redis_url) {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to connect to Redis: {}", e);
            std::process::exit(1);
        }
    };

    let storage = FsAdapter::new(&config.storage_dir);
    let processor = FfmpegProcessor::new(SystemCommandRunner, storage)
        .with_binaries(&config.ffmpeg_path, &config.ffprobe_path);

    // 2. Application services
    let runner = FlowRunner::new(
        redis.clone(),
        processor,
        RunnerConfig {
            max_parallel_steps: config.max_parallel_steps,
            step_timeout: config.step_timeout(),
        },
    );
    let service = Arc::new(WorkerService::new(
        redis.clone(),
        redis,
        runner,
        config.dequeue_timeout_secs,
    ));

    // 3. Start workers
    let shutdown = CancellationToken::new();
    let mut workers = spawn_workers(service, config.workers, shutdown.clone());
    info!(
        workers = config.workers,
        storage = %config.storage_dir.display(),
        "Started flow workers"
    );

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for ctrl-c: {}", e);
    }
    info!("Shutting down, waiting for running flows to stop");
    shutdown.cancel();
    while workers.join_next().await.is_some() {}
}
