//! Local adapters: filesystem storage, in-memory store, ffmpeg processing
//! and (with the `redis` feature) the Redis store and queue.

pub mod ffmpeg;
pub mod fs;
pub mod memory;

#[cfg(feature = "redis")]
pub mod redis;

pub use ffmpeg::{FfmpegProcessor, SystemCommandRunner};
pub use fs::FsAdapter;
pub use memory::InMemoryStore;

#[cfg(feature = "redis")]
pub use redis::RedisPool;
