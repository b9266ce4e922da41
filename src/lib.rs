//! Mediaflow - Conditional media processing flows
//!
//! A task payload names an upload and the derived artifacts wanted from it.
//! The payload becomes a flow: a PROBE root plus one dependent node per
//! selected step (thumbnail, sprite, filmstrip, transcode, audio), which a
//! worker runs with ffmpeg.
//!
//! Hexagonal Architecture:
//! - domain/: Pure business logic (tasks, selection, flow building, validation)
//! - ports/: Trait definitions
//! - adapters/: Concrete implementations
//! - application/: Orchestrator, flow runner and worker services
//! - config: Environment configuration
//!
//! # Features
//! - `redis` (default): Redis-backed task store and queue

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports for convenience
pub use config::WorkerConfig;
pub use domain::flow::{build_flow, build_flow_for, Flow};
pub use domain::task::{Task, TaskPayload, TaskStatus};
