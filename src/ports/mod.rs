//! Ports - Trait definitions for everything outside the domain.

pub mod processor;
pub mod queue;
pub mod storage;
pub mod task_store;
