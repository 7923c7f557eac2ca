//! Batch/page lifecycle engine.
//!
//! Owns the authoritative entity graph for locally processed batches:
//! creates batches from uploaded files, drives each page through the
//! simulated translation pipeline with progress callbacks, and persists
//! every transition synchronously through `scantrad-store`. Backend-backed
//! batches live in `scantrad-client` instead; this engine doubles as the
//! offline/dev path and the test fixture for the processing contract.

pub mod engine;
pub mod preview;
mod simulate;

pub use engine::{EngineError, LifecycleEngine, PacingConfig, PageSource};
pub use preview::{FsPreviewStore, PreviewStore};
