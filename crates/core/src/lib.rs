//! Entity model for the scantrad client.
//!
//! Defines batches and pages, their status machines, the derived
//! batch-status rule, and read-only display projections. Everything in
//! this crate is pure data and pure functions. Persistence lives in
//! `scantrad-store`, mutation in `scantrad-engine`, and remote state in
//! `scantrad-client`.

pub mod batch;
pub mod page;
pub mod projection;
pub mod types;

pub use batch::{derive_batch_status, Batch, BatchGraph, BatchStatus};
pub use page::{ImageRef, Page, PageStatus, PageUpdate};
pub use types::{BatchId, PageId, Timestamp};
