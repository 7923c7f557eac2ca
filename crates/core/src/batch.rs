//! Batch entity and the derived-status rule.
//!
//! A batch's status is never set directly by callers (except `Pending`
//! at creation); it is recomputed from the page set after every page
//! mutation. Completion is sticky: once `completed_at` is stamped it
//! never reverts, even if a page is later reset.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::page::{Page, PageStatus, PageUpdate};
use crate::types::{BatchId, Timestamp};

/// Derived status of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Pending,
    Processing,
    Done,
    /// Only reported by the backend for batches that failed as a whole;
    /// never produced by the derived rule.
    Error,
}

/// The persisted entity graph: batch id → batch.
///
/// Ids are time-derived, so the `BTreeMap` ordering is creation order.
pub type BatchGraph = BTreeMap<BatchId, Batch>;

/// An ordered collection of pages submitted together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub id: BatchId,
    /// Derived; see [`derive_batch_status`].
    pub status: BatchStatus,
    /// Upload order, stable for the batch's lifetime.
    pub pages: Vec<Page>,
    pub created_at: Timestamp,
    /// Stamped exactly once, the first time the derived status becomes
    /// `Done`; never unset afterwards.
    pub completed_at: Option<Timestamp>,
}

impl Batch {
    /// Create a `Pending` batch over the given pages.
    pub fn new(id: impl Into<BatchId>, pages: Vec<Page>, created_at: Timestamp) -> Self {
        Self {
            id: id.into(),
            status: BatchStatus::Pending,
            pages,
            created_at,
            completed_at: None,
        }
    }

    /// Look up a page by id.
    pub fn page(&self, page_id: &str) -> Option<&Page> {
        self.pages.iter().find(|p| p.id == page_id)
    }

    /// Merge a partial update into the named page, then re-derive the
    /// batch status. Returns `false` (a documented no-op) when the page
    /// does not exist; stale callbacks against deleted pages are
    /// expected under concurrent interaction.
    pub fn apply_page_update(&mut self, page_id: &str, update: PageUpdate) -> bool {
        let Some(page) = self.pages.iter_mut().find(|p| p.id == page_id) else {
            return false;
        };
        page.apply_update(update);
        self.recompute_status();
        true
    }

    /// Re-derive `status` from the page set and stamp `completed_at` on
    /// the first transition to `Done`. This is the only path by which a
    /// batch becomes `Done`.
    pub fn recompute_status(&mut self) {
        self.status = derive_batch_status(&self.pages);
        if self.status == BatchStatus::Done && self.completed_at.is_none() {
            self.completed_at = Some(chrono::Utc::now());
        }
    }
}

/// Pure derived-status rule:
///
/// * `Done` iff the batch has pages and every page is `Done`;
/// * otherwise `Processing` if at least one page has left `Pending`;
/// * otherwise `Pending`.
///
/// An `Error` page has left `Pending` but is not `Done`, so it pins the
/// batch at `Processing` for as long as no further updates arrive.
pub fn derive_batch_status(pages: &[Page]) -> BatchStatus {
    if !pages.is_empty() && pages.iter().all(|p| p.status == PageStatus::Done) {
        BatchStatus::Done
    } else if pages.iter().any(|p| p.status != PageStatus::Pending) {
        BatchStatus::Processing
    } else {
        BatchStatus::Pending
    }
}
