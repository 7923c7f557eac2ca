//! The lifecycle engine: batch creation, the simulated processing
//! pipeline, page mutation, and deletion with resource release.
//!
//! Every mutation persists the whole graph synchronously before the
//! mutating call returns, so a restart immediately after any transition
//! observes it. Mutations on missing batches or pages are documented
//! no-ops: stale callbacks referencing deleted batches are expected
//! under concurrent interaction and must not fail.

use std::io;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use scantrad_core::{Batch, BatchGraph, BatchId, ImageRef, Page, PageStatus, PageUpdate};
use scantrad_store::DurableStore;

use crate::preview::PreviewStore;
use crate::simulate;

/// One file accepted for upload: its display name and raw bytes.
#[derive(Debug, Clone)]
pub struct PageSource {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl PageSource {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }
}

/// Pacing of the simulated per-page progress loop.
///
/// Progress is emitted in `progress_step` increments from 0 to 100 with
/// `step_delay` between increments. Tests run with a zero delay; the
/// observer contract (ordering, granularity) is identical either way.
#[derive(Debug, Clone)]
pub struct PacingConfig {
    pub step_delay: Duration,
    pub progress_step: u8,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            step_delay: Duration::from_millis(300),
            progress_step: 20,
        }
    }
}

/// Errors from the lifecycle engine.
///
/// Missing-entity cases are no-ops rather than errors; only batch
/// creation is fallible.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Empty input yields no batch; callers must guard.
    #[error("cannot create a batch from an empty file list")]
    EmptyBatch,

    /// Staging an uploaded file to a local preview failed.
    #[error("failed to stage preview file: {0}")]
    Staging(#[from] io::Error),
}

/// Owns the authoritative batch/page graph for locally processed
/// batches. Cheaply shareable via `Arc`; all mutation goes through the
/// documented operations.
pub struct LifecycleEngine {
    graph: RwLock<BatchGraph>,
    store: DurableStore,
    previews: Arc<dyn PreviewStore>,
    pacing: PacingConfig,
    /// Millis value of the last assigned batch id, bumped so ids stay
    /// strictly increasing even within one millisecond.
    last_batch_millis: AtomicI64,
}

impl LifecycleEngine {
    /// Load the persisted graph and build an engine over it.
    pub fn new(store: DurableStore, previews: Arc<dyn PreviewStore>, pacing: PacingConfig) -> Self {
        let graph = store.load();

        // Seed the id clock past every loaded batch so fresh ids keep
        // sorting after restored ones.
        let max_loaded = graph
            .keys()
            .filter_map(|id| id.strip_prefix("batch_")?.parse::<i64>().ok())
            .max()
            .unwrap_or(0);

        Self {
            graph: RwLock::new(graph),
            store,
            previews,
            pacing,
            last_batch_millis: AtomicI64::new(max_loaded),
        }
    }

    // ---- queries ----

    /// A clone of the named batch, if it exists.
    pub async fn batch(&self, batch_id: &str) -> Option<Batch> {
        self.graph.read().await.get(batch_id).cloned()
    }

    /// A clone of the whole graph (creation-ordered).
    pub async fn snapshot(&self) -> BatchGraph {
        self.graph.read().await.clone()
    }

    // ---- mutations ----

    /// Create a `Pending` batch with one page per source, in input order.
    ///
    /// Source bytes are staged to local preview files owned by the new
    /// pages. Returns the fresh batch id. The only failure modes are an
    /// empty source list and a staging I/O error; on the latter, any
    /// previews already staged for this call are released again.
    pub async fn create_batch(&self, sources: Vec<PageSource>) -> Result<BatchId, EngineError> {
        if sources.is_empty() {
            return Err(EngineError::EmptyBatch);
        }

        let mut staged: Vec<(String, String)> = Vec::with_capacity(sources.len());
        for source in &sources {
            match self.previews.stage(&source.filename, &source.bytes) {
                Ok(locator) => staged.push((source.filename.clone(), locator)),
                Err(e) => {
                    for (_, locator) in &staged {
                        self.previews.release(locator);
                    }
                    return Err(EngineError::Staging(e));
                }
            }
        }

        let batch_id = self.next_batch_id();
        let pages = staged
            .into_iter()
            .enumerate()
            .map(|(i, (filename, locator))| {
                Page::new(format!("page_{}", i + 1), filename, ImageRef::Local(locator))
            })
            .collect();

        let batch = Batch::new(batch_id.clone(), pages, chrono::Utc::now());

        let mut graph = self.graph.write().await;
        graph.insert(batch_id.clone(), batch);
        self.persist(&graph);
        drop(graph);

        tracing::info!(batch_id = %batch_id, "Batch created");
        Ok(batch_id)
    }

    /// Drive every page of the batch through the simulated pipeline,
    /// strictly sequentially in array order: a page reaches `Done`
    /// before the next one starts.
    ///
    /// `on_progress(page_id, percent, status)` fires in `progress_step`
    /// increments from 0 to 100 while `Processing`, then once more with
    /// `(100, Done)` after the page is finalized. A missing batch is a
    /// no-op. Once started, the pipeline runs to completion; deleting
    /// the batch mid-flight turns the remaining mutations into no-ops
    /// but does not stop the callbacks.
    pub async fn process_batch<F>(&self, batch_id: &str, mut on_progress: F)
    where
        F: FnMut(&str, u8, PageStatus),
    {
        let page_ids: Vec<String> = match self.graph.read().await.get(batch_id) {
            Some(batch) => batch.pages.iter().map(|p| p.id.clone()).collect(),
            None => {
                tracing::debug!(batch_id, "process_batch on unknown batch, ignoring");
                return;
            }
        };

        let step = self.pacing.progress_step.max(1);

        for (index, page_id) in page_ids.iter().enumerate() {
            self.update_page_status(
                batch_id,
                page_id,
                PageUpdate {
                    status: Some(PageStatus::Processing),
                    detected_bubble_count: Some(simulate::bubble_count()),
                    ..Default::default()
                },
            )
            .await;
            on_progress(page_id, 0, PageStatus::Processing);

            let mut percent = step;
            while percent <= 100 {
                tokio::time::sleep(self.pacing.step_delay).await;
                on_progress(page_id, percent, PageStatus::Processing);
                match percent.checked_add(step) {
                    Some(next) => percent = next,
                    None => break,
                }
            }

            let page_number = index + 1;
            self.update_page_status(
                batch_id,
                page_id,
                PageUpdate {
                    status: Some(PageStatus::Done),
                    translated_ref: Some(ImageRef::Remote(simulate::translated_placeholder(
                        page_number,
                    ))),
                    translated_texts: Some(simulate::translated_texts(page_number)),
                    processing_time_seconds: Some(simulate::processing_time_seconds()),
                    ..Default::default()
                },
            )
            .await;
            on_progress(page_id, 100, PageStatus::Done);
        }

        tracing::info!(batch_id, pages = page_ids.len(), "Batch processing finished");
    }

    /// Merge partial fields into the named page, re-derive the batch
    /// status, and persist. No-op if the batch or page does not exist.
    ///
    /// Replacing a `Local` ref releases the superseded preview file.
    pub async fn update_page_status(&self, batch_id: &str, page_id: &str, update: PageUpdate) {
        let mut graph = self.graph.write().await;
        let Some(batch) = graph.get_mut(batch_id) else {
            return;
        };
        let Some(page) = batch.pages.iter().find(|p| p.id == page_id) else {
            return;
        };

        let mut superseded: Vec<String> = Vec::new();
        if let Some(new_ref) = &update.original_ref {
            if let ImageRef::Local(old) = &page.original_ref {
                if *new_ref != page.original_ref {
                    superseded.push(old.clone());
                }
            }
        }
        if let (Some(new_ref), Some(ImageRef::Local(old))) =
            (&update.translated_ref, &page.translated_ref)
        {
            if Some(new_ref) != page.translated_ref.as_ref() {
                superseded.push(old.clone());
            }
        }

        batch.apply_page_update(page_id, update);
        self.persist(&graph);
        drop(graph);

        for locator in superseded {
            self.previews.release(&locator);
        }
    }

    /// Remove a batch, releasing every local preview it owns exactly
    /// once before the record disappears. No-op for unknown ids.
    pub async fn delete_batch(&self, batch_id: &str) {
        let mut graph = self.graph.write().await;
        let Some(batch) = graph.remove(batch_id) else {
            return;
        };
        self.persist(&graph);
        drop(graph);

        self.release_batch_refs(&batch);
        tracing::info!(batch_id, "Batch deleted");
    }

    /// Remove every batch and persist the empty graph.
    pub async fn clear_all(&self) {
        let mut graph = self.graph.write().await;
        let removed: Vec<Batch> = std::mem::take(&mut *graph).into_values().collect();
        self.persist(&graph);
        drop(graph);

        for batch in &removed {
            self.release_batch_refs(batch);
        }
        tracing::info!(count = removed.len(), "All batches cleared");
    }

    // ---- private helpers ----

    /// Time-derived id, bumped to stay strictly increasing when two
    /// batches land in the same millisecond.
    fn next_batch_id(&self) -> BatchId {
        let now = chrono::Utc::now().timestamp_millis();
        let prev = self
            .last_batch_millis
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(if now > last { now } else { last + 1 })
            })
            .expect("fetch_update closure always returns Some");
        let assigned = if now > prev { now } else { prev + 1 };
        format!("batch_{assigned}")
    }

    fn release_batch_refs(&self, batch: &Batch) {
        for page in &batch.pages {
            if let ImageRef::Local(locator) = &page.original_ref {
                self.previews.release(locator);
            }
            if let Some(ImageRef::Local(locator)) = &page.translated_ref {
                self.previews.release(locator);
            }
        }
    }

    /// Synchronous persist after a mutation. Failures are logged and
    /// absorbed; a failed save never aborts the mutation it follows.
    fn persist(&self, graph: &BatchGraph) {
        if let Err(e) = self.store.save(graph) {
            tracing::error!(error = %e, "Failed to persist entity graph");
        }
    }
}
