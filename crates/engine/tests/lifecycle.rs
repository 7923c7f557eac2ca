//! End-to-end tests for the lifecycle engine: the sequential processing
//! contract, derived status, durable persistence, and exactly-once
//! release of staged previews.

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use scantrad_core::{BatchStatus, ImageRef, PageStatus, PageUpdate};
use scantrad_engine::{LifecycleEngine, PacingConfig, PageSource, PreviewStore};
use scantrad_store::DurableStore;

/// In-memory preview store that counts every stage and release, so
/// tests can assert exactly-once release (no leak, no double-release).
#[derive(Default)]
struct CountingPreviewStore {
    staged: AtomicU64,
    releases: Mutex<HashMap<String, u32>>,
}

impl CountingPreviewStore {
    fn release_counts(&self) -> HashMap<String, u32> {
        self.releases.lock().unwrap().clone()
    }
}

impl PreviewStore for CountingPreviewStore {
    fn stage(&self, filename: &str, _bytes: &[u8]) -> io::Result<String> {
        let n = self.staged.fetch_add(1, Ordering::SeqCst);
        Ok(format!("mem://{n}/{filename}"))
    }

    fn release(&self, locator: &str) {
        *self
            .releases
            .lock()
            .unwrap()
            .entry(locator.to_string())
            .or_insert(0) += 1;
    }
}

fn instant_pacing() -> PacingConfig {
    PacingConfig {
        step_delay: Duration::ZERO,
        progress_step: 20,
    }
}

fn engine_in(dir: &tempfile::TempDir) -> (Arc<LifecycleEngine>, Arc<CountingPreviewStore>) {
    let previews = Arc::new(CountingPreviewStore::default());
    let store = DurableStore::new(dir.path().join("batches.json"));
    let engine = Arc::new(LifecycleEngine::new(
        store,
        Arc::clone(&previews) as Arc<dyn PreviewStore>,
        instant_pacing(),
    ));
    (engine, previews)
}

fn three_sources() -> Vec<PageSource> {
    vec![
        PageSource::new("a.png", vec![1]),
        PageSource::new("b.png", vec![2]),
        PageSource::new("c.png", vec![3]),
    ]
}

#[tokio::test]
async fn three_page_batch_processes_to_done() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, _) = engine_in(&dir);

    let batch_id = engine.create_batch(three_sources()).await.unwrap();

    let mut events: Vec<(String, u8, PageStatus)> = Vec::new();
    engine
        .process_batch(&batch_id, |page_id, percent, status| {
            events.push((page_id.to_string(), percent, status));
        })
        .await;

    let batch = engine.batch(&batch_id).await.unwrap();
    assert_eq!(batch.status, BatchStatus::Done);
    assert!(batch.completed_at.is_some());
    for page in &batch.pages {
        assert_eq!(page.status, PageStatus::Done);
        assert!(page.translated_ref.is_some());
        assert!(!page.translated_texts.is_empty());
        assert!(page.processing_time_seconds > 0.0);
        assert!(page.detected_bubble_count >= 2);
    }

    // Progress for page_1 is non-decreasing, ends at 100, and finishes
    // before any event for page_2 is seen.
    let page1: Vec<&(String, u8, PageStatus)> =
        events.iter().filter(|(id, _, _)| id == "page_1").collect();
    assert!(page1.windows(2).all(|w| w[0].1 <= w[1].1));
    assert_eq!(page1.last().unwrap().1, 100);
    assert_eq!(page1.last().unwrap().2, PageStatus::Done);

    let first_page2 = events.iter().position(|(id, _, _)| id == "page_2").unwrap();
    let last_page1 = events.iter().rposition(|(id, _, _)| id == "page_1").unwrap();
    assert!(last_page1 < first_page2);
}

#[tokio::test]
async fn pages_are_processed_strictly_sequentially() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, _) = engine_in(&dir);
    let batch_id = engine.create_batch(three_sources()).await.unwrap();

    let mut order: Vec<String> = Vec::new();
    engine
        .process_batch(&batch_id, |page_id, _, _| {
            order.push(page_id.to_string());
        })
        .await;

    // Events for page i+1 only ever appear after the last event for
    // page i: the flattened sequence is already sorted by page.
    let mut sorted = order.clone();
    sorted.sort();
    assert_eq!(order, sorted);
}

#[tokio::test]
async fn empty_input_yields_no_batch() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, _) = engine_in(&dir);

    let err = engine.create_batch(vec![]).await.unwrap_err();
    assert!(err.to_string().contains("empty file list"));
    assert!(engine.snapshot().await.is_empty());
}

#[tokio::test]
async fn delete_releases_each_preview_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, previews) = engine_in(&dir);

    let batch_id = engine.create_batch(three_sources()).await.unwrap();
    engine.delete_batch(&batch_id).await;

    let counts = previews.release_counts();
    assert_eq!(counts.len(), 3);
    assert!(counts.values().all(|&n| n == 1), "double release: {counts:?}");

    // Deleting again must not release anything further.
    engine.delete_batch(&batch_id).await;
    assert_eq!(previews.release_counts(), counts);
}

#[tokio::test]
async fn clear_all_releases_everything_and_persists_empty() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, previews) = engine_in(&dir);

    engine.create_batch(three_sources()).await.unwrap();
    engine
        .create_batch(vec![PageSource::new("d.png", vec![4])])
        .await
        .unwrap();
    engine.clear_all().await;

    assert!(engine.snapshot().await.is_empty());
    let counts = previews.release_counts();
    assert_eq!(counts.len(), 4);
    assert!(counts.values().all(|&n| n == 1));

    // The persisted graph is empty too.
    let reloaded = DurableStore::new(dir.path().join("batches.json")).load();
    assert!(reloaded.is_empty());
}

#[tokio::test]
async fn restart_observes_the_last_transition() {
    let dir = tempfile::tempdir().unwrap();

    let (engine, _) = engine_in(&dir);
    let batch_id = engine.create_batch(three_sources()).await.unwrap();
    engine
        .update_page_status(
            &batch_id,
            "page_1",
            PageUpdate::status(PageStatus::Processing),
        )
        .await;
    drop(engine);

    // A fresh engine over the same store file sees the transition.
    let (reborn, _) = engine_in(&dir);
    let batch = reborn.batch(&batch_id).await.unwrap();
    assert_eq!(batch.pages[0].status, PageStatus::Processing);
    assert_eq!(batch.status, BatchStatus::Processing);
}

#[tokio::test]
async fn mutations_on_missing_entities_are_noops() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, previews) = engine_in(&dir);

    engine
        .update_page_status("batch_404", "page_1", PageUpdate::status(PageStatus::Done))
        .await;
    engine.delete_batch("batch_404").await;
    engine.process_batch("batch_404", |_, _, _| {}).await;

    let batch_id = engine.create_batch(three_sources()).await.unwrap();
    engine
        .update_page_status(&batch_id, "page_404", PageUpdate::status(PageStatus::Done))
        .await;

    let batch = engine.batch(&batch_id).await.unwrap();
    assert_eq!(batch.status, BatchStatus::Pending);
    assert!(previews.release_counts().is_empty());
}

#[tokio::test]
async fn completion_stays_stamped_after_a_page_reset() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, _) = engine_in(&dir);

    let batch_id = engine
        .create_batch(vec![PageSource::new("a.png", vec![1])])
        .await
        .unwrap();
    engine.process_batch(&batch_id, |_, _, _| {}).await;

    let completed_at = engine.batch(&batch_id).await.unwrap().completed_at.unwrap();

    engine
        .update_page_status(&batch_id, "page_1", PageUpdate::status(PageStatus::Pending))
        .await;

    let batch = engine.batch(&batch_id).await.unwrap();
    assert_eq!(batch.status, BatchStatus::Pending);
    assert_eq!(batch.completed_at, Some(completed_at));
}

#[tokio::test]
async fn replacing_a_local_original_releases_the_old_preview() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, previews) = engine_in(&dir);

    let batch_id = engine
        .create_batch(vec![PageSource::new("a.png", vec![1])])
        .await
        .unwrap();
    let old_locator = match &engine.batch(&batch_id).await.unwrap().pages[0].original_ref {
        ImageRef::Local(l) => l.clone(),
        other => panic!("expected local ref, got {other:?}"),
    };

    engine
        .update_page_status(
            &batch_id,
            "page_1",
            PageUpdate {
                original_ref: Some(ImageRef::Remote("http://backend/a.png".into())),
                ..Default::default()
            },
        )
        .await;

    assert_eq!(previews.release_counts().get(&old_locator), Some(&1));

    // Deleting the batch afterwards must not release the old locator a
    // second time; the page no longer owns it.
    engine.delete_batch(&batch_id).await;
    assert_eq!(previews.release_counts().get(&old_locator), Some(&1));
}

#[tokio::test]
async fn batch_ids_are_unique_and_creation_ordered() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, _) = engine_in(&dir);

    let mut ids = Vec::new();
    for _ in 0..5 {
        ids.push(
            engine
                .create_batch(vec![PageSource::new("a.png", vec![1])])
                .await
                .unwrap(),
        );
    }

    let mut sorted = ids.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(ids, sorted, "ids must be unique and lexically increasing");
}
