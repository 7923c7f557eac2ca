//! Durable persistence for the batch/page entity graph.
//!
//! The whole [`BatchGraph`] is serialized as one flat JSON object under a
//! single fixed file. Mutating callers save synchronously after every
//! transition, so a process restart immediately after any lifecycle
//! change observes it. There is no write-behind buffering.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use scantrad_core::BatchGraph;

/// Errors from the persistence layer.
///
/// Only `save` is fallible to callers; `load` degrades to an empty graph
/// on any failure rather than propagating.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to write store file: {0}")]
    Io(#[from] io::Error),

    #[error("failed to serialize entity graph: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Whole-graph JSON store over one fixed file.
pub struct DurableStore {
    path: PathBuf,
}

impl DurableStore {
    /// Create a store over the given file path. Nothing is touched on
    /// disk until the first [`save`](Self::save).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted graph.
    ///
    /// A missing file is a normal first run and yields an empty graph. An
    /// unreadable or corrupt blob is logged and also yields an empty
    /// graph; persistence failures never propagate to the caller.
    pub fn load(&self) -> BatchGraph {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return BatchGraph::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Could not read store file, starting empty");
                return BatchGraph::new();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(graph) => graph,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Corrupt store file, starting empty");
                BatchGraph::new()
            }
        }
    }

    /// Serialize and write the whole graph synchronously.
    ///
    /// Parent directories are created on demand. Callers log failures
    /// and carry on; a failed save never aborts the mutation it follows.
    pub fn save(&self, graph: &BatchGraph) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(graph)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scantrad_core::{Batch, ImageRef, Page, PageStatus, PageUpdate};

    fn store_in(dir: &tempfile::TempDir) -> DurableStore {
        DurableStore::new(dir.path().join("batches.json"))
    }

    fn graph_with_every_status() -> BatchGraph {
        let statuses = [
            PageStatus::Pending,
            PageStatus::Uploading,
            PageStatus::Processing,
            PageStatus::Done,
            PageStatus::Error,
        ];
        let pages = statuses
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let mut p = Page::new(
                    format!("page_{}", i + 1),
                    format!("{i}.png"),
                    ImageRef::Local(format!("/tmp/{i}.png")),
                );
                p.apply_update(PageUpdate::status(*s));
                if *s == PageStatus::Done {
                    p.apply_update(PageUpdate {
                        translated_ref: Some(ImageRef::Remote("http://x/t.png".into())),
                        translated_texts: Some(vec!["line".into()]),
                        processing_time_seconds: Some(12.5),
                        ..Default::default()
                    });
                }
                p
            })
            .collect();

        let mut graph = BatchGraph::new();
        let mut batch = Batch::new("batch_1700000000000", pages, chrono::Utc::now());
        batch.recompute_status();
        graph.insert(batch.id.clone(), batch);
        // A zero-page batch never arises through the engine, but the
        // store must round-trip it regardless.
        graph.insert(
            "batch_1700000000001".into(),
            Batch::new("batch_1700000000001", vec![], chrono::Utc::now()),
        );
        graph
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(store_in(&dir).load().is_empty());
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "{not json at all").unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn save_load_round_trips_all_statuses() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let graph = graph_with_every_status();

        store.save(&graph).unwrap();
        assert_eq!(store.load(), graph);
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = DurableStore::new(dir.path().join("nested/deeper/batches.json"));
        store.save(&BatchGraph::new()).unwrap();
        assert!(store.path().exists());
    }

    #[test]
    fn save_overwrites_previous_graph() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save(&graph_with_every_status()).unwrap();
        store.save(&BatchGraph::new()).unwrap();
        assert!(store.load().is_empty());
    }
}
