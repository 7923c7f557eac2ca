//! Reconciliation of remote documents into the local entity model.
//!
//! The backend is authoritative: local batches are rebuilt from every
//! successful fetch. What the wire does not carry (bubble counts,
//! translated texts) stays at its defaults; what must stay monotone
//! (`created_at`, `completed_at`) is carried over from the previous
//! local copy before the derived-status rule runs.

use scantrad_core::projection::PageDisplay;
use scantrad_core::{Batch, ImageRef, Page, PageStatus};

use crate::wire::{PageData, TranslatedPage};

/// Map one remote page document to a local [`Page`] with remote refs.
pub fn page_from_remote(data: &PageData) -> Page {
    Page {
        id: data.page_id.clone(),
        filename: data.filename.clone(),
        status: data.status,
        original_ref: ImageRef::Remote(data.original_url.clone()),
        translated_ref: data.translated_url.clone().map(ImageRef::Remote),
        detected_bubble_count: 0,
        translated_texts: Vec::new(),
        processing_time_seconds: 0.0,
    }
}

/// Rebuild the local copy of a batch from a status or result fetch.
///
/// The derived-status rule runs over the fresh page set, so an `error`
/// page keeps the batch at `Processing` indefinitely; it never counts
/// toward completion. `created_at` and a previously stamped
/// `completed_at` are preserved from `existing`.
pub fn apply_remote_pages(existing: Option<&Batch>, batch_id: &str, pages: &[PageData]) -> Batch {
    let mut batch = Batch::new(
        batch_id,
        pages.iter().map(page_from_remote).collect(),
        existing
            .map(|b| b.created_at)
            .unwrap_or_else(chrono::Utc::now),
    );
    batch.completed_at = existing.and_then(|b| b.completed_at);
    batch.recompute_status();
    batch
}

/// Project a finished-page document straight to its display row.
///
/// Bubble counts and text lists are not part of the translated-pages
/// payload and stay empty rather than being faked.
pub fn display_from_translated(doc: &TranslatedPage) -> PageDisplay {
    PageDisplay {
        id: doc.page_id.clone(),
        filename: doc.filename.clone(),
        status: PageStatus::Done,
        original_url: doc.original_url.clone(),
        translated_url: Some(doc.translated_url.clone()),
        detected_bubble_count: 0,
        translated_texts: Vec::new(),
        processing_time_seconds: doc.processing_time_seconds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scantrad_core::BatchStatus;

    fn remote_page(id: &str, status: PageStatus, translated: bool) -> PageData {
        PageData {
            page_id: id.into(),
            filename: format!("{id}.png"),
            status,
            original_url: format!("http://b/orig/{id}"),
            translated_url: translated.then(|| format!("http://b/tr/{id}")),
        }
    }

    #[test]
    fn remote_pages_become_remote_refs() {
        let page = page_from_remote(&remote_page("p1", PageStatus::Done, true));
        assert_eq!(page.original_ref, ImageRef::Remote("http://b/orig/p1".into()));
        assert_eq!(
            page.translated_ref,
            Some(ImageRef::Remote("http://b/tr/p1".into()))
        );
        assert_eq!(page.detected_bubble_count, 0);
    }

    #[test]
    fn error_page_pins_batch_at_processing() {
        let pages = [
            remote_page("p1", PageStatus::Done, true),
            remote_page("p2", PageStatus::Error, false),
        ];
        let batch = apply_remote_pages(None, "batch_X", &pages);
        assert_eq!(batch.status, BatchStatus::Processing);
        assert!(batch.completed_at.is_none());

        // No further updates arrive: re-applying the same remote state
        // leaves the batch Processing forever.
        let again = apply_remote_pages(Some(&batch), "batch_X", &pages);
        assert_eq!(again.status, BatchStatus::Processing);
        assert!(again.completed_at.is_none());
    }

    #[test]
    fn all_done_completes_and_stays_completed() {
        let done = [
            remote_page("p1", PageStatus::Done, true),
            remote_page("p2", PageStatus::Done, true),
        ];
        let batch = apply_remote_pages(None, "batch_X", &done);
        assert_eq!(batch.status, BatchStatus::Done);
        let stamped = batch.completed_at.expect("stamped on completion");

        // A later fetch showing a page back in processing (backend
        // re-run) downgrades the derived status but not completion.
        let regressed = [
            remote_page("p1", PageStatus::Done, true),
            remote_page("p2", PageStatus::Processing, false),
        ];
        let rebuilt = apply_remote_pages(Some(&batch), "batch_X", &regressed);
        assert_eq!(rebuilt.status, BatchStatus::Processing);
        assert_eq!(rebuilt.completed_at, Some(stamped));
    }

    #[test]
    fn created_at_survives_rebuilds() {
        let pages = [remote_page("p1", PageStatus::Pending, false)];
        let first = apply_remote_pages(None, "batch_X", &pages);
        let rebuilt = apply_remote_pages(Some(&first), "batch_X", &pages);
        assert_eq!(rebuilt.created_at, first.created_at);
    }

    #[test]
    fn translated_doc_projects_to_display_row() {
        let doc = TranslatedPage {
            id: "65cd".into(),
            page_id: "p1".into(),
            user_id: "u1".into(),
            batch_id: "b1".into(),
            filename: "a.png".into(),
            original_url: "http://b/orig/p1".into(),
            translated_url: "http://b/tr/p1".into(),
            translation_completed_at: chrono::Utc::now(),
            processing_time_seconds: 8.0,
        };
        let display = display_from_translated(&doc);
        assert_eq!(display.status, PageStatus::Done);
        assert_eq!(display.translated_url.as_deref(), Some("http://b/tr/p1"));
        assert!(display.translated_texts.is_empty());
    }
}
