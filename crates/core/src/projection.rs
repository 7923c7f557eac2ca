//! Read-only display projections.
//!
//! These are the shapes handed to view code: derived counts computed on
//! the fly, never stored. Views also consume [`QueryState`], the
//! loading/error/data triple that every repeated query resolves to.

use serde::Serialize;

use crate::batch::{Batch, BatchGraph, BatchStatus};
use crate::page::{Page, PageStatus};
use crate::types::Timestamp;

/// State of an in-flight or settled query, as exposed to views.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryState<T> {
    Loading,
    /// Human-readable failure; the view decides whether to offer retry.
    Error(String),
    Data(T),
}

impl<T> QueryState<T> {
    /// The settled data, if any.
    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Data(d) => Some(d),
            _ => None,
        }
    }
}

/// Display-ready batch summary.
#[derive(Debug, Clone, Serialize)]
pub struct BatchDisplay {
    pub id: String,
    pub status: BatchStatus,
    pub created_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    pub total_pages: usize,
    pub completed_pages: usize,
    pub pages: Vec<PageDisplay>,
}

/// Display-ready page row.
#[derive(Debug, Clone, Serialize)]
pub struct PageDisplay {
    pub id: String,
    pub filename: String,
    pub status: PageStatus,
    pub original_url: String,
    pub translated_url: Option<String>,
    pub detected_bubble_count: u32,
    pub translated_texts: Vec<String>,
    pub processing_time_seconds: f64,
}

impl From<&Page> for PageDisplay {
    fn from(page: &Page) -> Self {
        Self {
            id: page.id.clone(),
            filename: page.filename.clone(),
            status: page.status,
            original_url: page.original_ref.locator().to_string(),
            translated_url: page.translated_ref.as_ref().map(|r| r.locator().to_string()),
            detected_bubble_count: page.detected_bubble_count,
            translated_texts: page.translated_texts.clone(),
            processing_time_seconds: page.processing_time_seconds,
        }
    }
}

impl From<&Batch> for BatchDisplay {
    fn from(batch: &Batch) -> Self {
        Self {
            id: batch.id.clone(),
            status: batch.status,
            created_at: batch.created_at,
            completed_at: batch.completed_at,
            total_pages: batch.pages.len(),
            completed_pages: batch
                .pages
                .iter()
                .filter(|p| p.status == PageStatus::Done)
                .count(),
            pages: batch.pages.iter().map(PageDisplay::from).collect(),
        }
    }
}

/// All batches, newest first: the "recent batches" listing.
pub fn batches_newest_first(graph: &BatchGraph) -> Vec<BatchDisplay> {
    graph.values().rev().map(BatchDisplay::from).collect()
}
