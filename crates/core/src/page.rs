//! Page entity: one image submitted for translation, plus the artifacts
//! the pipeline attaches to it.

use serde::{Deserialize, Serialize};

use crate::types::PageId;

/// Processing status of a single page.
///
/// Monotonic under normal operation (`pending → uploading → processing →
/// done`); `error` is terminal but stays visible. An `error` page never
/// counts toward batch completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    Pending,
    Uploading,
    Processing,
    Done,
    Error,
}

impl PageStatus {
    /// Human-readable label for display.
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Uploading => "Uploading",
            Self::Processing => "Processing",
            Self::Done => "Done",
            Self::Error => "Error",
        }
    }
}

/// Locator for a page image.
///
/// `Local` refs point at preview files staged from uploaded bytes; they
/// are owned by the page and must be released exactly once when the page
/// is replaced or its batch is deleted. `Remote` refs are backend URLs
/// and are never released.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageRef {
    Local(String),
    Remote(String),
}

impl ImageRef {
    /// The raw locator string (file path or URL).
    pub fn locator(&self) -> &str {
        match self {
            Self::Local(s) | Self::Remote(s) => s,
        }
    }

    /// Whether this ref points at a locally staged preview file.
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }
}

/// One image within a batch and its translation artifacts.
///
/// Invariant: `translated_ref` and non-empty `translated_texts` must not
/// exist while `status` is `Pending` or `Uploading`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Unique within the owning batch, assigned in upload order.
    pub id: PageId,
    /// Original file name, display only.
    pub filename: String,
    pub status: PageStatus,
    /// Locator for the source image.
    pub original_ref: ImageRef,
    /// Locator for the translated image; present only once `Done`.
    pub translated_ref: Option<ImageRef>,
    /// Number of speech bubbles found; meaningful once processing starts.
    pub detected_bubble_count: u32,
    /// Translated strings in reading order; empty until `Done`.
    pub translated_texts: Vec<String>,
    /// Wall-clock processing duration, set once at completion.
    pub processing_time_seconds: f64,
}

impl Page {
    /// Create a fresh `Pending` page with no artifacts.
    pub fn new(id: impl Into<PageId>, filename: impl Into<String>, original_ref: ImageRef) -> Self {
        Self {
            id: id.into(),
            filename: filename.into(),
            status: PageStatus::Pending,
            original_ref,
            translated_ref: None,
            detected_bubble_count: 0,
            translated_texts: Vec::new(),
            processing_time_seconds: 0.0,
        }
    }

    /// Merge a partial update into this page. Absent fields are left
    /// untouched.
    pub fn apply_update(&mut self, update: PageUpdate) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(original_ref) = update.original_ref {
            self.original_ref = original_ref;
        }
        if let Some(translated_ref) = update.translated_ref {
            self.translated_ref = Some(translated_ref);
        }
        if let Some(count) = update.detected_bubble_count {
            self.detected_bubble_count = count;
        }
        if let Some(texts) = update.translated_texts {
            self.translated_texts = texts;
        }
        if let Some(secs) = update.processing_time_seconds {
            self.processing_time_seconds = secs;
        }
    }
}

/// Partial page mutation, merged field-by-field by [`Page::apply_update`].
#[derive(Debug, Clone, Default)]
pub struct PageUpdate {
    pub status: Option<PageStatus>,
    pub original_ref: Option<ImageRef>,
    pub translated_ref: Option<ImageRef>,
    pub detected_bubble_count: Option<u32>,
    pub translated_texts: Option<Vec<String>>,
    pub processing_time_seconds: Option<f64>,
}

impl PageUpdate {
    /// Update that only moves the page to a new status.
    pub fn status(status: PageStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}
