/// Batch identifiers are time-derived strings (`batch_<millis>`), so
/// lexical order and creation order coincide.
pub type BatchId = String;

/// Page identifiers are unique within their batch (`page_1`, `page_2`, …).
pub type PageId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
