//! Wire types for the backend HTTP surface.
//!
//! Field names mirror the backend JSON exactly (`page_id`, `_id`,
//! `image_base64`, `batchId`, …); serde renames bridge the gap to Rust
//! naming. Unknown fields are ignored so backend additions do not break
//! deserialization.

use serde::{Deserialize, Serialize};

use scantrad_core::{BatchStatus, PageStatus, Timestamp};

/// `POST /auth/login` request body.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub pseudo: String,
}

/// `POST /auth/login` response.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub pseudo: String,
    pub message: String,
}

/// One page in an upload request; the image travels base64-encoded.
#[derive(Debug, Clone, Serialize)]
pub struct PageUpload {
    pub filename: String,
    pub image_base64: String,
}

/// `POST /upload-batch` request body.
#[derive(Debug, Clone, Serialize)]
pub struct UploadBatchRequest {
    pub pages: Vec<PageUpload>,
}

/// `POST /upload-batch` response.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadBatchResponse {
    #[serde(rename = "batchId")]
    pub batch_id: String,
}

/// One page document as reported by `/status/{batchId}` and
/// `/result/{batchId}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageData {
    pub page_id: String,
    pub filename: String,
    pub status: PageStatus,
    pub original_url: String,
    #[serde(default)]
    pub translated_url: Option<String>,
}

/// `GET /status/{batchId}` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchStatusResponse {
    pub pages: Vec<PageData>,
}

/// `GET /result/{batchId}` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResultResponse {
    pub pages: Vec<PageData>,
}

/// Per-page status stub embedded in a batch listing document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemotePageStatus {
    pub status: PageStatus,
}

/// One batch document as listed by `GET /user/{pseudo}/batches`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteBatch {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub pages_ids: Vec<String>,
    #[serde(default)]
    pub pages: Vec<RemotePageStatus>,
    pub created_at: Timestamp,
    pub status: BatchStatus,
}

/// `GET /user/{pseudo}/batches` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserBatchesResponse {
    pub batches: Vec<RemoteBatch>,
}

/// One finished page document from the translated-pages collections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatedPage {
    #[serde(rename = "_id")]
    pub id: String,
    pub page_id: String,
    pub user_id: String,
    pub batch_id: String,
    pub filename: String,
    pub original_url: String,
    pub translated_url: String,
    pub translation_completed_at: Timestamp,
    pub processing_time_seconds: f64,
}

/// Response shape shared by `GET /user/{pseudo}/translated-pages` and
/// `GET /batch/{batchId}/translated-pages`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatedPagesResponse {
    pub translated_pages: Vec<TranslatedPage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_login_response() {
        let json = r#"{"pseudo":"lecteur42","message":"Login successful"}"#;
        let resp: LoginResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.pseudo, "lecteur42");
    }

    #[test]
    fn upload_request_uses_backend_field_names() {
        let req = UploadBatchRequest {
            pages: vec![PageUpload {
                filename: "a.png".into(),
                image_base64: "aGVsbG8=".into(),
            }],
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["pages"][0]["filename"], "a.png");
        assert_eq!(json["pages"][0]["image_base64"], "aGVsbG8=");
    }

    #[test]
    fn parse_upload_response_batch_id() {
        let resp: UploadBatchResponse =
            serde_json::from_str(r#"{"batchId":"batch_abc"}"#).unwrap();
        assert_eq!(resp.batch_id, "batch_abc");
    }

    #[test]
    fn parse_page_data_without_translated_url() {
        let json = r#"{"page_id":"p1","filename":"a.png","status":"processing","original_url":"http://b/orig/p1"}"#;
        let page: PageData = serde_json::from_str(json).unwrap();
        assert_eq!(page.status, PageStatus::Processing);
        assert!(page.translated_url.is_none());
    }

    #[test]
    fn parse_page_data_with_translated_url() {
        let json = r#"{"page_id":"p1","filename":"a.png","status":"done","original_url":"http://b/orig/p1","translated_url":"http://b/tr/p1"}"#;
        let page: PageData = serde_json::from_str(json).unwrap();
        assert_eq!(page.translated_url.as_deref(), Some("http://b/tr/p1"));
    }

    #[test]
    fn parse_remote_batch_with_mongo_id() {
        let json = r#"{
            "_id": "65ab",
            "user_id": "u1",
            "pages_ids": ["p1", "p2"],
            "pages": [{"status": "done"}, {"status": "pending"}],
            "created_at": "2025-06-01T10:00:00Z",
            "status": "processing"
        }"#;
        let batch: RemoteBatch = serde_json::from_str(json).unwrap();
        assert_eq!(batch.id, "65ab");
        assert_eq!(batch.pages.len(), 2);
        assert_eq!(batch.pages[1].status, PageStatus::Pending);
        assert_eq!(batch.status, BatchStatus::Processing);
    }

    #[test]
    fn parse_translated_pages_ignores_unknown_fields() {
        // The backend also ships inline base64 copies of the images;
        // they are intentionally not modeled.
        let json = r#"{"translated_pages":[{
            "_id": "65cd",
            "page_id": "p1",
            "user_id": "u1",
            "batch_id": "b1",
            "filename": "a.png",
            "original_image": "aGVsbG8=",
            "translated_image": "aGVsbG8=",
            "original_url": "http://b/orig/p1",
            "translated_url": "http://b/tr/p1",
            "translation_completed_at": "2025-06-01T10:05:00Z",
            "processing_time_seconds": 8.5
        }]}"#;
        let resp: TranslatedPagesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.translated_pages.len(), 1);
        assert!((resp.translated_pages[0].processing_time_seconds - 8.5).abs() < f64::EPSILON);
    }
}
