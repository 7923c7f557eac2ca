//! Raw HTTP layer over the backend endpoints.
//!
//! One method per endpoint, no caching, no retries. The read-through
//! cache lives in [`crate::sync`]; retry policy is deliberately absent
//! from the request/response path. Identity travels as the
//! `X-User-Pseudo` header, read from the explicit [`Session`] argument.

use serde::de::DeserializeOwned;

use crate::error::ClientError;
use crate::session::Session;
use crate::wire::{
    BatchResultResponse, BatchStatusResponse, LoginRequest, LoginResponse, TranslatedPagesResponse,
    UploadBatchRequest, UploadBatchResponse, UserBatchesResponse,
};

/// Header carrying the current identity on every user-scoped call.
pub const USER_HEADER: &str = "X-User-Pseudo";

/// HTTP client for one backend instance.
pub struct BackendApi {
    client: reqwest::Client,
    base_url: String,
}

impl BackendApi {
    /// Create an API client for a backend instance.
    ///
    /// * `base_url` - base HTTP URL, e.g. `http://localhost:8000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Create an API client reusing an existing [`reqwest::Client`]
    /// (connection pooling across components).
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Base HTTP URL of the backend.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `POST /auth/login`: register or recognize a pseudo.
    pub async fn login(&self, pseudo: &str) -> Result<LoginResponse, ClientError> {
        let response = self
            .client
            .post(format!("{}/auth/login", self.base_url))
            .json(&LoginRequest {
                pseudo: pseudo.to_string(),
            })
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// `POST /upload-batch`: submit a batch of pages for translation.
    pub async fn upload_batch(
        &self,
        session: &Session,
        request: &UploadBatchRequest,
    ) -> Result<UploadBatchResponse, ClientError> {
        let response = self
            .client
            .post(format!("{}/upload-batch", self.base_url))
            .header(USER_HEADER, session.pseudo())
            .json(request)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// `GET /status/{batchId}`: authoritative page statuses.
    pub async fn batch_status(
        &self,
        session: &Session,
        batch_id: &str,
    ) -> Result<BatchStatusResponse, ClientError> {
        let response = self
            .client
            .get(format!("{}/status/{batch_id}", self.base_url))
            .header(USER_HEADER, session.pseudo())
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// `GET /result/{batchId}`: page statuses plus translated URLs.
    pub async fn batch_result(
        &self,
        session: &Session,
        batch_id: &str,
    ) -> Result<BatchResultResponse, ClientError> {
        let response = self
            .client
            .get(format!("{}/result/{batch_id}", self.base_url))
            .header(USER_HEADER, session.pseudo())
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// `GET /user/{pseudo}/batches`: every batch the user submitted.
    pub async fn user_batches(&self, session: &Session) -> Result<UserBatchesResponse, ClientError> {
        let response = self
            .client
            .get(format!("{}/user/{}/batches", self.base_url, session.pseudo()))
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// `GET /user/{pseudo}/translated-pages`: every finished page of the
    /// user, across batches.
    pub async fn user_translated_pages(
        &self,
        session: &Session,
    ) -> Result<TranslatedPagesResponse, ClientError> {
        let response = self
            .client
            .get(format!(
                "{}/user/{}/translated-pages",
                self.base_url,
                session.pseudo()
            ))
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// `GET /batch/{batchId}/translated-pages`: finished pages of one
    /// batch.
    pub async fn batch_translated_pages(
        &self,
        session: &Session,
        batch_id: &str,
    ) -> Result<TranslatedPagesResponse, ClientError> {
        let response = self
            .client
            .get(format!(
                "{}/batch/{batch_id}/translated-pages",
                self.base_url
            ))
            .header(USER_HEADER, session.pseudo())
            .send()
            .await?;
        Self::parse_response(response).await
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code, or turn it into a
    /// [`ClientError::Api`] carrying the status and body text.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ClientError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}
