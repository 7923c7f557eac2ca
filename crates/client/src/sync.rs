//! The sync client: read-through queries over the tag cache, mutations
//! with targeted invalidation, and the advisory local copy of remote
//! batches.
//!
//! Every query is cached under tags derived from what it reads; every
//! mutation invalidates the tags of what it touched. A live-channel
//! hint carries no detail, so its handler invalidates everything and
//! lets the next reads refetch.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tokio::sync::RwLock;

use scantrad_core::Batch;

use crate::api::BackendApi;
use crate::cache::{CacheTag, TagCache};
use crate::error::ClientError;
use crate::reconcile;
use crate::session::{Session, SessionStore};
use crate::wire::{
    BatchResultResponse, BatchStatusResponse, PageData, PageUpload, TranslatedPagesResponse,
    UploadBatchRequest, UserBatchesResponse,
};

/// One file to submit: display name plus raw image bytes (encoded to
/// base64 on the wire).
#[derive(Debug, Clone)]
pub struct UploadSource {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl UploadSource {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }
}

/// Remote sync client: the single integration point with the backend.
pub struct SyncClient {
    api: BackendApi,
    sessions: SessionStore,
    cache: RwLock<TagCache>,
    /// Advisory local copies of remote batches, rebuilt on every
    /// successful status/result fetch; the backend stays authoritative.
    batches: RwLock<HashMap<String, Batch>>,
}

impl SyncClient {
    pub fn new(api: BackendApi, sessions: SessionStore) -> Self {
        Self {
            api,
            sessions,
            cache: RwLock::new(TagCache::new()),
            batches: RwLock::new(HashMap::new()),
        }
    }

    /// The raw endpoint layer, for callers that need an uncached call.
    pub fn api(&self) -> &BackendApi {
        &self.api
    }

    // ---- session lifecycle ----

    /// The session persisted by a previous login, if any.
    pub fn restore_session(&self) -> Option<Session> {
        self.sessions.load()
    }

    /// Validate the pseudo, log in against the backend, and persist the
    /// resulting session for the next restart.
    pub async fn login(&self, pseudo: &str) -> Result<Session, ClientError> {
        let session = Session::new(pseudo)?;
        let response = self.api.login(session.pseudo()).await?;
        tracing::info!(pseudo = %response.pseudo, "Logged in");
        self.sessions.save(&session);
        Ok(session)
    }

    /// Clear the persisted identity and every cache tied to it. The
    /// session is consumed: there is no valid identity to hold after
    /// logout.
    pub async fn logout(&self, session: Session) {
        self.sessions.clear();
        self.cache.write().await.clear();
        self.batches.write().await.clear();
        tracing::info!(pseudo = %session.pseudo(), "Logged out");
    }

    // ---- mutations ----

    /// Submit a batch in one round trip. On success the submitting
    /// user's batch listing is invalidated so the next read refetches.
    pub async fn submit_batch(
        &self,
        session: &Session,
        sources: &[UploadSource],
    ) -> Result<String, ClientError> {
        let request = UploadBatchRequest {
            pages: sources
                .iter()
                .map(|s| PageUpload {
                    filename: s.filename.clone(),
                    image_base64: BASE64.encode(&s.bytes),
                })
                .collect(),
        };
        let response = self.api.upload_batch(session, &request).await?;

        self.cache
            .write()
            .await
            .invalidate(&CacheTag::UserBatches(session.pseudo().to_string()));

        tracing::info!(
            batch_id = %response.batch_id,
            pages = sources.len(),
            "Batch submitted",
        );
        Ok(response.batch_id)
    }

    // ---- read-through queries ----

    /// Authoritative page statuses for a batch, cached per batch id.
    pub async fn batch_status(
        &self,
        session: &Session,
        batch_id: &str,
    ) -> Result<BatchStatusResponse, ClientError> {
        let key = format!("status/{batch_id}");
        if let Some(hit) = self.cache.read().await.get(&key) {
            return Ok(hit);
        }
        let response = self.api.batch_status(session, batch_id).await?;
        self.cache.write().await.put(
            &key,
            &response,
            [
                CacheTag::BatchStatus(batch_id.to_string()),
                CacheTag::Batch(batch_id.to_string()),
            ],
        );
        self.reconcile(batch_id, &response.pages).await;
        Ok(response)
    }

    /// Batch results (statuses plus translated URLs), cached per batch.
    pub async fn batch_result(
        &self,
        session: &Session,
        batch_id: &str,
    ) -> Result<BatchResultResponse, ClientError> {
        let key = format!("result/{batch_id}");
        if let Some(hit) = self.cache.read().await.get(&key) {
            return Ok(hit);
        }
        let response = self.api.batch_result(session, batch_id).await?;
        self.cache.write().await.put(
            &key,
            &response,
            [
                CacheTag::BatchResult(batch_id.to_string()),
                CacheTag::Batch(batch_id.to_string()),
            ],
        );
        self.reconcile(batch_id, &response.pages).await;
        Ok(response)
    }

    /// Every batch the user submitted, cached per user.
    pub async fn user_batches(
        &self,
        session: &Session,
    ) -> Result<UserBatchesResponse, ClientError> {
        let key = format!("user/{}/batches", session.pseudo());
        if let Some(hit) = self.cache.read().await.get(&key) {
            return Ok(hit);
        }
        let response = self.api.user_batches(session).await?;
        self.cache.write().await.put(
            &key,
            &response,
            [CacheTag::UserBatches(session.pseudo().to_string())],
        );
        Ok(response)
    }

    /// Every finished page of the user, cached per user.
    pub async fn user_translated_pages(
        &self,
        session: &Session,
    ) -> Result<TranslatedPagesResponse, ClientError> {
        let key = format!("user/{}/translated-pages", session.pseudo());
        if let Some(hit) = self.cache.read().await.get(&key) {
            return Ok(hit);
        }
        let response = self.api.user_translated_pages(session).await?;
        self.cache.write().await.put(
            &key,
            &response,
            [CacheTag::UserTranslated(session.pseudo().to_string())],
        );
        Ok(response)
    }

    /// Finished pages of one batch, cached under the batch's tags.
    pub async fn batch_translated_pages(
        &self,
        session: &Session,
        batch_id: &str,
    ) -> Result<TranslatedPagesResponse, ClientError> {
        let key = format!("batch/{batch_id}/translated-pages");
        if let Some(hit) = self.cache.read().await.get(&key) {
            return Ok(hit);
        }
        let response = self.api.batch_translated_pages(session, batch_id).await?;
        self.cache.write().await.put(
            &key,
            &response,
            [
                CacheTag::BatchResult(batch_id.to_string()),
                CacheTag::Batch(batch_id.to_string()),
            ],
        );
        Ok(response)
    }

    // ---- invalidation ----

    /// Drop every cached query that reads the named batch.
    pub async fn invalidate_batch(&self, batch_id: &str) {
        let mut cache = self.cache.write().await;
        cache.invalidate(&CacheTag::Batch(batch_id.to_string()));
        cache.invalidate(&CacheTag::BatchStatus(batch_id.to_string()));
        cache.invalidate(&CacheTag::BatchResult(batch_id.to_string()));
    }

    /// Drop every cached query. This is the handler for an advisory
    /// live-channel hint, which says only "something changed".
    pub async fn invalidate_all(&self) {
        self.cache.write().await.clear();
    }

    // ---- local advisory copies ----

    /// The last reconciled local copy of a remote batch, if any fetch
    /// has succeeded for it.
    pub async fn local_batch(&self, batch_id: &str) -> Option<Batch> {
        self.batches.read().await.get(batch_id).cloned()
    }

    /// Rebuild the local copy of a batch from freshly fetched pages,
    /// carrying over what must stay monotone.
    async fn reconcile(&self, batch_id: &str, pages: &[PageData]) {
        let mut batches = self.batches.write().await;
        let rebuilt = reconcile::apply_remote_pages(batches.get(batch_id), batch_id, pages);
        tracing::debug!(batch_id, status = ?rebuilt.status, "Reconciled remote batch");
        batches.insert(batch_id.to_string(), rebuilt);
    }
}
