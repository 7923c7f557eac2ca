//! Headless watcher: the reference consumer of the scantrad client
//! stack. Logs in (or restores a session), optionally submits a
//! directory of pages as one batch, then follows batch progress via
//! live-channel hints with polling as the fallback.
//!
//! With `SCANTRAD_OFFLINE=1` the backend is skipped entirely and the
//! local simulation engine processes the batch instead, as the dev
//! fallback; the backend-backed mode is the authoritative one.

mod config;

use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scantrad_client::{BackendApi, SessionStore, SyncClient, UploadSource};
use scantrad_core::projection::{BatchDisplay, QueryState};
use scantrad_engine::{FsPreviewStore, LifecycleEngine, PacingConfig, PageSource, PreviewStore};
use scantrad_live::{ChannelEvent, LiveChannel, ReconnectConfig};
use scantrad_store::DurableStore;

use config::WatchConfig;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scantrad=debug,scantrad_watch=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = WatchConfig::from_env();
    tracing::info!(backend = %config.backend_url, offline = config.offline, "Loaded watcher configuration");

    if config.offline {
        run_offline(&config).await;
    } else {
        run_watch(&config).await;
    }
}

/// Backend-backed mode: submit, then follow remote state.
async fn run_watch(config: &WatchConfig) {
    let sessions = SessionStore::new(config.data_dir.join("session.json"));
    let client = SyncClient::new(BackendApi::new(config.backend_url.clone()), sessions);

    let session = match client.restore_session() {
        Some(session) => {
            tracing::info!(pseudo = %session.pseudo(), "Restored persisted session");
            session
        }
        None => {
            let pseudo = config
                .pseudo
                .as_deref()
                .expect("no persisted session: set SCANTRAD_PSEUDO to log in");
            client.login(pseudo).await.expect("login failed")
        }
    };

    if let Some(dir) = &config.pages_dir {
        let sources = read_page_files(dir, |name, bytes| UploadSource::new(name, bytes));
        if sources.is_empty() {
            tracing::warn!(dir = %dir.display(), "No page images found, nothing submitted");
        } else {
            match client.submit_batch(&session, &sources).await {
                Ok(batch_id) => tracing::info!(batch_id = %batch_id, "Submitted batch"),
                Err(e) if e.is_network() => {
                    tracing::error!(error = %e, "Network failure submitting batch; it can be retried")
                }
                Err(e) => tracing::error!(error = %e, "Backend rejected batch"),
            }
        }
    }

    let channel = LiveChannel::start(config.ws_url.clone(), ReconnectConfig::default());
    let mut events = channel.subscribe();
    let mut poll = tokio::time::interval(config.poll_interval);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                channel.shutdown().await;
                return;
            }
            event = events.recv() => match event {
                Ok(ChannelEvent::Connected) => tracing::info!("Live updates: connected"),
                Ok(ChannelEvent::Disconnected) => tracing::info!("Live updates: disconnected, polling only"),
                Ok(ChannelEvent::ChangeHint) => {
                    // Advisory hint: drop caches and re-read.
                    client.invalidate_all().await;
                    refresh(&client, &session).await;
                }
                Err(_) => {}
            },
            _ = poll.tick() => refresh(&client, &session).await,
        }
    }
}

/// Re-read the user's batches and log a display projection per batch.
async fn refresh(client: &SyncClient, session: &scantrad_client::Session) {
    let listing = match client.user_batches(session).await {
        Ok(resp) => QueryState::Data(resp),
        Err(e) if e.is_network() => {
            tracing::warn!(error = %e, "Batch listing unreachable, will retry on next poll");
            QueryState::Error(e.to_string())
        }
        Err(e) => {
            tracing::error!(error = %e, "Batch listing failed");
            QueryState::Error(e.to_string())
        }
    };

    let Some(resp) = listing.data() else { return };
    for remote in &resp.batches {
        if let Err(e) = client.batch_status(session, &remote.id).await {
            tracing::warn!(batch_id = %remote.id, error = %e, "Status fetch failed");
            continue;
        }
        if let Some(batch) = client.local_batch(&remote.id).await {
            log_batch(&BatchDisplay::from(&batch));
        }
    }
}

fn log_batch(view: &BatchDisplay) {
    tracing::info!(
        batch_id = %view.id,
        status = ?view.status,
        pages_done = view.completed_pages,
        pages_total = view.total_pages,
        "Batch state",
    );
}

/// Offline mode: run the local simulation engine end to end.
async fn run_offline(config: &WatchConfig) {
    let store = DurableStore::new(config.data_dir.join("batches.json"));
    let previews: Arc<dyn PreviewStore> =
        Arc::new(FsPreviewStore::new(config.data_dir.join("previews")));
    let engine = LifecycleEngine::new(store, previews, PacingConfig::default());

    let dir = config
        .pages_dir
        .as_deref()
        .expect("offline mode needs SCANTRAD_PAGES_DIR");
    let sources = read_page_files(dir, |name, bytes| PageSource::new(name, bytes));
    if sources.is_empty() {
        tracing::warn!(dir = %dir.display(), "No page images found");
        return;
    }

    let batch_id = engine.create_batch(sources).await.expect("create batch");
    engine
        .process_batch(&batch_id, |page_id, percent, status| {
            tracing::info!(page_id, percent, ?status, "Progress");
        })
        .await;

    if let Some(batch) = engine.batch(&batch_id).await {
        log_batch(&BatchDisplay::from(&batch));
    }
}

/// Collect the image files of a directory in name order.
fn read_page_files<T>(dir: &Path, build: impl Fn(String, Vec<u8>) -> T) -> Vec<T> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        tracing::warn!(dir = %dir.display(), "Cannot read pages directory");
        return Vec::new();
    };

    let mut paths: Vec<_> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| {
            matches!(
                p.extension().and_then(|e| e.to_str()),
                Some("png" | "jpg" | "jpeg" | "webp")
            )
        })
        .collect();
    paths.sort();

    paths
        .into_iter()
        .filter_map(|path| {
            let filename = path.file_name()?.to_string_lossy().into_owned();
            match std::fs::read(&path) {
                Ok(bytes) => Some(build(filename, bytes)),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable file");
                    None
                }
            }
        })
        .collect()
}
