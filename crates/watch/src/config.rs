use std::path::PathBuf;
use std::time::Duration;

/// Watcher configuration loaded from environment variables.
///
/// All fields have defaults suitable for a local backend; override via
/// environment variables (a `.env` file is honored).
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Backend HTTP base URL (default: `http://localhost:8000`).
    pub backend_url: String,
    /// Backend WebSocket base URL (default: `ws://localhost:8000`).
    pub ws_url: String,
    /// Where the session file, batch store, and staged previews live
    /// (default: `~/.scantrad`).
    pub data_dir: PathBuf,
    /// Identity to log in with when no session is persisted.
    pub pseudo: Option<String>,
    /// Directory of page images to submit as one batch at startup.
    pub pages_dir: Option<PathBuf>,
    /// Run the local simulation engine instead of the backend.
    pub offline: bool,
    /// Polling cadence for batch status (default: 5 s).
    pub poll_interval: Duration,
}

impl WatchConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var              | Default                  |
    /// |----------------------|--------------------------|
    /// | `BACKEND_URL`        | `http://localhost:8000`  |
    /// | `WS_URL`             | `ws://localhost:8000`    |
    /// | `SCANTRAD_DATA_DIR`  | `~/.scantrad`            |
    /// | `SCANTRAD_PSEUDO`    | (unset)                  |
    /// | `SCANTRAD_PAGES_DIR` | (unset)                  |
    /// | `SCANTRAD_OFFLINE`   | `0`                      |
    /// | `POLL_INTERVAL_SECS` | `5`                      |
    pub fn from_env() -> Self {
        let backend_url =
            std::env::var("BACKEND_URL").unwrap_or_else(|_| "http://localhost:8000".into());
        let ws_url = std::env::var("WS_URL").unwrap_or_else(|_| "ws://localhost:8000".into());

        let data_dir = std::env::var("SCANTRAD_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".scantrad")
            });

        let pseudo = std::env::var("SCANTRAD_PSEUDO").ok();
        let pages_dir = std::env::var("SCANTRAD_PAGES_DIR").ok().map(PathBuf::from);

        let offline = std::env::var("SCANTRAD_OFFLINE")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let poll_secs: u64 = std::env::var("POLL_INTERVAL_SECS")
            .unwrap_or_else(|_| "5".into())
            .parse()
            .expect("POLL_INTERVAL_SECS must be a valid u64");

        Self {
            backend_url,
            ws_url,
            data_dir,
            pseudo,
            pages_dir,
            offline,
            poll_interval: Duration::from_secs(poll_secs),
        }
    }
}
