//! Client error taxonomy.

/// Errors surfaced by the remote sync client.
///
/// The two network-facing variants are deliberately distinguishable by
/// response presence: `Request` means the call itself failed (DNS, TLS,
/// refused connection, no response at all), `Api` means the backend
/// answered with a non-2xx status. The client never retries either;
/// retry actions are a caller decision.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The HTTP request failed before a response arrived.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend returned a non-2xx status code.
    #[error("backend error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The pseudo failed client-side validation (mirrors the backend's
    /// own login rule).
    #[error("invalid pseudo: {0}")]
    InvalidPseudo(String),
}

impl ClientError {
    /// True when no response was received at all (a transient network
    /// failure, as opposed to an application-level rejection).
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Request(_))
    }
}
