//! Events broadcast by the live channel to its subscribers.

/// Connectivity changes and remote-change hints.
///
/// `ChangeHint` is advisory: it means "remote state changed, re-fetch
/// what you care about". The message carries no schema and is never the
/// source of truth, so there is no payload, no acknowledgment, and no
/// message-level retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelEvent {
    /// The socket is up; live hints will flow.
    Connected,
    /// The socket is down; callers fall back to polling.
    Disconnected,
    /// Remote state changed somewhere; re-fetch via the sync client.
    ChangeHint,
}
