//! The live channel driver: connect, read hints, reconnect.
//!
//! One spawned task owns the only connection handle and drives the
//! [`ChannelStateMachine`], so the single-timer and single-connection
//! invariants hold structurally as well as by the machine's rules.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use crate::events::ChannelEvent;
use crate::state::{Action, ChannelStateMachine, CloseKind};

/// Broadcast capacity for channel events.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Reconnect policy: one attempt after a fixed delay.
///
/// The delay is deliberately flat rather than exponential: the channel
/// is advisory, and a short, predictable retry cadence keeps the
/// connectivity indicator honest.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    pub delay: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(3),
        }
    }
}

/// Handle to the per-session live connection.
///
/// Created once via [`LiveChannel::start`]; cheaply cloned into
/// consumers as an `Arc`. Dropping the handle does not tear the
/// connection down; call [`shutdown`](Self::shutdown) for a deliberate
/// close that schedules no reconnect.
pub struct LiveChannel {
    event_tx: broadcast::Sender<ChannelEvent>,
    cancel: CancellationToken,
    task_handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl LiveChannel {
    /// Spawn the connection task against `<ws_url>/ws` and return the
    /// shared handle.
    pub fn start(ws_url: impl Into<String>, config: ReconnectConfig) -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();

        let url = format!("{}/ws", ws_url.into());
        let tx = event_tx.clone();
        let task_cancel = cancel.clone();
        let task_handle = tokio::spawn(async move {
            run_loop(&url, &config, &tx, &task_cancel).await;
            tracing::debug!("Live channel task exited");
        });

        Arc::new(Self {
            event_tx,
            cancel,
            task_handle: Mutex::new(Some(task_handle)),
        })
    }

    /// Subscribe to connectivity events and change hints.
    pub fn subscribe(&self) -> broadcast::Receiver<ChannelEvent> {
        self.event_tx.subscribe()
    }

    /// Deliberate teardown: closes the socket with a normal-closure
    /// code and guarantees no reconnect is scheduled afterwards.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handle = self.task_handle.lock().expect("task handle lock").take();
        if let Some(handle) = handle {
            let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
        }
    }
}

/// Core loop: connect → read hints → classify the close → maybe wait
/// and reconnect. Runs until an intentional close or cancellation.
async fn run_loop(
    url: &str,
    config: &ReconnectConfig,
    event_tx: &broadcast::Sender<ChannelEvent>,
    cancel: &CancellationToken,
) {
    let mut machine = ChannelStateMachine::new();
    let mut next = machine.on_connect_requested();

    loop {
        match next {
            Action::Connect => {
                if cancel.is_cancelled() {
                    machine.on_shutdown();
                    return;
                }
                match connect_async(url).await {
                    Ok((ws_stream, _response)) => {
                        machine.on_connected();
                        tracing::info!(url, "Live channel connected");
                        let _ = event_tx.send(ChannelEvent::Connected);

                        let kind = read_hints(ws_stream, event_tx, cancel).await;

                        let _ = event_tx.send(ChannelEvent::Disconnected);
                        tracing::info!(url, ?kind, "Live channel closed");
                        next = machine.on_closed(kind);
                    }
                    Err(e) => {
                        tracing::warn!(url, error = %e, "Live channel connect failed");
                        next = machine.on_connect_failed();
                    }
                }
            }
            Action::ScheduleReconnect => {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        machine.on_shutdown();
                        return;
                    }
                    _ = tokio::time::sleep(config.delay) => {}
                }
                next = machine.on_reconnect_timer_fired();
            }
            Action::None => return,
        }
    }
}

/// Read frames until the connection ends, forwarding text frames as
/// change hints. Returns how the connection closed.
async fn read_hints(
    mut ws_stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    event_tx: &broadcast::Sender<ChannelEvent>,
    cancel: &CancellationToken,
) -> CloseKind {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                // Deliberate teardown: best-effort normal close.
                let _ = ws_stream.close(None).await;
                return CloseKind::Intentional;
            }
            frame = ws_stream.next() => match frame {
                Some(Ok(Message::Text(_))) => {
                    // No schema: any text frame means "re-fetch".
                    let _ = event_tx.send(ChannelEvent::ChangeHint);
                }
                Some(Ok(Message::Binary(_))) => {
                    tracing::trace!("Ignoring binary frame on live channel");
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                    // Handled automatically by tungstenite.
                }
                Some(Ok(Message::Close(frame))) => {
                    let intentional =
                        matches!(&frame, Some(f) if f.code == CloseCode::Normal);
                    tracing::debug!(?frame, "Live channel close frame");
                    let _ = ws_stream.flush().await;
                    return if intentional {
                        CloseKind::Intentional
                    } else {
                        CloseKind::Unexpected
                    };
                }
                Some(Ok(Message::Frame(_))) => {}
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "Live channel receive error");
                    return CloseKind::Unexpected;
                }
                None => return CloseKind::Unexpected,
            }
        }
    }
}
