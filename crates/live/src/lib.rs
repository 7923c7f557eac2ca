//! Live update channel: one WebSocket connection per client session,
//! pushing advisory "something changed" hints.
//!
//! The channel is best-effort: the client must stay fully functional
//! on polling alone. An unexpected close schedules exactly
//! one reconnect after a fixed delay; an intentional close (normal
//! closure code) or an explicit shutdown schedules none. Disconnection
//! is surfaced only as a connectivity event, never as an error.

pub mod channel;
pub mod events;
pub mod state;

pub use channel::{LiveChannel, ReconnectConfig};
pub use events::ChannelEvent;
pub use state::{Action, ChannelPhase, ChannelStateMachine, CloseKind};
