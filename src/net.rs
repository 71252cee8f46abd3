//! Connection lifecycle for one peer-to-peer link.
//!
//! The [`NetworkManager`] establishes a [`Connection`] as host or client and
//! every observable change is pushed onto a single [`NetEvent`] queue. The
//! consumer of that queue owns the game session; no task here ever touches
//! game state.

use core::fmt;

use crate::protocol::Message;

pub mod addrs;
mod connection;
mod manager;

pub use connection::Connection;
pub use manager::NetworkManager;

/// Lifecycle of a [`Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Idle,
    /// Host bound and waiting for the one player it accepts.
    Listening,
    /// Client dialing the host.
    Connecting,
    Connected,
    /// Terminal. A new session starts from a new connection.
    Disconnected,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LinkState::Idle => "idle",
            LinkState::Listening => "listening",
            LinkState::Connecting => "connecting",
            LinkState::Connected => "connected",
            LinkState::Disconnected => "disconnected",
        })
    }
}

/// A lifecycle transition together with the text shown to the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub state: LinkState,
    pub message: String,
}

impl StatusUpdate {
    pub fn new(state: LinkState, message: impl Into<String>) -> Self {
        Self {
            state,
            message: message.into(),
        }
    }

    pub fn connected(&self) -> bool {
        self.state == LinkState::Connected
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetEvent {
    Status(StatusUpdate),
    /// A decoded message, in the order the peer sent it.
    Message(Message),
    /// A frame that could not be decoded.
    ProtocolError(String),
}
