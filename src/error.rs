//! Error types for the transport, the rules engine and the session.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

use crate::common::Coord;
use crate::session::GamePhase;

/// Connection-level failures. These never cross into UI code directly; the
/// session manager turns them into status events.
#[derive(Debug, Error)]
pub enum NetError {
    /// I/O failure on the socket (reset, broken pipe, OS error).
    #[error("transport error: {0}")]
    Transport(#[source] io::Error),
    /// The stream ended while more bytes were expected.
    #[error("connection closed by peer")]
    PeerClosed,
    /// A frame arrived intact but its payload could not be interpreted.
    #[error("protocol error: {0}")]
    Protocol(String),
    /// A length prefix above the configured limit. The next frame boundary
    /// is unknown after this, so the stream cannot be resynchronised.
    #[error("protocol error: frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge { len: u64, max: u32 },
    #[error("could not listen on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("could not connect to {addr}: {source}")]
    Dial {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("not connected")]
    NotConnected,
}

impl NetError {
    /// Whether the receive loop can carry on with the next frame.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, NetError::Protocol(_))
    }
}

impl From<io::Error> for NetError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => NetError::PeerClosed,
            _ => NetError::Transport(err),
        }
    }
}

impl From<serde_json::Error> for NetError {
    fn from(err: serde_json::Error) -> Self {
        NetError::Protocol(err.to_string())
    }
}

/// Rule violations reported by a [`GameEngine`](crate::engine::GameEngine).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("coordinates ({x}, {y}) are out of bounds")]
    OutOfBounds { x: String, y: String },
    #[error("cell {0} has already been targeted")]
    AlreadyTargeted(Coord),
    #[error("ship coordinates cannot be empty")]
    EmptyShip,
    #[error("ship of {0} cells is longer than allowed")]
    ShipTooLong(usize),
    #[error("ship overlaps with an existing ship at {0}")]
    Overlap(Coord),
    #[error("cannot place ship at {0}: too close to another ship")]
    TooClose(Coord),
    #[error("ship must be placed in a straight line")]
    NotStraight,
    #[error("ship cells are not contiguous")]
    NotContiguous,
}

/// A local player action the session refused. State is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("not allowed during {0}")]
    WrongPhase(GamePhase),
    #[error("it is not your turn")]
    NotYourTurn,
    #[error("still waiting for the result of the shot at {0}")]
    ShotPending(Coord),
    #[error("cell {0} has already been targeted")]
    AlreadyTargeted(Coord),
    #[error("all {0}-cell ships are already placed")]
    LengthExhausted(usize),
    #[error("could not find room for the remaining ships")]
    NoRoom,
    #[error("a new game request is already pending")]
    RequestPending,
    #[error("there is no new game request to answer")]
    NoRequest,
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Something the peer said that does not fit local state. The connection
/// stays open and local state is not mutated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolWarning {
    /// Peers disagree about the game state.
    #[error("desync: {0}")]
    Desync(String),
    /// A well-formed message that is not valid in the current phase.
    #[error("unexpected {kind} during {phase}")]
    Unexpected { kind: &'static str, phase: GamePhase },
    /// A payload whose fields cannot be interpreted.
    #[error("invalid {kind}: {reason}")]
    Invalid { kind: &'static str, reason: String },
}
