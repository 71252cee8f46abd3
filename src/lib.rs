//! Two-player sea battle over a direct TCP link.
//!
//! [`net`] establishes the link and reports everything it sees on one event
//! queue, [`transport`] frames bytes on the socket, [`protocol`] defines the
//! JSON messages and [`session`] keeps each peer's copy of the game in step.

mod common;
pub mod config;
pub mod engine;
pub mod error;
mod logging;
pub mod net;
pub mod protocol;
pub mod session;
pub mod transport;
pub mod ui;

pub use common::*;
pub use config::SessionConfig;
pub use engine::{Battlefield, BoardView, CellView, GameEngine, ShotOutcome};
pub use error::{ActionError, EngineError, NetError, ProtocolWarning};
pub use logging::{init_logging, level_from_env, LOG_ENV};
pub use net::{Connection, LinkState, NetEvent, NetworkManager, StatusUpdate};
pub use protocol::Message;
pub use session::{GameEvent, GamePhase, Outcome, Session};
pub use ui::{deliver, SessionUi};
