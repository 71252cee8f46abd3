//! Messages exchanged between the two peers.
//!
//! Every message is a JSON object `{"type": <string>, "payload": <object>}`
//! carried in one length-prefixed frame.

use serde::{Deserialize, Serialize};

use crate::error::NetError;

pub mod domain;

pub use domain::*;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Message {
    /// Placement progress of the sender's fleet.
    ShipPlacement(ShipPlacement),
    /// A shot at the receiver's board.
    Shot(Shot),
    /// Reply to a [`Message::Shot`].
    ShotResult(ShotResult),
    /// Sent by the host once both fleets are placed.
    GameStart(GameStart),
    NewGameRequest(NewGameRequest),
    NewGameResponse(NewGameResponse),
}

impl Message {
    /// Wire name of the message type.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::ShipPlacement(_) => "ship_placement",
            Message::Shot(_) => "shot",
            Message::ShotResult(_) => "shot_result",
            Message::GameStart(_) => "game_start",
            Message::NewGameRequest(_) => "new_game_request",
            Message::NewGameResponse(_) => "new_game_response",
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>, NetError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode one frame payload. Invalid UTF-8, malformed JSON, unknown
    /// types and missing fields all map to [`NetError::Protocol`].
    pub fn from_json(bytes: &[u8]) -> Result<Self, NetError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
