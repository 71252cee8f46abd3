use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::common::{CellState, Coord};
use crate::error::EngineError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipPlacement {
    pub player_name: String,
    pub finished_placement: bool,
    /// Ships placed so far, keyed by ship length.
    pub ships_placed_count: BTreeMap<u8, u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shot {
    pub x: String,
    pub y: String,
}

impl Shot {
    pub fn at(at: Coord) -> Self {
        Self {
            x: at.x(),
            y: at.y().to_string(),
        }
    }

    pub fn coord(&self) -> Result<Coord, EngineError> {
        Coord::parse(&self.x, &self.y)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShotResult {
    pub x: String,
    pub y: String,
    pub cell_state: CellState,
    pub ship_sunk_id: Option<String>,
    pub game_over: bool,
    /// Human-readable description, e.g. `"Hit at 3B!"`.
    pub message: String,
}

impl ShotResult {
    pub fn coord(&self) -> Result<Coord, EngineError> {
        Coord::parse(&self.x, &self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStart {
    /// `0` for the host, `1` for the client.
    pub starting_player_index: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGameRequest {
    pub player_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGameResponse {
    pub accepted: bool,
}
