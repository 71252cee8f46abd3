//! Common types shared by the engine, the wire protocol and the session:
//! board coordinates, shot outcomes and peer roles.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::{BOARD_SIZE, ROW_LABELS};
use crate::error::EngineError;

/// A cell on the board. Rows are `A`..`J`, columns `1`..`10`.
///
/// Field order gives row-major ordering, which is also the order ship ids
/// list their cells in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coord {
    row: u8,
    col: u8,
}

impl Coord {
    /// Build from zero-based column and row indices.
    pub fn new(col: usize, row: usize) -> Option<Self> {
        (col < BOARD_SIZE && row < BOARD_SIZE).then_some(Self {
            row: row as u8,
            col: col as u8,
        })
    }

    /// Parse the wire representation: `x` is the column label, `y` the row label.
    pub fn parse(x: &str, y: &str) -> Result<Self, EngineError> {
        let out_of_bounds = || EngineError::OutOfBounds {
            x: x.to_string(),
            y: y.to_string(),
        };
        let col = x
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|c| (1..=BOARD_SIZE).contains(c))
            .ok_or_else(out_of_bounds)?;
        let row = ROW_LABELS
            .iter()
            .position(|label| label.eq_ignore_ascii_case(y.trim()))
            .ok_or_else(out_of_bounds)?;
        Ok(Self {
            row: row as u8,
            col: (col - 1) as u8,
        })
    }

    /// Column label, `"1"`..`"10"`.
    pub fn x(&self) -> String {
        (self.col + 1).to_string()
    }

    /// Row label, `"A"`..`"J"`.
    pub fn y(&self) -> &'static str {
        ROW_LABELS[self.row as usize]
    }

    pub fn col(&self) -> usize {
        self.col as usize
    }

    pub fn row(&self) -> usize {
        self.row as usize
    }

    /// Row-major index in `0..BOARD_SIZE * BOARD_SIZE`.
    pub fn index(&self) -> usize {
        self.row as usize * BOARD_SIZE + self.col as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::new(index % BOARD_SIZE, index / BOARD_SIZE)
    }

    /// All cells in row-major order.
    pub fn all() -> impl Iterator<Item = Coord> {
        (0..BOARD_SIZE * BOARD_SIZE).filter_map(Coord::from_index)
    }

    /// The up to eight cells touching this one, diagonals included.
    pub fn neighbours(&self) -> impl Iterator<Item = Coord> + '_ {
        (-1i32..=1)
            .flat_map(|dr| (-1i32..=1).map(move |dc| (dr, dc)))
            .filter(|&(dr, dc)| dr != 0 || dc != 0)
            .filter_map(move |(dr, dc)| {
                let row = self.row as i32 + dr;
                let col = self.col as i32 + dc;
                if row < 0 || col < 0 {
                    return None;
                }
                Coord::new(col as usize, row as usize)
            })
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.x(), self.y())
    }
}

/// Accepts `3B`, `10J` and the letter-first forms `B3`, `j10`.
impl FromStr for Coord {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| c.is_ascii_alphabetic())
            .filter(|&i| i > 0)
            .unwrap_or_else(|| {
                s.find(|c: char| c.is_ascii_digit())
                    .unwrap_or(s.len())
            });
        let (head, tail) = s.split_at(split);
        if head.chars().all(|c| c.is_ascii_digit()) {
            Coord::parse(head, tail)
        } else {
            Coord::parse(tail, head)
        }
    }
}

/// Outcome of a shot as carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellState {
    /// Shot struck a ship that is still afloat.
    Hit,
    /// Shot landed in open water.
    Miss,
    /// Shot sank the ship.
    Killed,
}

impl CellState {
    /// Hits and kills keep the turn with the shooter; only a miss passes it on.
    pub fn passes_turn(self) -> bool {
        matches!(self, CellState::Miss)
    }
}

impl fmt::Display for CellState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CellState::Hit => "hit",
            CellState::Miss => "miss",
            CellState::Killed => "killed",
        })
    }
}

/// Which side of the link a peer is. Doubles as the player index used by
/// `game_start` (`0` is the host).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Host,
    Client,
}

impl Role {
    pub fn index(self) -> u8 {
        match self {
            Role::Host => 0,
            Role::Client => 1,
        }
    }

    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Role::Host),
            1 => Some(Role::Client),
            _ => None,
        }
    }

    pub fn opponent(self) -> Self {
        match self {
            Role::Host => Role::Client,
            Role::Client => Role::Host,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Host => "host",
            Role::Client => "client",
        })
    }
}
