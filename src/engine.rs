//! Rules engine seam.
//!
//! The session only talks to the board through [`GameEngine`]; the stock
//! implementation is [`Battlefield`].

use core::fmt;

use crate::common::{CellState, Coord};
use crate::config::{BOARD_SIZE, ROW_LABELS};
use crate::error::EngineError;

mod battlefield;
mod mask;

pub use battlefield::Battlefield;
pub use mask::Mask;

/// Result of applying an opponent's shot to the local board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShotOutcome {
    pub cell_state: CellState,
    /// Id of the ship this shot sank, if any.
    pub ship_sunk_id: Option<String>,
    /// Every ship on the board is now sunk.
    pub game_over: bool,
}

/// Narrow contract the session consumes.
pub trait GameEngine: Send {
    /// Apply a shot at `at`. Fails if the cell was already targeted.
    fn apply_shot(&mut self, at: Coord) -> Result<ShotOutcome, EngineError>;

    /// Snapshot of the board; unhit ships are only shown when `reveal_ships`.
    fn board_view(&self, reveal_ships: bool) -> BoardView;

    /// Place a ship over `cells`, returning its id.
    fn place_ship(&mut self, cells: &[Coord]) -> Result<String, EngineError>;
}

/// What a single cell looks like from one player's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellView {
    #[default]
    Water,
    Ship,
    Hit,
    Miss,
    Killed,
}

impl CellView {
    pub fn symbol(self) -> char {
        match self {
            CellView::Water => '~',
            CellView::Ship => 'S',
            CellView::Hit => 'X',
            CellView::Miss => 'O',
            CellView::Killed => '#',
        }
    }
}

impl From<CellState> for CellView {
    fn from(state: CellState) -> Self {
        match state {
            CellState::Hit => CellView::Hit,
            CellState::Miss => CellView::Miss,
            CellState::Killed => CellView::Killed,
        }
    }
}

/// A full grid of [`CellView`]s.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BoardView {
    cells: [[CellView; BOARD_SIZE]; BOARD_SIZE],
}

impl BoardView {
    pub fn get(&self, at: Coord) -> CellView {
        self.cells[at.row()][at.col()]
    }

    pub fn set(&mut self, at: Coord, view: CellView) {
        self.cells[at.row()][at.col()] = view;
    }

    /// Rows top to bottom.
    pub fn rows(&self) -> &[[CellView; BOARD_SIZE]; BOARD_SIZE] {
        &self.cells
    }

    pub fn count(&self, view: CellView) -> usize {
        self.cells.iter().flatten().filter(|c| **c == view).count()
    }
}

impl fmt::Display for BoardView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "   ")?;
        for col in 1..=BOARD_SIZE {
            write!(f, "{:>3}", col)?;
        }
        writeln!(f)?;
        for (label, row) in ROW_LABELS.iter().zip(self.cells.iter()) {
            write!(f, "{:>3}", label)?;
            for cell in row {
                write!(f, "{:>3}", cell.symbol())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
