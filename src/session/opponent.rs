use std::collections::BTreeSet;

use crate::common::{CellState, Coord};
use crate::config::BOARD_SIZE;
use crate::engine::{BoardView, CellView};

/// What we know about the opponent's board: only the results of our own
/// shots as the peer reported them.
#[derive(Debug, Clone)]
pub struct OpponentBoard {
    cells: [Option<CellState>; BOARD_SIZE * BOARD_SIZE],
    sunk: BTreeSet<String>,
}

impl Default for OpponentBoard {
    fn default() -> Self {
        Self {
            cells: [None; BOARD_SIZE * BOARD_SIZE],
            sunk: BTreeSet::new(),
        }
    }
}

impl OpponentBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state_at(&self, at: Coord) -> Option<CellState> {
        self.cells[at.index()]
    }

    pub fn is_resolved(&self, at: Coord) -> bool {
        self.state_at(at).is_some()
    }

    /// Record a shot result. A kill also marks every cell of the sunk ship.
    /// Returns `true` when this result sank a ship not seen sunk before.
    pub fn record(&mut self, at: Coord, state: CellState, ship_sunk_id: Option<&str>) -> bool {
        self.cells[at.index()] = Some(state);
        let Some(id) = ship_sunk_id else {
            return false;
        };
        for cell in ship_cells(id) {
            self.cells[cell.index()] = Some(CellState::Killed);
        }
        self.sunk.insert(id.to_string())
    }

    pub fn sunk_count(&self) -> usize {
        self.sunk.len()
    }

    pub fn view(&self) -> BoardView {
        let mut view = BoardView::default();
        for at in Coord::all() {
            if let Some(state) = self.state_at(at) {
                view.set(at, CellView::from(state));
            }
        }
        view
    }
}

/// Cells named by a ship id such as `"2-3B4B"`. Unparsable parts are
/// skipped.
fn ship_cells(id: &str) -> Vec<Coord> {
    let cells = id.split_once('-').map(|(_, cells)| cells).unwrap_or(id);
    let mut out = Vec::new();
    let mut digits = String::new();
    for ch in cells.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
        } else {
            if let Ok(at) = Coord::parse(&digits, &ch.to_string()) {
                out.push(at);
            }
            digits.clear();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> Coord {
        s.parse().unwrap()
    }

    #[test]
    fn parses_ship_id_cells() {
        assert_eq!(ship_cells("2-3B4B"), vec![at("3B"), at("4B")]);
        assert_eq!(ship_cells("3-10A10B10C").len(), 3);
        assert!(ship_cells("garbage").is_empty());
    }

    #[test]
    fn kill_marks_whole_ship_once() {
        let mut board = OpponentBoard::new();
        board.record(at("3B"), CellState::Hit, None);
        assert!(board.record(at("4B"), CellState::Killed, Some("2-3B4B")));
        assert_eq!(board.state_at(at("3B")), Some(CellState::Killed));
        assert!(!board.record(at("4B"), CellState::Killed, Some("2-3B4B")));
        assert_eq!(board.sunk_count(), 1);
        assert_eq!(board.view().count(CellView::Killed), 2);
    }
}
