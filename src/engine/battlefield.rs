//! Standard sea battle board: ships placement, hit detection and sinking.

use crate::common::{CellState, Coord};
use crate::config::MAX_SHIP_LEN;
use crate::error::EngineError;

use super::{BoardView, CellView, GameEngine, Mask, ShotOutcome};

#[derive(Debug, Clone)]
struct PlacedShip {
    id: String,
    cells: Mask,
}

impl PlacedShip {
    fn is_sunk(&self, hits: Mask) -> bool {
        (self.cells & hits) == self.cells
    }
}

/// One player's own board.
///
/// Ships are straight runs of up to [`MAX_SHIP_LEN`] cells that may not
/// touch each other, not even diagonally. Fleet composition is tracked by
/// the session, not here.
#[derive(Debug, Clone, Default)]
pub struct Battlefield {
    ships: Vec<PlacedShip>,
    occupied: Mask,
    hits: Mask,
    misses: Mask,
}

impl Battlefield {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ship_count(&self) -> usize {
        self.ships.len()
    }

    /// Ships not yet sunk.
    pub fn ships_afloat(&self) -> usize {
        self.ships.iter().filter(|s| !s.is_sunk(self.hits)).count()
    }

    pub fn is_targeted(&self, at: Coord) -> bool {
        self.hits.contains(at) || self.misses.contains(at)
    }

    /// Whether every placed ship is sunk. An empty board is never lost.
    pub fn all_sunk(&self) -> bool {
        !self.ships.is_empty() && (self.occupied & !self.hits).is_empty()
    }

    fn validate(&self, cells: &[Coord]) -> Result<Vec<Coord>, EngineError> {
        if cells.is_empty() {
            return Err(EngineError::EmptyShip);
        }
        if cells.len() > MAX_SHIP_LEN {
            return Err(EngineError::ShipTooLong(cells.len()));
        }
        let forbidden = self.occupied.halo();
        for &cell in cells {
            if self.occupied.contains(cell) {
                return Err(EngineError::Overlap(cell));
            }
            if forbidden.contains(cell) {
                return Err(EngineError::TooClose(cell));
            }
        }

        let mut sorted = cells.to_vec();
        sorted.sort();
        sorted.dedup();
        if sorted.len() != cells.len() {
            return Err(EngineError::NotContiguous);
        }
        let horizontal = sorted.iter().all(|c| c.row() == sorted[0].row());
        let vertical = sorted.iter().all(|c| c.col() == sorted[0].col());
        if !horizontal && !vertical {
            return Err(EngineError::NotStraight);
        }
        let contiguous = sorted.windows(2).all(|pair| {
            if horizontal {
                pair[1].col() == pair[0].col() + 1
            } else {
                pair[1].row() == pair[0].row() + 1
            }
        });
        if !contiguous {
            return Err(EngineError::NotContiguous);
        }
        Ok(sorted)
    }
}

/// `"<len>-"` followed by each cell, e.g. `"3-1A2A3A"`.
fn ship_id(sorted: &[Coord]) -> String {
    let mut id = format!("{}-", sorted.len());
    for cell in sorted {
        id.push_str(&cell.to_string());
    }
    id
}

impl GameEngine for Battlefield {
    fn apply_shot(&mut self, at: Coord) -> Result<ShotOutcome, EngineError> {
        if self.is_targeted(at) {
            return Err(EngineError::AlreadyTargeted(at));
        }
        if !self.occupied.contains(at) {
            self.misses.insert(at);
            return Ok(ShotOutcome {
                cell_state: CellState::Miss,
                ship_sunk_id: None,
                game_over: false,
            });
        }

        self.hits.insert(at);
        let sunk = self
            .ships
            .iter()
            .find(|s| s.cells.contains(at))
            .filter(|s| s.is_sunk(self.hits))
            .map(|s| s.id.clone());
        let cell_state = if sunk.is_some() {
            CellState::Killed
        } else {
            CellState::Hit
        };
        Ok(ShotOutcome {
            cell_state,
            ship_sunk_id: sunk,
            game_over: self.all_sunk(),
        })
    }

    fn board_view(&self, reveal_ships: bool) -> BoardView {
        let mut view = BoardView::default();
        for at in self.misses.iter() {
            view.set(at, CellView::Miss);
        }
        for ship in &self.ships {
            let sunk = ship.is_sunk(self.hits);
            for at in ship.cells.iter() {
                let cell = if sunk {
                    CellView::Killed
                } else if self.hits.contains(at) {
                    CellView::Hit
                } else if reveal_ships {
                    CellView::Ship
                } else {
                    CellView::Water
                };
                view.set(at, cell);
            }
        }
        view
    }

    fn place_ship(&mut self, cells: &[Coord]) -> Result<String, EngineError> {
        let sorted = self.validate(cells)?;
        let mask = Mask::from_cells(&sorted);
        let id = ship_id(&sorted);
        self.occupied |= mask;
        self.ships.push(PlacedShip {
            id: id.clone(),
            cells: mask,
        });
        Ok(id)
    }
}
