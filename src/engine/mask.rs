//! A 10×10 bitboard packed into a `u128`.
//!
//! Bit `row * BOARD_SIZE + col` is set when the cell is occupied. Board
//! sets (ships, hits, misses) are combined with plain bitwise operators.

use core::fmt;
use core::ops::{BitAnd, BitOr, BitOrAssign, Not};

use crate::common::Coord;
use crate::config::BOARD_SIZE;

const BOARD_BITS: usize = BOARD_SIZE * BOARD_SIZE;
const FULL: u128 = (1u128 << BOARD_BITS) - 1;

#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct Mask(u128);

impl Mask {
    pub const fn empty() -> Self {
        Mask(0)
    }

    pub fn from_cells<'a>(cells: impl IntoIterator<Item = &'a Coord>) -> Self {
        let mut mask = Mask::empty();
        for cell in cells {
            mask.insert(*cell);
        }
        mask
    }

    #[inline]
    pub fn contains(self, at: Coord) -> bool {
        (self.0 >> at.index()) & 1 == 1
    }

    #[inline]
    pub fn insert(&mut self, at: Coord) {
        self.0 |= 1u128 << at.index();
    }

    pub fn count(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Every set cell plus all cells touching one, diagonals included.
    pub fn halo(self) -> Mask {
        let mut out = self;
        for cell in self.iter() {
            for n in cell.neighbours() {
                out.insert(n);
            }
        }
        out
    }

    /// Set cells in row-major order.
    pub fn iter(self) -> impl Iterator<Item = Coord> {
        (0..BOARD_BITS)
            .filter(move |i| (self.0 >> i) & 1 == 1)
            .filter_map(Coord::from_index)
    }
}

impl BitOr for Mask {
    type Output = Mask;
    fn bitor(self, rhs: Mask) -> Mask {
        Mask(self.0 | rhs.0)
    }
}

impl BitOrAssign for Mask {
    fn bitor_assign(&mut self, rhs: Mask) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Mask {
    type Output = Mask;
    fn bitand(self, rhs: Mask) -> Mask {
        Mask(self.0 & rhs.0)
    }
}

impl Not for Mask {
    type Output = Mask;
    fn not(self) -> Mask {
        Mask(!self.0 & FULL)
    }
}

impl fmt::Debug for Mask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Mask(0x{:x}):", self.0)?;
        for row in 0..BOARD_SIZE {
            for col in 0..BOARD_SIZE {
                let set = Coord::new(col, row).is_some_and(|c| self.contains(c));
                write!(f, "{}", if set { '1' } else { '.' })?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
