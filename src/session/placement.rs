use std::collections::BTreeMap;

use crate::config::{fleet_size, ships_of_length, FLEET};

/// Ships placed so far per ship length, checked against [`FLEET`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlacementProgress {
    placed: BTreeMap<u8, u8>,
}

impl PlacementProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mirror of the peer's progress as reported in `ship_placement`.
    pub fn from_wire(counts: &BTreeMap<u8, u8>) -> Self {
        Self {
            placed: counts
                .iter()
                .filter(|(_, count)| **count > 0)
                .map(|(len, count)| (*len, *count))
                .collect(),
        }
    }

    /// Every fleet length with its count, zeros included.
    pub fn to_wire(&self) -> BTreeMap<u8, u8> {
        FLEET
            .iter()
            .map(|(len, _)| (*len, self.placed_of(*len)))
            .collect()
    }

    pub fn placed_of(&self, length: u8) -> u8 {
        self.placed.get(&length).copied().unwrap_or(0)
    }

    /// Ships of `length` still to be placed.
    pub fn remaining_of(&self, length: u8) -> u8 {
        ships_of_length(length).saturating_sub(self.placed_of(length))
    }

    pub fn can_place(&self, length: usize) -> bool {
        u8::try_from(length)
            .map(|len| self.remaining_of(len) > 0)
            .unwrap_or(false)
    }

    pub fn record(&mut self, length: usize) {
        if let Ok(len) = u8::try_from(length) {
            *self.placed.entry(len).or_default() += 1;
        }
    }

    pub fn total_placed(&self) -> usize {
        self.placed.values().map(|count| *count as usize).sum()
    }

    pub fn is_complete(&self) -> bool {
        FLEET
            .iter()
            .all(|(len, count)| self.placed_of(*len) >= *count)
    }

    /// e.g. `"1x4, 2x3"`, longest ships first.
    pub fn summary(&self) -> String {
        if self.placed.is_empty() {
            return format!("0/{} ships", fleet_size());
        }
        self.placed
            .iter()
            .rev()
            .map(|(len, count)| format!("{}x{}", count, len))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
