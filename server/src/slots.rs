//! Human player slot bookkeeping.

use arena_shared::MAX_CLIENTS;

/// Which of the `MAX_CLIENTS` player slots are held by a connected human.
///
/// Allocation is first-fit from the lowest index, so the same sequence of
/// joins and leaves always yields the same slots and host hand-overs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerSlots {
    occupied: [bool; MAX_CLIENTS],
}

impl PlayerSlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lowest free slot, without claiming it.
    pub fn next_free(&self) -> Option<usize> {
        self.occupied.iter().position(|taken| !taken)
    }

    pub fn occupy(&mut self, slot: usize) {
        if let Some(taken) = self.occupied.get_mut(slot) {
            *taken = true;
        }
    }

    pub fn release(&mut self, slot: usize) {
        if let Some(taken) = self.occupied.get_mut(slot) {
            *taken = false;
        }
    }

    pub fn is_occupied(&self, slot: usize) -> bool {
        self.occupied.get(slot).copied().unwrap_or(false)
    }

    pub fn lowest_occupied(&self) -> Option<usize> {
        self.occupied.iter().position(|taken| *taken)
    }

    /// Occupied slot indices in ascending order.
    pub fn occupied(&self) -> impl Iterator<Item = usize> + '_ {
        self.occupied
            .iter()
            .enumerate()
            .filter(|(_, taken)| **taken)
            .map(|(slot, _)| slot)
    }

    pub fn count(&self) -> usize {
        self.occupied.iter().filter(|taken| **taken).count()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn to_vec(&self) -> Vec<bool> {
        self.occupied.to_vec()
    }
}
