//! Difficulty adjustment.
//!
//! A deliberately damped linear-feedback controller: ±1 per block depending
//! on how many blocks in the trailing window were solved, clamped to a
//! fixed range. Proportional control would oscillate under signature-count
//! noise.

use palisade_types::Block;

/// Difficulty assigned to the first block, and the floor thereafter.
pub const BASELINE_DIFFICULTY: u64 = 14;

/// Upper clamp for the difficulty target.
pub const MAX_DIFFICULTY: u64 = 256;

/// Computes the next block's target difficulty from chain history.
#[derive(Clone, Copy, Debug)]
pub struct DifficultyAdjuster {
    window_size: u64,
}

impl DifficultyAdjuster {
    pub fn new(window_size: u64) -> Self {
        Self { window_size }
    }

    pub fn window_size(&self) -> u64 {
        self.window_size
    }

    /// Difficulty for the block following `previous`.
    ///
    /// No previous block (height 1) yields the baseline. Otherwise the
    /// previous difficulty moves up by one when more than half the trailing
    /// window was solved, down by one otherwise, clamped to
    /// [`BASELINE_DIFFICULTY`, `MAX_DIFFICULTY`].
    pub fn next(&self, previous: Option<&Block>, solved_in_window: u64) -> u64 {
        let Some(previous) = previous else {
            return BASELINE_DIFFICULTY;
        };

        let current = if solved_in_window > self.window_size / 2 {
            previous.difficulty.saturating_add(1)
        } else {
            previous.difficulty.saturating_sub(1)
        };

        current.clamp(BASELINE_DIFFICULTY, MAX_DIFFICULTY)
    }
}
