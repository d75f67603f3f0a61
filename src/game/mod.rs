mod board;
mod clock;
mod color;
mod engine;
mod grid;
mod piece;
mod queue;

pub use board::{line_clear_score, Board};
pub use clock::{Clock, ManualClock, SystemClock};
pub use color::Color;
pub use engine::{drop_interval_for_level, Command, Engine, EngineState, GameEvent, Snapshot};
pub use grid::Grid;
pub use piece::{Piece, PieceType};
pub use queue::{
    PieceProvider, PieceQueue, SequencePieceProvider, WeightedRandomProvider, CUMULATIVE_WEIGHTS,
};

// ============================================================================
// Configuration
// ============================================================================

pub const BOARD_ROWS: usize = 20;
pub const BOARD_COLS: usize = 10;
pub const PREVIEW_ROWS: usize = 4;
pub const PREVIEW_COLS: usize = 4;
pub const QUEUE_CAPACITY: usize = 20;

// Gravity timing (in milliseconds)
pub const BASE_DROP_INTERVAL_MS: u64 = 1000;
pub const DROP_INTERVAL_STEP_MS: u64 = 100;
pub const MIN_DROP_INTERVAL_MS: u64 = 100;

/// Column offsets tried, in order, after a rotation
pub const KICK_OFFSETS: [i32; 7] = [0, -1, 1, -2, 2, -3, 3];

// ============================================================================
// Test Helpers
// ============================================================================

pub mod test_helpers {
    use super::*;
    use crate::storage::MemoryStore;

    pub fn empty_board() -> Board {
        Board::empty(BOARD_ROWS, BOARD_COLS)
    }

    pub fn fill_row(grid: &mut Grid, row: usize) {
        fill_row_with_gaps(grid, row, &[]);
    }

    pub fn fill_row_with_gaps(grid: &mut Grid, row: usize, gaps: &[usize]) {
        for col in 0..grid.cols() {
            if !gaps.contains(&col) {
                grid.set(row, col, Color::Purple);
            }
        }
    }

    /// Engine fed by a fixed piece sequence, with an in-memory store and a
    /// manual clock the caller can advance.
    pub fn sequence_engine(pieces: Vec<PieceType>) -> (Engine, ManualClock) {
        let clock = ManualClock::new();
        let engine = Engine::new(
            Box::new(SequencePieceProvider::new(pieces)),
            Box::new(MemoryStore::new()),
            Box::new(clock.clone()),
        );
        (engine, clock)
    }
}
