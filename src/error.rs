use thiserror::Error;

/// Errors raised by the grid, board and piece model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    /// A piece was merged into a board it collides with
    #[error("piece at ({row}, {col}) collides with the board")]
    Collision { row: i32, col: i32 },

    /// Rows of a grid had different lengths
    #[error("grid rows must all have the same length")]
    JaggedGrid,

    /// A grid needs at least one row and one column
    #[error("grid must have at least one row and one column")]
    EmptyGrid,
}

/// Errors raised by high-score persistence.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed entry on line {line}")]
    Parse { line: usize },
}
