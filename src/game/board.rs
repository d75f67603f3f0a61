use crate::error::GameError;
use crate::game::{Color, Grid, Piece};

/// Fixed-size playfield. Operations that change the contents return a new board.
#[derive(Clone, PartialEq, Eq, Debug, Hash)]
pub struct Board {
    grid: Grid,
}

impl Board {
    pub fn new(grid: Grid) -> Self {
        Self { grid }
    }

    pub fn empty(rows: usize, cols: usize) -> Self {
        Self::new(Grid::empty(rows, cols))
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn rows(&self) -> usize {
        self.grid.rows()
    }

    pub fn cols(&self) -> usize {
        self.grid.cols()
    }

    pub fn cell(&self, row: usize, col: usize) -> Color {
        self.grid.get(row, col)
    }

    /// Returns a copy of this board with the piece's filled cells merged in.
    /// Cells above row 0 are dropped.
    pub fn add_piece(&self, piece: &Piece) -> Result<Board, GameError> {
        if piece.collides(self) {
            return Err(GameError::Collision {
                row: piece.row(),
                col: piece.col(),
            });
        }

        let mut grid = self.grid.clone();
        for (r, cells) in piece.grid().iter_rows().enumerate() {
            let row = piece.row() + r as i32;
            if row < 0 {
                continue;
            }
            for (c, &color) in cells.iter().enumerate() {
                if !color.is_empty() {
                    grid.set(row as usize, piece.col() as usize + c, color);
                }
            }
        }
        Ok(Board::new(grid))
    }

    /// Whether every cell of `row` is filled
    pub fn is_row_complete(&self, row: usize) -> bool {
        self.grid.row(row).iter().all(|cell| !cell.is_empty())
    }

    /// Removes every completed row, shifting the rows above down and padding
    /// the top with empty rows. Returns the new board and the number of rows
    /// removed.
    pub fn remove_completed_rows(&self) -> (Board, usize) {
        let mut grid = self.grid.clone();
        let cleared = grid.retain_rows(|row| row.iter().all(|cell| !cell.is_empty()));
        (Board::new(grid), cleared)
    }

    pub fn filled_count_in_row(&self, row: usize) -> usize {
        self.grid.row(row).iter().filter(|cell| !cell.is_empty()).count()
    }

    pub fn total_filled_cells(&self) -> usize {
        self.grid
            .iter_rows()
            .flatten()
            .filter(|cell| !cell.is_empty())
            .count()
    }
}

/// Score for clearing `rows` rows at once: 2^(rows-1), or 0 for no rows.
pub fn line_clear_score(rows: usize) -> u32 {
    match rows {
        0 => 0,
        n => 1 << (n - 1),
    }
}
