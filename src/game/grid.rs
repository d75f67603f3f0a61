use crate::error::GameError;
use crate::game::Color;

/// Rectangular matrix of cells. Never jagged, never zero-sized.
#[derive(Clone, PartialEq, Eq, Debug, Hash)]
pub struct Grid {
    cells: Vec<Vec<Color>>,
}

impl Grid {
    /// Creates a grid of `rows` x `cols` empty cells.
    ///
    /// # Panics
    ///
    /// Panics if either dimension is zero.
    pub fn empty(rows: usize, cols: usize) -> Self {
        assert!(rows > 0 && cols > 0, "grid dimensions must be positive");
        Self {
            cells: vec![vec![Color::Empty; cols]; rows],
        }
    }

    /// Builds a grid from a 0/1 template: 1 becomes `color`, 0 stays empty.
    pub fn from_template(template: &[&[u8]], color: Color) -> Self {
        let cells = template
            .iter()
            .map(|row| {
                row.iter()
                    .map(|&cell| if cell != 0 { color } else { Color::Empty })
                    .collect()
            })
            .collect();
        Self { cells }
    }

    /// Wraps an existing matrix, rejecting jagged or empty input.
    pub fn from_rows(cells: Vec<Vec<Color>>) -> Result<Self, GameError> {
        let cols = match cells.first() {
            Some(first) if !first.is_empty() => first.len(),
            _ => return Err(GameError::EmptyGrid),
        };
        if cells.iter().any(|row| row.len() != cols) {
            return Err(GameError::JaggedGrid);
        }
        Ok(Self { cells })
    }

    pub fn rows(&self) -> usize {
        self.cells.len()
    }

    pub fn cols(&self) -> usize {
        self.cells[0].len()
    }

    pub fn get(&self, row: usize, col: usize) -> Color {
        self.cells[row][col]
    }

    pub fn set(&mut self, row: usize, col: usize, color: Color) {
        self.cells[row][col] = color;
    }

    pub fn row(&self, row: usize) -> &[Color] {
        &self.cells[row]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[Color]> {
        self.cells.iter().map(Vec::as_slice)
    }

    /// Returns the grid turned 90 degrees clockwise.
    ///
    /// Result cell `(r, c)` is source cell `(rows - 1 - c, r)`.
    pub fn rotated(&self) -> Grid {
        let (rows, cols) = (self.rows(), self.cols());
        let cells = (0..cols)
            .map(|r| (0..rows).map(|c| self.cells[rows - 1 - c][r]).collect())
            .collect();
        Grid { cells }
    }

    pub fn rotate(&mut self) {
        *self = self.rotated();
    }

    /// Drops every row matching `remove` and pads the top with empty rows,
    /// keeping the dimensions. Returns how many rows were dropped.
    pub(crate) fn retain_rows(&mut self, remove: impl Fn(&[Color]) -> bool) -> usize {
        let cols = self.cols();
        let before = self.cells.len();
        self.cells.retain(|row| !remove(row.as_slice()));
        let removed = before - self.cells.len();
        for _ in 0..removed {
            self.cells.insert(0, vec![Color::Empty; cols]);
        }
        removed
    }
}
