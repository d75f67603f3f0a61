use crate::game::{Board, Color, Grid};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum PieceType {
    O,
    I,
    S,
    Z,
    L,
    J,
    T,
}

impl PieceType {
    /// All types, in the order the weighted randomizer walks them.
    pub const ALL: [PieceType; 7] = [
        PieceType::O,
        PieceType::I,
        PieceType::S,
        PieceType::Z,
        PieceType::L,
        PieceType::J,
        PieceType::T,
    ];

    pub fn template(self) -> &'static [&'static [u8]] {
        match self {
            PieceType::O => &[&[1, 1], &[1, 1]],
            PieceType::I => &[&[1, 1, 1, 1]],
            PieceType::S => &[&[0, 1, 1], &[1, 1, 0]],
            PieceType::Z => &[&[1, 1, 0], &[0, 1, 1]],
            PieceType::L => &[&[0, 0, 1], &[1, 1, 1]],
            PieceType::J => &[&[1, 0, 0], &[1, 1, 1]],
            PieceType::T => &[&[1, 1, 1], &[0, 1, 0]],
        }
    }

    pub fn color(self) -> Color {
        match self {
            PieceType::O => Color::Yellow,
            PieceType::I => Color::Cyan,
            PieceType::S => Color::Green,
            PieceType::Z => Color::Red,
            PieceType::L => Color::Orange,
            PieceType::J => Color::Blue,
            PieceType::T => Color::Purple,
        }
    }
}

/// A shape anchored at `(row, col)`, the board position of its top-left cell.
///
/// The anchor is not bounds-checked; use [`Piece::collides`] against a board.
/// `row` may be negative while a piece is partly above the board.
#[derive(Clone, PartialEq, Eq, Debug, Hash)]
pub struct Piece {
    kind: PieceType,
    grid: Grid,
    row: i32,
    col: i32,
}

impl Piece {
    pub fn new(kind: PieceType, row: i32, col: i32) -> Self {
        Self {
            kind,
            grid: Grid::from_template(kind.template(), kind.color()),
            row,
            col,
        }
    }

    pub fn kind(&self) -> PieceType {
        self.kind
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn row(&self) -> i32 {
        self.row
    }

    pub fn col(&self) -> i32 {
        self.col
    }

    pub fn rows(&self) -> usize {
        self.grid.rows()
    }

    pub fn cols(&self) -> usize {
        self.grid.cols()
    }

    /// Board row of the piece's last grid row.
    pub fn bottom_row(&self) -> i32 {
        self.row + self.rows() as i32 - 1
    }

    pub fn moved(&self, row: i32, col: i32) -> Piece {
        Piece {
            row,
            col,
            ..self.clone()
        }
    }

    /// Rotates clockwise, keeping the bottom row on the same board row.
    pub fn rotated(&self) -> Piece {
        let grid = self.grid.rotated();
        let row = self.bottom_row() - grid.rows() as i32 + 1;
        Piece {
            kind: self.kind,
            grid,
            row,
            col: self.col,
        }
    }

    /// Whether this placement is illegal on `board`: out of the column range,
    /// below the floor, or overlapping a filled cell. Cells above row 0 never
    /// collide.
    pub fn collides(&self, board: &Board) -> bool {
        if self.col < 0
            || self.col + self.cols() as i32 > board.cols() as i32
            || self.row + self.rows() as i32 > board.rows() as i32
        {
            return true;
        }

        self.grid.iter_rows().enumerate().any(|(r, cells)| {
            let row = self.row + r as i32;
            row >= 0
                && cells.iter().enumerate().any(|(c, color)| {
                    !color.is_empty()
                        && !board.cell(row as usize, (self.col + c as i32) as usize).is_empty()
                })
        })
    }
}
