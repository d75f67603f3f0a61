/// Content of a single cell: empty, or one of the seven piece colors.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Hash)]
pub enum Color {
    #[default]
    Empty,
    Yellow,
    Cyan,
    Green,
    Red,
    Orange,
    Blue,
    Purple,
}

impl Color {
    pub fn is_empty(self) -> bool {
        self == Color::Empty
    }
}
