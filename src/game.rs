use std::{fmt, ops::Index};

use flagset::{flags, FlagSet};

use crate::error::{Error, Result};

// #############################
// #                           #
// #      Fixed Constants      #
// #                           #
// #############################
pub const BOARD_SIZE: usize = 3;
pub const BOARD_SIZE_SQUARED: usize = BOARD_SIZE * BOARD_SIZE;
pub const META_SIZE: usize = BOARD_SIZE_SQUARED * BOARD_SIZE_SQUARED;
pub const META_SIDE: usize = BOARD_SIZE * BOARD_SIZE;

/// One bit per cell, used on the macro level where each sub-board is a cell.
pub const WINNING_POSITIONS: [u16; 8] = [
    0b111_000_000, 0b000_111_000, 0b000_000_111, // rows
    0b100_100_100, 0b010_010_010, 0b001_001_001, // columns
    0b100_010_001, 0b001_010_100, // diagonals
];

/// The same eight lines as cell index triples.
pub const LINES: [[usize; 3]; 8] = [
    [0, 1, 2], [3, 4, 5], [6, 7, 8],
    [0, 3, 6], [1, 4, 7], [2, 5, 8],
    [0, 4, 8], [2, 4, 6],
];

// #############################
// #                           #
// #       PlayerMarker        #
// #                           #
// #############################

/// A mark on the board. Empty cells are `None` wherever a marker is optional.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum PlayerMarker {
    X,
    O,
}

impl PlayerMarker {
    pub fn to_char(&self) -> char {
        match self {
            PlayerMarker::X => 'X',
            PlayerMarker::O => 'O',
        }
    }

    pub fn to_other(&self) -> Self {
        match self {
            PlayerMarker::X => PlayerMarker::O,
            PlayerMarker::O => PlayerMarker::X,
        }
    }

    /// Two-bit cell code, also the protocol's player id.
    pub fn code(&self) -> u8 {
        match self {
            PlayerMarker::X => 1,
            PlayerMarker::O => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(PlayerMarker::X),
            2 => Some(PlayerMarker::O),
            _ => None,
        }
    }

    /// X maximizes the signed score, O minimizes it.
    pub fn sign(&self) -> f64 {
        match self {
            PlayerMarker::X => 1.,
            PlayerMarker::O => -1.,
        }
    }
}

impl fmt::Display for PlayerMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

// #############################
// #                           #
// #          Sectors          #
// #                           #
// #############################

flags! {
    /// The nine sub-boards of the macro board, row-major.
    pub enum Sector: u16 {
        TopLeft,
        TopCenter,
        TopRight,
        MiddleLeft,
        Center,
        MiddleRight,
        BottomLeft,
        BottomCenter,
        BottomRight,
    }
}

pub type Sectors = FlagSet<Sector>;

impl Sector {
    pub fn index(self) -> usize {
        FlagSet::from(self).bits().trailing_zeros() as usize
    }

    pub fn from_index(index: usize) -> Option<Sector> {
        if index >= BOARD_SIZE_SQUARED {
            return None;
        }
        FlagSet::<Sector>::new_truncated(1 << index).into_iter().next()
    }
}

/// Returns the single sector of `sectors`, or `None` when it holds zero or several.
pub fn single_sector(sectors: Sectors) -> Option<Sector> {
    if sectors.bits().count_ones() == 1 {
        sectors.into_iter().next()
    } else {
        None
    }
}

// #############################
// #                           #
// #         MetaMove          #
// #                           #
// #############################

/// A move as (sub-board, cell) pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct MetaMove {
    pub meta_index: usize,
    pub board_index: usize,
}

impl MetaMove {
    pub fn new(meta_index: usize, board_index: usize) -> Result<Self> {
        if meta_index >= BOARD_SIZE_SQUARED || board_index >= BOARD_SIZE_SQUARED {
            return Err(Error::InvalidPosition { meta_index, board_index });
        }
        Ok(MetaMove { meta_index, board_index })
    }

    /// Global (x, y) on the 9x9 grid, x being the column.
    pub fn to_global(&self) -> (usize, usize) {
        let x = BOARD_SIZE * (self.meta_index % BOARD_SIZE) + self.board_index % BOARD_SIZE;
        let y = BOARD_SIZE * (self.meta_index / BOARD_SIZE) + self.board_index / BOARD_SIZE;
        (x, y)
    }

    pub fn from_global(x: usize, y: usize) -> Result<Self> {
        if x >= META_SIDE || y >= META_SIDE {
            return Err(Error::InvalidCoordinates { x, y });
        }
        let (meta_index, board_index) = global_to_local(x, y);
        Ok(MetaMove { meta_index, board_index })
    }

    /// Position in the row-major 81 cell field.
    pub fn field_index(&self) -> usize {
        let (x, y) = self.to_global();
        y * META_SIDE + x
    }
}

/// Splits global (x, y) into (sub-board, cell). Both must be below 9.
pub(crate) fn global_to_local(x: usize, y: usize) -> (usize, usize) {
    (
        (y / BOARD_SIZE) * BOARD_SIZE + x / BOARD_SIZE,
        (y % BOARD_SIZE) * BOARD_SIZE + x % BOARD_SIZE,
    )
}

impl fmt::Display for MetaMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Move ({}, {})", self.meta_index, self.board_index)
    }
}

// #############################
// #                           #
// #       PossibleMoves       #
// #                           #
// #############################

/// Fixed capacity move list, large enough for every cell of the macro board.
#[derive(Clone)]
pub struct PossibleMoves {
    moves: [MetaMove; META_SIZE],
    index: usize,
}

impl PossibleMoves {
    pub fn new() -> PossibleMoves {
        PossibleMoves {
            moves: [MetaMove::default(); META_SIZE],
            index: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.index
    }

    pub fn is_empty(&self) -> bool {
        self.index == 0
    }

    pub fn push(&mut self, move_: MetaMove) {
        self.moves[self.index] = move_;
        self.index += 1;
    }

    pub fn clear(&mut self) {
        self.index = 0;
    }

    pub fn as_slice(&self) -> &[MetaMove] {
        &self.moves[..self.index]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MetaMove> {
        self.as_slice().iter()
    }

    pub fn contains(&self, move_: &MetaMove) -> bool {
        self.as_slice().contains(move_)
    }
}

impl Default for PossibleMoves {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PossibleMoves {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

impl<'a> IntoIterator for &'a PossibleMoves {
    type Item = &'a MetaMove;
    type IntoIter = std::slice::Iter<'a, MetaMove>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Index<usize> for PossibleMoves {
    type Output = MetaMove;

    fn index(&self, index: usize) -> &Self::Output {
        &self.as_slice()[index]
    }
}
