//! Error types for the bot

use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("field has {got} cells, expected {expected}")]
    InvalidFieldLength { expected: usize, got: usize },

    #[error("macroboard has {got} entries, expected {expected}")]
    InvalidMacroboardLength { expected: usize, got: usize },

    #[error("invalid cell value {value} at position {position} (must be 0, 1 or 2)")]
    InvalidCellValue { position: usize, value: i64 },

    #[error("position ({meta_index}, {board_index}) is out of bounds (must be 0-8)")]
    InvalidPosition { meta_index: usize, board_index: usize },

    #[error("global coordinates ({x}, {y}) are outside the 9x9 grid")]
    InvalidCoordinates { x: usize, y: usize },

    #[error("cell {board_index} of sub-board {meta_index} is already occupied")]
    CellOccupied { meta_index: usize, board_index: usize },

    #[error("move ({meta_index}, {board_index}) is not allowed in this position")]
    IllegalMove { meta_index: usize, board_index: usize },

    #[error("no legal moves available")]
    NoLegalMoves,

    #[error("jitter {jitter} is outside [0, {max})")]
    InvalidJitter { jitter: f64, max: f64 },

    #[error("invalid bot id {0} (expected 1 or 2)")]
    InvalidBotId(i64),

    #[error("setting '{0}' has not been received")]
    MissingSetting(&'static str),

    #[error("command '{command}' is missing its {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    #[error("failed to parse '{input}' as {expected}: {source}")]
    ParseInt {
        input: String,
        expected: &'static str,
        #[source]
        source: std::num::ParseIntError,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
