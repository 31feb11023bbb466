//! Ultimate tic-tac-toe engine: board model, heuristic evaluation and a
//! time-bounded adversarial search, plus the line protocol used by game hosts.

pub mod arena;
pub mod board;
pub mod config;
pub mod error;
pub mod eval;
pub mod game;
pub mod meta_board;
pub mod player;
pub mod protocol;
pub mod search;

pub use config::SearchConfig;
pub use error::{Error, Result};
pub use eval::{Evaluation, Heuristic};
pub use game::{MetaMove, PlayerMarker, Sector, Sectors};
pub use meta_board::MetaBoard;
pub use search::{SearchOutcome, Searcher};
