use std::time::Duration;

use rand::Rng;
use rand_chacha::ChaCha20Rng;

use crate::config::SearchConfig;
use crate::error::{Error, Result};
use crate::game::{MetaMove, PlayerMarker};
use crate::meta_board::MetaBoard;
use crate::search::Searcher;

pub trait Player {
    fn name(&self) -> &str;

    /// Picks a move for `marker`. The board must be returned unchanged.
    fn get_move(&mut self, board: &mut MetaBoard, marker: PlayerMarker) -> Result<MetaMove>;
}

pub struct RandomPlayer<R = ChaCha20Rng> {
    rng: R,
}

impl<R: Rng> RandomPlayer<R> {
    pub fn new(rng: R) -> Self {
        RandomPlayer { rng }
    }
}

impl<R: Rng> Player for RandomPlayer<R> {
    fn name(&self) -> &str {
        "random"
    }

    fn get_move(&mut self, board: &mut MetaBoard, _marker: PlayerMarker) -> Result<MetaMove> {
        let moves = board.allowed_moves();
        if moves.is_empty() {
            return Err(Error::NoLegalMoves);
        }
        Ok(moves[self.rng.gen_range(0..moves.len())])
    }
}

pub struct SearchPlayer {
    searcher: Searcher,
    depth: u32,
    budget: Duration,
}

impl SearchPlayer {
    pub fn new(config: &SearchConfig) -> Result<Self> {
        Ok(SearchPlayer {
            searcher: Searcher::from_config(config)?,
            depth: config.max_depth,
            budget: Duration::from_millis(config.max_move_time_ms),
        })
    }
}

impl Player for SearchPlayer {
    fn name(&self) -> &str {
        "search"
    }

    fn get_move(&mut self, board: &mut MetaBoard, marker: PlayerMarker) -> Result<MetaMove> {
        let outcome = self
            .searcher
            .best_move(board, marker, self.depth, self.budget)?;
        Ok(outcome.mv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn random_player_picks_legal_moves() {
        let mut player = RandomPlayer::new(ChaCha20Rng::seed_from_u64(9));
        let mut board = MetaBoard::empty();
        board.push(MetaMove { meta_index: 0, board_index: 2 }, PlayerMarker::X);
        for _ in 0..20 {
            let mv = player.get_move(&mut board, PlayerMarker::O).unwrap();
            assert_eq!(mv.meta_index, 2);
            assert!(board.allowed_moves().contains(&mv));
        }
    }

    #[test]
    fn search_player_leaves_board_untouched() {
        let mut config = SearchConfig::seeded(1);
        config.max_depth = 1;
        let mut player = SearchPlayer::new(&config).unwrap();
        let mut board = MetaBoard::empty();
        board.push(MetaMove { meta_index: 4, board_index: 0 }, PlayerMarker::X);
        let before = board.clone();
        let mv = player.get_move(&mut board, PlayerMarker::O).unwrap();
        assert_eq!(board, before);
        assert_eq!(mv.meta_index, 0);
    }
}
