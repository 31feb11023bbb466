//! Self-play harness.

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::game::{MetaMove, PlayerMarker};
use crate::meta_board::MetaBoard;
use crate::player::Player;

pub struct Game {
    board: MetaBoard,
    player_x: Box<dyn Player>,
    player_o: Box<dyn Player>,
    current_player: PlayerMarker,
}

impl Game {
    pub fn new(player_x: Box<dyn Player>, player_o: Box<dyn Player>) -> Self {
        Game {
            board: MetaBoard::empty(),
            player_x,
            player_o,
            current_player: PlayerMarker::X,
        }
    }

    pub fn board(&self) -> &MetaBoard {
        &self.board
    }

    /// Plays to the end and returns the winner, `None` for a draw.
    ///
    /// A player that answers with an occupied or otherwise illegal cell ends
    /// the game with an error.
    pub fn play(&mut self) -> Result<Option<PlayerMarker>> {
        loop {
            if let Some(winner) = self.board.winner() {
                info!(winner = %winner, moves = self.board.move_count(), "game won");
                return Ok(Some(winner));
            }
            if self.board.allowed_moves().is_empty() {
                info!(moves = self.board.move_count(), "game drawn");
                return Ok(None);
            }

            let marker = self.current_player;
            let player = match marker {
                PlayerMarker::X => &mut self.player_x,
                PlayerMarker::O => &mut self.player_o,
            };
            let chosen = player.get_move(&mut self.board, marker)?;

            if !self.board.allowed_moves().contains(&chosen) {
                let MetaMove { meta_index, board_index } = chosen;
                let occupied = MetaMove::new(meta_index, board_index)
                    .map_or(false, |mv| self.board.at(mv).is_some());
                return Err(if occupied {
                    Error::CellOccupied { meta_index, board_index }
                } else {
                    Error::IllegalMove { meta_index, board_index }
                });
            }

            debug!(player = player.name(), marker = %marker, mv = %chosen, "move played");
            self.board.push(chosen, marker);
            self.current_player = marker.to_other();
        }
    }
}
