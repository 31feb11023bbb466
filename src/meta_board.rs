use std::{
    fmt,
    ops::{Deref, DerefMut},
};

use crate::board::SubBoard;
use crate::error::{Error, Result};
use crate::eval::position_score;
use crate::game::{
    global_to_local, single_sector, MetaMove, PlayerMarker, PossibleMoves, Sector, Sectors,
    BOARD_SIZE, BOARD_SIZE_SQUARED, META_SIDE, META_SIZE, WINNING_POSITIONS,
};

/// Protocol value marking a sub-board the next move may go into.
pub const PLAYABLE: i64 = -1;

// #############################
// #                           #
// #         BitBoard          #
// #                           #
// #############################

/// Sub-board winners as one bit per sub-board.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
struct BitBoard {
    x: u16,
    o: u16,
}

impl BitBoard {
    fn set(&mut self, index: usize, player: PlayerMarker) {
        let mask = 1 << index;
        match player {
            PlayerMarker::X => self.x |= mask,
            PlayerMarker::O => self.o |= mask,
        }
    }

    fn get_winner(&self) -> Option<PlayerMarker> {
        for &pos in WINNING_POSITIONS.iter() {
            if self.x & pos == pos {
                return Some(PlayerMarker::X);
            } else if self.o & pos == pos {
                return Some(PlayerMarker::O);
            }
        }
        None
    }
}

// #############################
// #                           #
// #         MetaBoard         #
// #                           #
// #############################

/// The full 9x9 position.
///
/// `forced` is a stack: every [`MetaBoard::push`] records the sub-board the
/// opponent is sent to and [`MetaBoard::pop`] discards it again, so nested
/// push/pop pairs during search always see the right constraint. `None`
/// means free choice.
#[derive(Clone, Debug, PartialEq)]
pub struct MetaBoard {
    boards: [SubBoard; BOARD_SIZE_SQUARED],
    forced: Vec<Option<usize>>,
}

impl MetaBoard {
    pub fn empty() -> Self {
        MetaBoard {
            boards: std::array::from_fn(|_| SubBoard::new()),
            forced: vec![None],
        }
    }

    /// Builds a position from the 81 row-major cell codes of the global grid
    /// and the set of sub-boards the next move may use. A single playable
    /// sub-board forces the move there; anything else is free choice.
    pub fn new(field: &[u8], playable: Sectors) -> Result<Self> {
        if field.len() != META_SIZE {
            return Err(Error::InvalidFieldLength {
                expected: META_SIZE,
                got: field.len(),
            });
        }

        let mut board = MetaBoard::empty();
        for (position, &code) in field.iter().enumerate() {
            let player = match code {
                0 => continue,
                code => PlayerMarker::from_code(code).ok_or(Error::InvalidCellValue {
                    position,
                    value: code as i64,
                })?,
            };
            let (meta_index, board_index) = global_to_local(position % META_SIDE, position / META_SIDE);
            board.boards[meta_index].push(board_index, player);
        }

        board.forced = vec![single_sector(playable).map(Sector::index)];
        Ok(board)
    }

    /// Builds a position from raw protocol values: `field` holds 0, 1 or 2
    /// per cell, `macroboard` holds [`PLAYABLE`] for each sub-board that may
    /// be played next.
    pub fn from_protocol(field: &[i64], macroboard: &[i64]) -> Result<Self> {
        if macroboard.len() != BOARD_SIZE_SQUARED {
            return Err(Error::InvalidMacroboardLength {
                expected: BOARD_SIZE_SQUARED,
                got: macroboard.len(),
            });
        }

        let cells = field
            .iter()
            .enumerate()
            .map(|(position, &value)| match value {
                0..=2 => Ok(value as u8),
                _ => Err(Error::InvalidCellValue { position, value }),
            })
            .collect::<Result<Vec<u8>>>()?;

        let playable = macroboard
            .iter()
            .enumerate()
            .filter(|(_, value)| **value == PLAYABLE)
            .filter_map(|(index, _)| Sector::from_index(index))
            .fold(Sectors::default(), |set, sector| set | sector);

        MetaBoard::new(&cells, playable)
    }

    pub fn sub_board(&self, index: usize) -> &SubBoard {
        &self.boards[index]
    }

    pub fn at(&self, mv: MetaMove) -> Option<PlayerMarker> {
        self.boards[mv.meta_index].at(mv.board_index)
    }

    /// Sub-board on top of the forced stack, `None` for free choice. A
    /// resolved forced sub-board still shows here but no longer restricts
    /// [`MetaBoard::allowed_moves`].
    pub fn forced_board(&self) -> Option<usize> {
        self.forced.last().copied().flatten()
    }

    pub fn move_count(&self) -> usize {
        self.boards.iter().map(SubBoard::count).sum()
    }

    pub fn allowed_moves(&self) -> PossibleMoves {
        let mut moves = PossibleMoves::new();
        match self.forced_board() {
            Some(index) if !self.boards[index].is_resolved() => {
                self.push_free_cells(index, &mut moves);
            }
            _ => {
                for index in 0..BOARD_SIZE_SQUARED {
                    if !self.boards[index].is_resolved() {
                        self.push_free_cells(index, &mut moves);
                    }
                }
            }
        }
        moves
    }

    fn push_free_cells(&self, meta_index: usize, moves: &mut PossibleMoves) {
        let board = &self.boards[meta_index];
        for board_index in 0..BOARD_SIZE_SQUARED {
            if board.is_free(board_index) {
                moves.push(MetaMove { meta_index, board_index });
            }
        }
    }

    pub fn winner(&self) -> Option<PlayerMarker> {
        let mut winners = BitBoard::default();
        for (index, board) in self.boards.iter().enumerate() {
            if let Some(player) = board.winner() {
                winners.set(index, player);
            }
        }
        winners.get_winner()
    }

    pub fn is_done(&self) -> bool {
        self.boards.iter().all(SubBoard::is_resolved)
    }

    pub fn push(&mut self, mv: MetaMove, player: PlayerMarker) {
        debug_assert!(
            mv.meta_index < BOARD_SIZE_SQUARED && mv.board_index < BOARD_SIZE_SQUARED,
            "{} is off the board",
            mv
        );
        self.boards[mv.meta_index].push(mv.board_index, player);
        self.forced.push(Some(mv.board_index));
    }

    pub fn pop(&mut self, mv: MetaMove) {
        self.forced.pop();
        self.boards[mv.meta_index].pop(mv.board_index);
    }

    /// Plays `mv` for the lifetime of the returned guard.
    pub fn play(&mut self, mv: MetaMove, player: PlayerMarker) -> Played<'_> {
        self.push(mv, player);
        Played { board: self, mv }
    }
}

impl Default for MetaBoard {
    fn default() -> Self {
        Self::empty()
    }
}

/// A move applied to a [`MetaBoard`]; dropping it takes the move back.
pub struct Played<'a> {
    board: &'a mut MetaBoard,
    mv: MetaMove,
}

impl Played<'_> {
    pub fn mv(&self) -> MetaMove {
        self.mv
    }
}

impl Deref for Played<'_> {
    type Target = MetaBoard;

    fn deref(&self) -> &MetaBoard {
        self.board
    }
}

impl DerefMut for Played<'_> {
    fn deref_mut(&mut self) -> &mut MetaBoard {
        self.board
    }
}

impl Drop for Played<'_> {
    fn drop(&mut self) {
        self.board.pop(self.mv);
    }
}

// #############################
// #                           #
// #           Display         #
// #                           #
// #############################

impl fmt::Display for MetaBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..META_SIDE {
            if y > 0 && y % BOARD_SIZE == 0 {
                writeln!(f, "------+-------+------")?;
            }
            for x in 0..META_SIDE {
                if x > 0 && x % BOARD_SIZE == 0 {
                    write!(f, "| ")?;
                }
                let (meta_index, board_index) = global_to_local(x, y);
                let symbol = self.boards[meta_index]
                    .at(board_index)
                    .map_or('-', |p| p.to_char());
                write!(f, "{} ", symbol)?;
            }
            writeln!(f)?;
        }
        writeln!(f)?;

        for row in 0..BOARD_SIZE {
            for col in 0..BOARD_SIZE {
                let board = &self.boards[row * BOARD_SIZE + col];
                let symbol = match (board.is_resolved(), board.winner()) {
                    (_, Some(player)) => player.to_char(),
                    (true, None) => '*',
                    (false, None) => '_',
                };
                write!(f, "{} ", symbol)?;
            }
            writeln!(f)?;
        }

        writeln!(f)?;

        for row in 0..BOARD_SIZE {
            for col in 0..BOARD_SIZE {
                let (x, o) = self.boards[row * BOARD_SIZE + col].current_score();
                write!(f, "({:.4}, {:.4}) ", x, o)?;
            }
            writeln!(f)?;
        }
        writeln!(f, "eval: {:.6}", position_score(self).score)?;

        match self.forced_board() {
            Some(index) => writeln!(f, "next: {}", index),
            None => writeln!(f, "next: any"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_with(marks: &[(usize, usize, u8)]) -> [u8; META_SIZE] {
        let mut field = [0; META_SIZE];
        for &(meta_index, board_index, code) in marks {
            field[MetaMove { meta_index, board_index }.field_index()] = code;
        }
        field
    }

    fn mv(meta_index: usize, board_index: usize) -> MetaMove {
        MetaMove { meta_index, board_index }
    }

    #[test]
    fn decodes_field_into_sub_boards() {
        let mut field = [0u8; META_SIZE];
        // global (x=4, y=0): sub-board 1, cell 1
        field[4] = 1;
        // global (x=8, y=8): sub-board 8, cell 8
        field[80] = 2;
        // global (x=3, y=5): sub-board 4, cell 6
        field[5 * 9 + 3] = 1;

        let board = MetaBoard::new(&field, Sectors::full()).unwrap();
        assert_eq!(board.at(mv(1, 1)), Some(PlayerMarker::X));
        assert_eq!(board.at(mv(8, 8)), Some(PlayerMarker::O));
        assert_eq!(board.at(mv(4, 6)), Some(PlayerMarker::X));
        assert_eq!(board.move_count(), 3);
        assert_eq!(board.forced_board(), None);
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(matches!(
            MetaBoard::new(&[0; 80], Sectors::full()),
            Err(Error::InvalidFieldLength { expected: 81, got: 80 })
        ));

        let mut field = [0u8; META_SIZE];
        field[10] = 3;
        assert!(matches!(
            MetaBoard::new(&field, Sectors::full()),
            Err(Error::InvalidCellValue { position: 10, value: 3 })
        ));

        assert!(matches!(
            MetaBoard::from_protocol(&[0; 81], &[-1; 8]),
            Err(Error::InvalidMacroboardLength { expected: 9, got: 8 })
        ));
        let mut raw = [0i64; 81];
        raw[0] = -1;
        assert!(matches!(
            MetaBoard::from_protocol(&raw, &[-1; 9]),
            Err(Error::InvalidCellValue { position: 0, value: -1 })
        ));
    }

    #[test]
    fn forced_board_from_macroboard() {
        let field = [0i64; META_SIZE];
        let mut macroboard = [0i64; 9];
        macroboard[6] = PLAYABLE;
        let board = MetaBoard::from_protocol(&field, &macroboard).unwrap();
        assert_eq!(board.forced_board(), Some(6));

        macroboard[2] = PLAYABLE;
        let board = MetaBoard::from_protocol(&field, &macroboard).unwrap();
        assert_eq!(board.forced_board(), None);

        let board = MetaBoard::from_protocol(&field, &[0; 9]).unwrap();
        assert_eq!(board.forced_board(), None);
    }

    #[test]
    fn free_choice_allows_every_open_cell() {
        let board = MetaBoard::empty();
        assert_eq!(board.allowed_moves().len(), 81);

        // sub-board 0 won by X, one O mark in sub-board 5
        let field = field_with(&[(0, 0, 1), (0, 4, 1), (0, 8, 1), (5, 2, 2)]);
        let board = MetaBoard::new(&field, Sectors::full()).unwrap();
        let moves = board.allowed_moves();
        assert_eq!(moves.len(), 81 - 9 - 1);
        assert!(moves.iter().all(|m| m.meta_index != 0));
        assert!(!moves.contains(&mv(5, 2)));
        assert!(moves.contains(&mv(5, 3)));
    }

    #[test]
    fn forced_board_restricts_moves() {
        let field = field_with(&[(3, 0, 1), (3, 1, 2)]);
        let board = MetaBoard::new(&field, Sector::MiddleLeft.into()).unwrap();
        let moves = board.allowed_moves();
        assert_eq!(moves.len(), 7);
        assert!(moves.iter().all(|m| m.meta_index == 3));
        assert!(!moves.contains(&mv(3, 0)));
        assert!(!moves.contains(&mv(3, 1)));
    }

    #[test]
    fn resolved_forced_board_means_free_choice() {
        let field = field_with(&[(2, 2, 2), (2, 4, 2), (2, 6, 2)]);
        let board = MetaBoard::new(&field, Sector::TopRight.into()).unwrap();
        assert_eq!(board.forced_board(), Some(2));
        assert_eq!(board.allowed_moves().len(), 72);
    }

    #[test]
    fn push_sets_next_board() {
        let mut board = MetaBoard::empty();
        board.push(mv(4, 7), PlayerMarker::X);
        assert_eq!(board.forced_board(), Some(7));
        assert!(board.allowed_moves().iter().all(|m| m.meta_index == 7));
        board.push(mv(7, 4), PlayerMarker::O);
        assert_eq!(board.forced_board(), Some(4));
        board.pop(mv(7, 4));
        assert_eq!(board.forced_board(), Some(7));
        board.pop(mv(4, 7));
        assert_eq!(board, MetaBoard::empty());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "off the board")]
    fn push_off_the_board_panics() {
        let mut board = MetaBoard::empty();
        board.push(mv(0, 12), PlayerMarker::X);
    }

    #[test]
    fn played_guard_undoes_on_drop() {
        let mut board = MetaBoard::empty();
        let before = board.clone();
        {
            let mut played = board.play(mv(0, 0), PlayerMarker::X);
            assert_eq!(played.at(mv(0, 0)), Some(PlayerMarker::X));
            {
                let nested = played.play(mv(0, 1), PlayerMarker::O);
                assert_eq!(nested.move_count(), 2);
            }
            assert_eq!(played.move_count(), 1);
        }
        assert_eq!(board, before);
    }

    #[test]
    fn macro_winner_and_done() {
        // X wins sub-boards 2, 4, 6 (anti-diagonal)
        let field = field_with(&[
            (2, 0, 1), (2, 1, 1), (2, 2, 1),
            (4, 3, 1), (4, 4, 1), (4, 5, 1),
            (6, 0, 1), (6, 3, 1), (6, 6, 1),
        ]);
        let board = MetaBoard::new(&field, Sectors::full()).unwrap();
        assert_eq!(board.winner(), Some(PlayerMarker::X));
        assert!(!board.is_done());

        let board = MetaBoard::empty();
        assert_eq!(board.winner(), None);
        assert!(!board.is_done());
    }

    #[test]
    fn drawn_sub_boards_do_not_win_lines() {
        // sub-boards 0, 1, 2 all drawn
        let draw = [1, 2, 1, 1, 2, 2, 2, 1, 1];
        let mut marks = Vec::new();
        for meta_index in 0..3 {
            for (board_index, &code) in draw.iter().enumerate() {
                marks.push((meta_index, board_index, code));
            }
        }
        let board = MetaBoard::new(&field_with(&marks), Sectors::full()).unwrap();
        assert!(board.sub_board(0).is_resolved());
        assert_eq!(board.winner(), None);
        assert_eq!(board.allowed_moves().len(), 54);
    }

    #[test]
    fn display_renders_grid() {
        let mut board = MetaBoard::empty();
        board.push(mv(0, 0), PlayerMarker::X);
        let text = board.to_string();
        assert!(text.starts_with("X - - | - - - | - - -"));
        assert!(text.contains("next: 0"));
    }

    #[test]
    fn display_shows_scores_and_eval() {
        let mut board = MetaBoard::empty();
        let text = board.to_string();
        // empty sub-board: eight empty lines at 0.125 * 0.125 each
        assert!(text.contains("(0.1250, 0.1250) "));
        assert!(text.contains("eval: 0.000000"));

        board.push(mv(4, 4), PlayerMarker::X);
        let (x, o) = board.sub_board(4).current_score();
        assert!(board
            .to_string()
            .contains(&format!("({:.4}, {:.4})", x, o)));

        // X wins sub-boards 0, 4, 8 along their main diagonals
        let field = field_with(&[
            (0, 0, 1), (0, 4, 1), (0, 8, 1),
            (4, 0, 1), (4, 4, 1), (4, 8, 1),
            (8, 0, 1), (8, 4, 1), (8, 8, 1),
        ]);
        let won = MetaBoard::new(&field, Sectors::full()).unwrap();
        let text = won.to_string();
        assert!(text.contains("(1.0000, 0.0000)"));
        assert!(text.contains("eval: 1.000000"));
    }
}
