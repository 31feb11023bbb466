use crate::eval::{line_potential, resolved_score};
use crate::game::{PlayerMarker, BOARD_SIZE_SQUARED, LINES};

/// X bits of each line in the 2-bit packed layout; shift the cells right by
/// one to test O against the same masks.
const PACKED_LINES: [u32; 8] = packed_lines();

const FULL: u8 = BOARD_SIZE_SQUARED as u8;

const fn packed_lines() -> [u32; 8] {
    let mut masks = [0; 8];
    let mut i = 0;
    while i < LINES.len() {
        let mut j = 0;
        while j < 3 {
            masks[i] |= 1 << (2 * LINES[i][j]);
            j += 1;
        }
        i += 1;
    }
    masks
}

// #############################
// #                           #
// #         SubBoard          #
// #                           #
// #############################

/// One 3x3 board. Cells are packed two bits each (`0` empty, `1` X, `2` O).
///
/// Derived state (winner, resolved flag, line potential) is recomputed on
/// every [`SubBoard::push`] and the potential is kept on a stack so that
/// [`SubBoard::pop`] can undo a move without recomputing it.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct SubBoard {
    cells: u32,
    resolved: bool,
    winner: Option<PlayerMarker>,
    history: Vec<(f64, f64)>,
    count: u8,
}

impl SubBoard {
    pub fn new() -> Self {
        SubBoard {
            history: Vec::with_capacity(BOARD_SIZE_SQUARED),
            ..Default::default()
        }
    }

    pub fn at(&self, pos: usize) -> Option<PlayerMarker> {
        PlayerMarker::from_code(((self.cells >> (2 * pos)) & 0b11) as u8)
    }

    pub fn is_free(&self, pos: usize) -> bool {
        self.cells & (0b11 << (2 * pos)) == 0
    }

    pub fn cells(&self) -> u32 {
        self.cells
    }

    pub fn count(&self) -> usize {
        self.count as usize
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    pub fn winner(&self) -> Option<PlayerMarker> {
        self.winner
    }

    pub fn history(&self) -> &[(f64, f64)] {
        &self.history
    }

    /// Marks `pos` without touching derived state. Occupied cells and empty
    /// markers are ignored.
    pub fn add(&mut self, pos: usize, player: Option<PlayerMarker>) {
        let Some(player) = player else {
            return;
        };
        if !self.is_free(pos) {
            return;
        }
        self.cells |= (player.code() as u32) << (2 * pos);
        self.count += 1;
    }

    pub fn update_value(&mut self) {
        self.refresh_status();
        let value = self.score_for_cells();
        self.history.push(value);
    }

    pub fn push(&mut self, pos: usize, player: PlayerMarker) {
        self.add(pos, Some(player));
        self.update_value();
    }

    /// Takes back the mark at `pos`. Every pop must match an earlier push.
    pub fn pop(&mut self, pos: usize) {
        debug_assert!(!self.is_free(pos), "pop of empty cell {}", pos);
        if self.is_free(pos) {
            return;
        }
        self.cells &= !(0b11 << (2 * pos));
        self.count -= 1;
        self.history.pop();
        self.refresh_status();
    }

    /// Line potential of the current position as (X, O).
    pub fn current_score(&self) -> (f64, f64) {
        match self.history.last() {
            Some(&value) => value,
            None => self.score_for_cells(),
        }
    }

    pub fn calc_winner(&self) -> Option<PlayerMarker> {
        for &mask in PACKED_LINES.iter() {
            if self.cells & mask == mask {
                return Some(PlayerMarker::X);
            }
            if (self.cells >> 1) & mask == mask {
                return Some(PlayerMarker::O);
            }
        }
        None
    }

    fn refresh_status(&mut self) {
        self.winner = self.calc_winner();
        self.resolved = self.winner.is_some() || self.count == FULL;
    }

    fn score_for_cells(&self) -> (f64, f64) {
        if self.resolved {
            resolved_score(self.winner)
        } else {
            line_potential(self.cells)
        }
    }
}
