//! Positional evaluation.
//!
//! Every open sub-board carries a pair of line potentials, one per player.
//! The macro score multiplies those potentials along the eight macro lines,
//! so a line of sub-boards only counts for a player when all three still
//! leave that player room. Scores are signed from X's point of view and stay
//! well inside `[-1, 1]`; only a decided game reaches the bounds.

use rand::Rng;

use crate::error::{Error, Result};
use crate::game::{PlayerMarker, BOARD_SIZE_SQUARED, LINES};
use crate::meta_board::MetaBoard;

const LINE_MULT: f64 = 0.125;
const EMPTY_LINE: f64 = LINE_MULT * 0.125;
const ONE_MARK: f64 = LINE_MULT * 0.25;
const TWO_MARKS: f64 = LINE_MULT * 0.5;

const MACRO_MULT: f64 = 0.125;

/// Noise draws are `jitter * k` for integer `k` in `[-NOISE_STEPS, NOISE_STEPS)`.
const NOISE_STEPS: i32 = 50;

/// Exclusive upper bound for `jitter`. Keeps every heuristic score strictly
/// inside `(-2, 2)`, which the search relies on for its sentinel bound.
pub const MAX_JITTER: f64 = 0.02;

/// Weight pair (X, O) for every 6-bit line pattern (three 2-bit cells).
pub const LINE_WEIGHTS: [(f64, f64); 64] = line_weights();

const fn line_weights() -> [(f64, f64); 64] {
    let mut values = [(0., 0.); 64];
    values[0] = (EMPTY_LINE, EMPTY_LINE);
    let mut i = 0;
    while i < 3 {
        let one = 1 << (2 * i);
        values[one].0 = ONE_MARK;
        values[one << 1].1 = ONE_MARK;
        let mut j = i + 1;
        while j < 3 {
            let two = one | 1 << (2 * j);
            values[two].0 = TWO_MARKS;
            values[two << 1].1 = TWO_MARKS;
            j += 1;
        }
        i += 1;
    }
    values
}

/// Extracts the 6-bit pattern of `line` from packed cells.
fn line_pattern(cells: u32, [a, b, c]: [usize; 3]) -> usize {
    let at = |pos: usize| ((cells >> (2 * pos)) & 0b11) as usize;
    at(a) | at(b) << 2 | at(c) << 4
}

/// Sums the line weights of an undecided sub-board.
pub fn line_potential(cells: u32) -> (f64, f64) {
    LINES.iter().fold((0., 0.), |(x, o), &line| {
        let (wx, wo) = LINE_WEIGHTS[line_pattern(cells, line)];
        (x + wx, o + wo)
    })
}

/// Score of a decided sub-board.
pub fn resolved_score(winner: Option<PlayerMarker>) -> (f64, f64) {
    match winner {
        Some(PlayerMarker::X) => (1., 0.),
        Some(PlayerMarker::O) => (0., 1.),
        None => (0., 0.),
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Evaluation {
    pub score: f64,
    pub terminal: bool,
}

impl Evaluation {
    pub fn terminal(score: f64) -> Self {
        Evaluation { score, terminal: true }
    }

    pub fn heuristic(score: f64) -> Self {
        Evaluation { score, terminal: false }
    }
}

/// Macro-level evaluator. `jitter` scales a small random term that breaks
/// ties between otherwise equal moves; zero makes evaluation exact.
#[derive(Clone, Copy, Debug)]
pub struct Heuristic {
    jitter: f64,
}

impl Heuristic {
    /// # Errors
    ///
    /// [`Error::InvalidJitter`] unless `0 <= jitter < MAX_JITTER`.
    pub fn new(jitter: f64) -> Result<Self> {
        if !(0.0..MAX_JITTER).contains(&jitter) {
            return Err(Error::InvalidJitter {
                jitter,
                max: MAX_JITTER,
            });
        }
        Ok(Heuristic { jitter })
    }

    pub fn exact() -> Self {
        Heuristic { jitter: 0. }
    }

    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    pub fn evaluate<R: Rng + ?Sized>(&self, board: &MetaBoard, rng: &mut R) -> Evaluation {
        let eval = position_score(board);
        if eval.terminal {
            return eval;
        }
        Evaluation::heuristic(eval.score + self.noise(rng))
    }

    fn noise<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if self.jitter == 0. {
            return 0.;
        }
        self.jitter * rng.gen_range(-NOISE_STEPS..NOISE_STEPS) as f64
    }
}

impl Default for Heuristic {
    fn default() -> Self {
        Heuristic {
            jitter: crate::config::DEFAULT_JITTER,
        }
    }
}

/// Noise-free score of `board`: the game result once decided, otherwise
/// the macro-line sum.
pub fn position_score(board: &MetaBoard) -> Evaluation {
    match board.winner() {
        Some(PlayerMarker::X) => return Evaluation::terminal(1.),
        Some(PlayerMarker::O) => return Evaluation::terminal(-1.),
        None if board.is_done() => return Evaluation::terminal(0.),
        None => {}
    }

    let scores: [(f64, f64); BOARD_SIZE_SQUARED] =
        std::array::from_fn(|i| board.sub_board(i).current_score());

    let lines: f64 = LINES
        .iter()
        .map(|&[a, b, c]| {
            let x = scores[a].0 * scores[b].0 * scores[c].0;
            let o = scores[a].1 * scores[b].1 * scores[c].1;
            MACRO_MULT * (x - o)
        })
        .sum();

    Evaluation::heuristic(lines)
}
