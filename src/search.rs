//! Depth-limited, time-bounded adversarial search.
//!
//! Both players share one code path: X maximizes the signed score and O
//! minimizes it, so every comparison is made on `sign * score`. Each node
//! first evaluates all of its moves one ply deep and sorts them, best first
//! for the mover; the sorted list doubles as the leaf result at depth 0 and
//! as the move ordering for deeper search. A single threshold from the
//! parent (its best score so far) cuts a node off as soon as the node's own
//! best passes it.
//!
//! The deadline is checked after every sibling, so an expired search still
//! returns the best move found so far. All board changes go through
//! [`MetaBoard::play`], which takes the move back on every exit path.

use std::time::{Duration, Instant};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use tracing::{debug, trace};

use crate::config::SearchConfig;
use crate::error::{Error, Result};
use crate::eval::{Evaluation, Heuristic};
use crate::game::{MetaMove, PlayerMarker};
use crate::meta_board::MetaBoard;

/// Larger than any score, terminal ones included.
pub const SCORE_BOUND: f64 = 2.;

/// Played on an empty board without searching.
pub const OPENING_MOVE: MetaMove = MetaMove {
    meta_index: 4,
    board_index: 4,
};

#[derive(Clone, Copy, Debug)]
struct Deadline {
    start: Instant,
    budget: Duration,
}

impl Deadline {
    fn new(budget: Duration) -> Self {
        Deadline {
            start: Instant::now(),
            budget,
        }
    }

    fn expired(&self) -> bool {
        self.start.elapsed() > self.budget
    }
}

/// A move with its value, signed from X's point of view.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Scored {
    pub mv: MetaMove,
    pub score: f64,
    pub terminal: bool,
}

impl Scored {
    fn from_eval(mv: MetaMove, eval: Evaluation) -> Self {
        Scored {
            mv,
            score: eval.score,
            terminal: eval.terminal,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SearchOutcome {
    pub mv: MetaMove,
    pub score: f64,
    pub terminal: bool,
    /// Positions evaluated.
    pub nodes: u64,
    pub elapsed: Duration,
    /// Whether the deadline stopped the search early.
    pub timed_out: bool,
}

pub struct Searcher<R = ChaCha20Rng> {
    heuristic: Heuristic,
    rng: R,
    deadline: Deadline,
    nodes: u64,
    timed_out: bool,
}

impl Searcher<ChaCha20Rng> {
    /// # Errors
    ///
    /// [`Error::InvalidJitter`] when `config.jitter` could push a score past
    /// [`SCORE_BOUND`].
    pub fn from_config(config: &SearchConfig) -> Result<Self> {
        let heuristic = Heuristic::new(config.jitter)?;
        let rng = match config.seed {
            Some(seed) => ChaCha20Rng::seed_from_u64(seed),
            None => ChaCha20Rng::from_entropy(),
        };
        Ok(Searcher::new(heuristic, rng))
    }
}

impl<R: Rng> Searcher<R> {
    pub fn new(heuristic: Heuristic, rng: R) -> Self {
        Searcher {
            heuristic,
            rng,
            deadline: Deadline::new(Duration::ZERO),
            nodes: 0,
            timed_out: false,
        }
    }

    pub fn heuristic(&self) -> &Heuristic {
        &self.heuristic
    }

    /// Chooses a move for `player`.
    ///
    /// `depth` counts plies below the one-ply ordering pass, so depth 0 picks
    /// the best move by direct evaluation. The board is left exactly as it
    /// was passed in.
    ///
    /// # Errors
    ///
    /// [`Error::NoLegalMoves`] when the position has no legal move at all,
    /// which only happens once every sub-board is decided.
    pub fn best_move(
        &mut self,
        board: &mut MetaBoard,
        player: PlayerMarker,
        depth: u32,
        budget: Duration,
    ) -> Result<SearchOutcome> {
        self.deadline = Deadline::new(budget);
        self.nodes = 0;
        self.timed_out = false;

        if board.move_count() == 0 {
            debug!(mv = %OPENING_MOVE, "empty board, playing the opening move");
            return Ok(self.outcome(Scored {
                mv: OPENING_MOVE,
                score: 0.,
                terminal: false,
            }));
        }

        let candidates = self.candidates(board, player)?;
        let best = if candidates.len() == 1 {
            let (eval, mv) = candidates[0];
            debug!(mv = %mv, "single legal move");
            Scored::from_eval(mv, eval)
        } else {
            let threshold = player.sign() * SCORE_BOUND;
            self.search_candidates(board, player, depth, threshold, candidates)?
        };

        let outcome = self.outcome(best);
        debug!(
            player = %player,
            mv = %outcome.mv,
            score = outcome.score,
            terminal = outcome.terminal,
            nodes = outcome.nodes,
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            timed_out = outcome.timed_out,
            "search finished"
        );
        Ok(outcome)
    }

    fn outcome(&self, best: Scored) -> SearchOutcome {
        SearchOutcome {
            mv: best.mv,
            score: best.score,
            terminal: best.terminal,
            nodes: self.nodes,
            elapsed: self.deadline.start.elapsed(),
            timed_out: self.timed_out,
        }
    }

    fn search(
        &mut self,
        board: &mut MetaBoard,
        player: PlayerMarker,
        depth: u32,
        threshold: f64,
    ) -> Result<Scored> {
        let candidates = self.candidates(board, player)?;
        self.search_candidates(board, player, depth, threshold, candidates)
    }

    /// One-ply evaluation of every legal move, best first for `player`.
    fn candidates(
        &mut self,
        board: &mut MetaBoard,
        player: PlayerMarker,
    ) -> Result<Vec<(Evaluation, MetaMove)>> {
        let moves = board.allowed_moves();
        if moves.is_empty() {
            return Err(Error::NoLegalMoves);
        }

        let mut evals = Vec::with_capacity(moves.len());
        for &mv in &moves {
            let played = board.play(mv, player);
            evals.push((self.heuristic.evaluate(&played, &mut self.rng), mv));
            self.nodes += 1;
        }

        let sign = player.sign();
        evals.sort_by(|(a, _), (b, _)| (sign * b.score).total_cmp(&(sign * a.score)));
        Ok(evals)
    }

    fn search_candidates(
        &mut self,
        board: &mut MetaBoard,
        player: PlayerMarker,
        depth: u32,
        threshold: f64,
        candidates: Vec<(Evaluation, MetaMove)>,
    ) -> Result<Scored> {
        let Some(&(first_eval, first_mv)) = candidates.first() else {
            return Err(Error::NoLegalMoves);
        };
        if depth == 0 {
            return Ok(Scored::from_eval(first_mv, first_eval));
        }

        let sign = player.sign();
        let mut best = Scored {
            mv: first_mv,
            score: -sign * SCORE_BOUND,
            terminal: false,
        };

        for (eval, mv) in candidates {
            let value = if eval.terminal {
                Scored::from_eval(mv, eval)
            } else {
                let mut played = board.play(mv, player);
                let reply = self.search(&mut played, player.to_other(), depth - 1, best.score)?;
                Scored { mv, ..reply }
            };

            if sign * value.score > sign * best.score {
                best = value;
                if sign * best.score > sign * threshold {
                    trace!(depth, score = best.score, threshold, "cutoff");
                    break;
                }
            }

            if self.deadline.expired() {
                self.timed_out = true;
                break;
            }
        }

        Ok(best)
    }
}
