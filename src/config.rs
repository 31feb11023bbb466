//! Search configuration.

use std::time::Duration;

use crate::error::Result;
use crate::eval::Heuristic;

pub const DEFAULT_MAX_DEPTH: u32 = 8;
pub const DEFAULT_MAX_MOVE_TIME_MS: u64 = 1000;
pub const DEFAULT_JITTER: f64 = 1e-8;

/// Parameters for one engine instance.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    /// Plies searched below the root's one-ply ordering pass.
    pub max_depth: u32,

    /// Upper bound for a single move regardless of the time bank.
    pub max_move_time_ms: u64,

    /// Scale of the tie-breaking term added to heuristic scores.
    /// Set to 0.0 for exact, repeatable evaluation.
    pub jitter: f64,

    /// Seed for the tie-breaking RNG; `None` draws one from the OS.
    pub seed: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_move_time_ms: DEFAULT_MAX_MOVE_TIME_MS,
            jitter: DEFAULT_JITTER,
            seed: None,
        }
    }
}

impl SearchConfig {
    /// Deterministic config for tests and reproducible self-play.
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }

    /// Checks the values a searcher cannot work with.
    pub fn validate(&self) -> Result<()> {
        Heuristic::new(self.jitter)?;
        Ok(())
    }

    /// Time to spend on one move: never more than half the remaining bank,
    /// never more than `max_move_time_ms`.
    pub fn move_budget(&self, time_bank_ms: u64) -> Duration {
        Duration::from_millis(self.max_move_time_ms.min(time_bank_ms / 2))
    }
}
