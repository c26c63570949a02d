//! Time management: turn `go` parameters into a per-move search budget.

use std::time::Duration;

use kestrel_core::Color;

use crate::config::SearchConfig;

/// Parameters of a UCI `go` command.
///
/// All fields are optional; a bare `go` searches for the default move time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoParams {
    /// White's remaining time.
    pub wtime: Option<Duration>,
    /// Black's remaining time.
    pub btime: Option<Duration>,
    /// White's increment per move.
    pub winc: Option<Duration>,
    /// Black's increment per move.
    pub binc: Option<Duration>,
    /// Moves until the next time control.
    pub movestogo: Option<u32>,
    /// Search to this depth only.
    pub depth: Option<u32>,
    /// Search for exactly this long.
    pub movetime: Option<Duration>,
    /// Stop after this many nodes.
    pub nodes: Option<u64>,
    /// Look for a mate in this many moves; bounds the depth at `2 * mate`.
    pub mate: Option<u32>,
    /// Search until `stop`.
    pub infinite: bool,
    /// Search in pondering mode.
    pub ponder: bool,
}

impl GoParams {
    /// Deepest iteration this command allows, if any.
    pub fn max_depth(&self) -> Option<u32> {
        match (self.depth, self.mate) {
            (Some(d), Some(m)) => Some(d.min(2 * m)),
            (Some(d), None) => Some(d),
            (None, Some(m)) => Some(2 * m),
            (None, None) => None,
        }
    }
}

/// How long one search may run. `limit == None` means only an external stop ends it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBudget {
    pub limit: Option<Duration>,
}

impl TimeBudget {
    pub const UNBOUNDED: TimeBudget = TimeBudget { limit: None };

    /// Budget for `go` with `side` to move.
    ///
    /// Priority: `infinite`/`ponder`, then `movetime` less the move overhead
    /// (at least 10 ms), then a fixed share of the mover's clock (at least
    /// 1 ms), then the hard cap for depth-limited searches, then the default.
    pub fn from_go(go: &GoParams, side: Color, config: &SearchConfig) -> TimeBudget {
        if go.infinite || go.ponder {
            return TimeBudget::UNBOUNDED;
        }

        if let Some(movetime) = go.movetime {
            let floor = Duration::from_millis(10);
            let limit = movetime.saturating_sub(config.move_overhead).max(floor);
            return TimeBudget { limit: Some(limit) };
        }

        let remaining = match side {
            Color::White => go.wtime,
            Color::Black => go.btime,
        };
        if let Some(remaining) = remaining {
            let share = remaining * config.clock_percent / 100;
            return TimeBudget {
                limit: Some(share.max(Duration::from_millis(1))),
            };
        }

        if go.max_depth().is_some() {
            return TimeBudget {
                limit: Some(config.max_hard_cap),
            };
        }

        TimeBudget {
            limit: Some(config.default_move_time),
        }
    }
}
