//! Search algorithms, move ordering and the transposition table.

pub mod context;
pub mod control;
pub mod danger;
pub mod deepening;
pub mod heuristics;
pub mod lmr;
pub mod negamax;
pub mod ordering;
pub mod qsearch;
pub mod root;
pub mod see;
pub mod tt;

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use kestrel_core::{Move, Position};
use tracing::debug;

use crate::config::SearchConfig;
use crate::time::{GoParams, TimeBudget};
use context::{SearchContext, SearchScratch};
use control::SearchControl;
use deepening::{format_info, iterate, nodes_per_second};
use tt::TranspositionTable;

/// Result of a completed search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    /// Best move of the deepest completed iteration; `None` only when the
    /// root has no legal move.
    pub best_move: Option<Move>,
    /// Second move of the PV, the expected reply (for pondering).
    pub ponder_move: Option<Move>,
    /// Score in centipawns from the side to move's point of view.
    pub score: i32,
    /// Depth of the iteration this result comes from.
    pub depth: i32,
    /// Nodes visited by the whole search.
    pub nodes: u64,
    pub elapsed: Duration,
    pub nps: u64,
    /// Principal variation, always legal from the root.
    pub pv: Vec<Move>,
}

/// Iterative-deepening searcher owning the configuration, the transposition
/// table and the search scratch.
///
/// The scratch (move buffers, PV table, heuristics, key stack) is allocated
/// once and reset at the start of every search.
pub struct Searcher {
    config: SearchConfig,
    tt: TranspositionTable,
    /// `None` only while a search holds it.
    scratch: Option<SearchScratch>,
}

impl Searcher {
    /// Create a searcher with a table of `config.tt_size_mb` megabytes.
    pub fn new(config: SearchConfig) -> Self {
        let tt = TranspositionTable::new(config.tt_size_mb);
        Self {
            config,
            tt,
            scratch: Some(SearchScratch::new()),
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Clear the transposition table (preserving the allocation).
    pub fn clear_tt(&self) {
        self.tt.clear();
    }

    /// Resize the transposition table to `mb` megabytes, discarding its contents.
    pub fn resize_tt(&mut self, mb: usize) {
        self.config.tt_size_mb = mb;
        self.tt.resize(mb);
    }

    /// Set the contempt value in centipawns; 0 turns contempt off.
    pub fn set_contempt(&mut self, cp: i32) {
        self.config = self.config.clone().contempt_cp(cp);
    }

    /// Search `position` under the limits of `go`.
    ///
    /// `cancel` is polled throughout; once set, the search unwinds and the
    /// deepest completed iteration is returned. `info` receives one UCI
    /// `info` line per completed depth plus a diagnostic `info string` line.
    /// The position is restored before returning.
    pub fn find_best_move(
        &mut self,
        position: &mut Position,
        cancel: Arc<AtomicBool>,
        go: &GoParams,
        info: &mut dyn FnMut(&str),
    ) -> SearchResult {
        let budget = TimeBudget::from_go(go, position.side_to_move(), &self.config);
        let control = SearchControl::new(cancel, budget, go.nodes);
        self.tt.new_search();
        self.tt.reset_counters();

        let tt = self.config.use_tt.then_some(&self.tt);
        let scratch = self.scratch.take().unwrap_or_default();
        let mut ctx = SearchContext::with_scratch(&self.config, tt, &control, position, scratch);

        debug!(
            budget_ms = ?budget.limit.map(|d| d.as_millis()),
            nodes = ?go.nodes,
            depth = ?go.max_depth(),
            "search started"
        );

        let result = match go.max_depth() {
            Some(0) => static_eval_only(position, &ctx, info),
            Some(depth) => iterate(position, &mut ctx, depth.min(i32::MAX as u32) as i32, info),
            None => iterate(position, &mut ctx, i32::MAX, info),
        };
        self.scratch = Some(ctx.into_scratch());

        debug!(
            depth = result.depth,
            score = result.score,
            nodes = result.nodes,
            elapsed_ms = result.elapsed.as_millis() as u64,
            "search finished"
        );
        result
    }
}

/// `go depth 0`: the static evaluation with the first legal move.
fn static_eval_only(
    position: &Position,
    ctx: &SearchContext<'_>,
    info: &mut dyn FnMut(&str),
) -> SearchResult {
    let mut moves = Vec::new();
    position.legal_moves(&mut moves, true);
    let score = match moves.first() {
        Some(_) => ctx.static_eval(position),
        None if position.in_check() => -negamax::MATE_SCORE,
        None => 0,
    };
    let elapsed = ctx.control.elapsed();
    let result = SearchResult {
        best_move: moves.first().copied(),
        ponder_move: None,
        score,
        depth: 0,
        nodes: 0,
        elapsed,
        nps: nodes_per_second(0, elapsed),
        pv: Vec::new(),
    };
    info(&format_info(&result));
    result
}

impl std::fmt::Debug for Searcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Searcher")
            .field("config", &self.config)
            .field("tt_capacity", &self.tt.capacity())
            .finish()
    }
}

impl Default for Searcher {
    fn default() -> Self {
        Self::new(SearchConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::Ordering;

    use super::negamax::{MATE_SCORE, MATE_THRESHOLD};

    fn search_depth(searcher: &mut Searcher, pos: &mut Position, depth: u32) -> SearchResult {
        let go = GoParams {
            depth: Some(depth),
            ..Default::default()
        };
        searcher.find_best_move(pos, Arc::new(AtomicBool::new(false)), &go, &mut |_| {})
    }

    fn fen(fen: &str) -> Position {
        Position::from_fen(fen).unwrap()
    }

    fn best_uci(result: &SearchResult) -> String {
        result.best_move.map(|m| m.to_string()).unwrap_or_default()
    }

    #[test]
    fn depth_1_returns_legal_move() {
        let mut pos = Position::startpos();
        let mut searcher = Searcher::default();
        let result = search_depth(&mut searcher, &mut pos, 1);
        let mv = result.best_move.expect("a move at depth 1");
        assert!(pos.is_legal(mv));
    }

    #[test]
    fn finds_mate_in_one() {
        let mut pos = fen("r1bqkb1r/pppp1ppp/2n2n2/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR w KQkq - 4 4");
        let mut searcher = Searcher::default();
        let result = search_depth(&mut searcher, &mut pos, 4);
        assert_eq!(best_uci(&result), "h5f7");
        assert_eq!(result.score, MATE_SCORE - 1);
    }

    #[test]
    fn stalemate_scores_zero_without_a_move() {
        let mut pos = fen("k7/2K5/1Q6/8/8/8/8/8 b - - 0 1");
        let mut searcher = Searcher::default();
        let result = search_depth(&mut searcher, &mut pos, 3);
        assert_eq!(result.score, 0);
        assert!(result.best_move.is_none());
    }

    #[test]
    fn mated_root_is_deeply_negative() {
        let mut pos = fen("7k/6Q1/5K2/8/8/8/8/8 b - - 0 1");
        let mut searcher = Searcher::default();
        let result = search_depth(&mut searcher, &mut pos, 3);
        assert!(result.score < -MATE_THRESHOLD);
        assert!(result.best_move.is_none());
    }

    #[test]
    fn reused_searcher_matches_a_fresh_one() {
        let config = SearchConfig::default().use_tt(false);
        let mut reused = Searcher::new(config.clone());
        search_depth(&mut reused, &mut fen("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1"), 4);

        let target = "r1bqkbnr/pppp1ppp/2n5/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R b KQkq - 3 3";
        let again = search_depth(&mut reused, &mut fen(target), 4);
        let fresh = search_depth(&mut Searcher::new(config), &mut fen(target), 4);
        assert_eq!(again.best_move, fresh.best_move);
        assert_eq!(again.score, fresh.score);
        assert_eq!(again.pv, fresh.pv);
        assert_eq!(again.nodes, fresh.nodes);
    }

    #[test]
    fn reports_every_depth() {
        let mut pos = Position::startpos();
        let mut searcher = Searcher::default();
        let go = GoParams {
            depth: Some(4),
            ..Default::default()
        };
        let mut depths = Vec::new();
        searcher.find_best_move(&mut pos, Arc::new(AtomicBool::new(false)), &go, &mut |line| {
            if let Some(rest) = line.strip_prefix("info depth ") {
                depths.push(rest.split(' ').next().unwrap().parse::<i32>().unwrap());
            }
        });
        assert_eq!(depths, vec![1, 2, 3, 4]);
    }

    #[test]
    fn diagnostics_follow_each_depth() {
        let mut pos = Position::startpos();
        let mut searcher = Searcher::default();
        let go = GoParams {
            depth: Some(2),
            ..Default::default()
        };
        let mut lines = Vec::new();
        searcher.find_best_move(&mut pos, Arc::new(AtomicBool::new(false)), &go, &mut |line| {
            lines.push(line.to_string())
        });
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("info string qnodes"));
        assert!(lines[1].contains("tt probes"));
    }

    #[test]
    fn pv_starts_with_best_move() {
        let mut pos = Position::startpos();
        let mut searcher = Searcher::default();
        let result = search_depth(&mut searcher, &mut pos, 4);
        assert_eq!(result.pv.first().copied(), result.best_move);
        assert_eq!(result.ponder_move, result.pv.get(1).copied());
    }

    #[test]
    fn position_is_restored() {
        let mut pos = fen("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1");
        let key = pos.zobrist_key();
        let history = pos.history_keys().len();
        let mut searcher = Searcher::default();
        search_depth(&mut searcher, &mut pos, 4);
        assert_eq!(pos.zobrist_key(), key);
        assert_eq!(pos.history_keys().len(), history);
    }

    #[test]
    fn preset_stop_flag_falls_back_to_first_legal_move() {
        let mut pos = Position::startpos();
        let mut searcher = Searcher::default();
        let stop = Arc::new(AtomicBool::new(true));
        let result = searcher.find_best_move(&mut pos, stop, &GoParams::default(), &mut |_| {});
        assert_eq!(result.depth, 0);
        assert_eq!(result.score, 0);
        assert!(result.best_move.is_some_and(|mv| pos.is_legal(mv)));
    }

    #[test]
    fn stop_during_search_keeps_completed_depth() {
        let mut pos = Position::startpos();
        let mut searcher = Searcher::default();
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let go = GoParams {
            infinite: true,
            ..Default::default()
        };
        let result = searcher.find_best_move(&mut pos, stop, &go, &mut |line| {
            if line.starts_with("info depth 2 ") {
                flag.store(true, Ordering::Relaxed);
            }
        });
        assert_eq!(result.depth, 2);
        assert!(result.best_move.is_some());
    }

    #[test]
    fn node_limit_stops_search() {
        let mut pos = Position::startpos();
        let mut searcher = Searcher::default();
        let go = GoParams {
            nodes: Some(2_000),
            ..Default::default()
        };
        let result = searcher.find_best_move(&mut pos, Arc::new(AtomicBool::new(false)), &go, &mut |_| {});
        assert!(result.best_move.is_some());
        // The limit is checked on node entry, so the overshoot is at most one node.
        assert!(result.nodes <= 2_001, "searched {} nodes", result.nodes);
    }

    #[test]
    fn depth_zero_is_static_eval() {
        let mut pos = Position::startpos();
        let mut searcher = Searcher::default();
        let result = search_depth(&mut searcher, &mut pos, 0);
        assert_eq!(result.depth, 0);
        assert_eq!(result.nodes, 0);
        assert_eq!(result.score, crate::eval::evaluate(&pos));
        assert!(result.best_move.is_some());
    }

    #[test]
    fn mate_limit_bounds_depth() {
        let mut pos = Position::startpos();
        let mut searcher = Searcher::default();
        let go = GoParams {
            mate: Some(1),
            ..Default::default()
        };
        let result = searcher.find_best_move(&mut pos, Arc::new(AtomicBool::new(false)), &go, &mut |_| {});
        assert!(result.depth <= 2);
    }

    #[test]
    fn warm_table_keeps_results_legal() {
        let mut pos = Position::startpos();
        let mut searcher = Searcher::default();
        let first = search_depth(&mut searcher, &mut pos, 4);
        let second = search_depth(&mut searcher, &mut pos, 4);
        for result in [first, second] {
            let mv = result.best_move.expect("startpos has moves");
            assert!(pos.is_legal(mv));
        }
    }

    #[test]
    fn contempt_and_resize_do_not_disturb_search() {
        let mut pos = Position::startpos();
        let mut searcher = Searcher::default();
        searcher.set_contempt(0);
        assert!(!searcher.config().use_contempt);
        searcher.resize_tt(1);
        searcher.clear_tt();
        let result = search_depth(&mut searcher, &mut pos, 3);
        assert!(result.best_move.is_some());
    }
}
