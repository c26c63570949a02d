//! Mutable scratch state of one search: move buffers, PV, key stack,
//! heuristics and diagnostic counters.

use std::fmt;

use kestrel_core::{Color, Move, Position};

use crate::config::SearchConfig;
use crate::eval::evaluate;
use crate::search::control::SearchControl;
use crate::search::heuristics::Heuristics;
use crate::search::negamax::{MAX_PLY, STACK_PLY};
use crate::search::ordering::MoveList;
use crate::search::tt::TranspositionTable;

/// Heuristic counters, reset at search start and on every aspiration retry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub qnodes: u64,
    pub nmp_tried: u64,
    pub nmp_cut: u64,
    pub nmp_verify: u64,
    pub nmp_verify_fail: u64,
    pub lmr_tried: u64,
    pub lmr_reduced: u64,
    pub lmr_researched: u64,
    pub lmr_widened: u64,
    pub iid_tried: u64,
    pub iid_used: u64,
    pub probcut_tried: u64,
    pub probcut_cut: u64,
    pub tt_cutoffs: u64,
}

impl fmt::Display for SearchStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "qnodes {} | nmp tried {} cut {} verify {} fail {} \
             | lmr tried {} reduced {} re-search {} widened {} \
             | iid tried {} used {} | probcut tried {} cut {} | tt cutoffs {}",
            self.qnodes,
            self.nmp_tried,
            self.nmp_cut,
            self.nmp_verify,
            self.nmp_verify_fail,
            self.lmr_tried,
            self.lmr_reduced,
            self.lmr_researched,
            self.lmr_widened,
            self.iid_tried,
            self.iid_used,
            self.probcut_tried,
            self.probcut_cut,
            self.tt_cutoffs,
        )
    }
}

/// Triangular PV table. Row `ply` holds the best line found from `ply` on.
pub struct PvTable {
    moves: Box<[[Option<Move>; MAX_PLY]; MAX_PLY]>,
    len: [usize; MAX_PLY],
}

impl PvTable {
    pub fn new() -> Self {
        Self {
            moves: Box::new([[None; MAX_PLY]; MAX_PLY]),
            len: [0; MAX_PLY],
        }
    }

    pub fn clear(&mut self) {
        self.len = [0; MAX_PLY];
    }

    pub fn clear_ply(&mut self, ply: usize) {
        if ply < MAX_PLY {
            self.len[ply] = 0;
        }
    }

    /// Make `mv` followed by the child line the PV at `ply`.
    pub fn update(&mut self, ply: usize, mv: Move) {
        if ply >= MAX_PLY {
            return;
        }
        self.moves[ply][0] = Some(mv);
        let child = ply + 1;
        if child < MAX_PLY {
            let copy_len = self.len[child].min(MAX_PLY - 1);
            let (top, bottom) = self.moves.split_at_mut(child);
            top[ply][1..1 + copy_len].copy_from_slice(&bottom[0][..copy_len]);
            self.len[ply] = 1 + copy_len;
        } else {
            self.len[ply] = 1;
        }
    }

    /// A one-move PV at `ply`, for moves whose child was never searched.
    pub fn set_single(&mut self, ply: usize, mv: Move) {
        if ply < MAX_PLY {
            self.moves[ply][0] = Some(mv);
            self.len[ply] = 1;
        }
    }

    /// Line stored at `ply`.
    pub fn line(&self, ply: usize) -> Vec<Move> {
        if ply >= MAX_PLY {
            return Vec::new();
        }
        self.moves[ply][..self.len[ply]].iter().flatten().copied().collect()
    }
}

impl Default for PvTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Prior occurrences of `child_key` among same-side positions of the line.
///
/// `keys[i]` is the hash of the position at stack index `i` and
/// `null_flags[i]` marks positions reached by a null move; the child would
/// sit at index `keys.len()`. The scan walks back two plies at a time, stops
/// at a null-move boundary, after `max_scans` steps, or at the second match.
pub fn repetitions(keys: &[u64], null_flags: &[bool], child_key: u64, max_scans: usize) -> usize {
    debug_assert_eq!(keys.len(), null_flags.len());
    let mut matches = 0;
    let mut k = keys.len();
    let mut scanned = 0;
    while k >= 2 && scanned < max_scans {
        // Both moves between index k-2 and k must be real moves.
        if null_flags.get(k).copied().unwrap_or(false) || null_flags[k - 1] {
            break;
        }
        k -= 2;
        scanned += 1;
        if keys[k] == child_key {
            matches += 1;
            if matches >= 2 {
                break;
            }
        }
    }
    matches
}

/// Heap allocations a [`Searcher`](crate::Searcher) keeps between searches.
///
/// Contents are meaningless between searches; [`SearchContext::with_scratch`]
/// resets them before use.
pub struct SearchScratch {
    heuristics: Box<Heuristics>,
    pv: PvTable,
    buffers: Vec<MoveList>,
    keys: Vec<u64>,
    null_flags: Vec<bool>,
}

impl SearchScratch {
    pub fn new() -> Self {
        Self {
            heuristics: Heuristics::new(),
            pv: PvTable::new(),
            buffers: (0..STACK_PLY).map(|_| MoveList::new()).collect(),
            keys: Vec::with_capacity(STACK_PLY),
            null_flags: Vec::with_capacity(STACK_PLY),
        }
    }
}

impl Default for SearchScratch {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything one search mutates, plus borrowed read-only collaborators.
pub struct SearchContext<'a> {
    pub config: &'a SearchConfig,
    pub tt: Option<&'a TranspositionTable>,
    pub control: &'a SearchControl,
    /// Nodes visited by the whole search (all depths and retries).
    pub nodes: u64,
    pub stats: SearchStats,
    pub heuristics: Box<Heuristics>,
    pub pv: PvTable,
    pub root_side: Color,
    buffers: Vec<MoveList>,
    keys: Vec<u64>,
    null_flags: Vec<bool>,
    /// Number of pre-root game positions at the bottom of the key stack.
    base: usize,
    prev_moves: [Option<Move>; STACK_PLY],
}

impl<'a> SearchContext<'a> {
    /// Fresh scratch for a search of `root`, seeding the key stack with the
    /// game history and the root move slot with the game's last move.
    pub fn new(
        config: &'a SearchConfig,
        tt: Option<&'a TranspositionTable>,
        control: &'a SearchControl,
        root: &Position,
    ) -> Self {
        Self::with_scratch(config, tt, control, root, SearchScratch::new())
    }

    /// Like [`Self::new`], but reusing the allocations of an earlier search.
    pub fn with_scratch(
        config: &'a SearchConfig,
        tt: Option<&'a TranspositionTable>,
        control: &'a SearchControl,
        root: &Position,
        scratch: SearchScratch,
    ) -> Self {
        let SearchScratch {
            mut heuristics,
            mut pv,
            buffers,
            mut keys,
            mut null_flags,
        } = scratch;
        heuristics.clear();
        pv.clear();

        let history = root.history_keys();
        keys.clear();
        keys.reserve(history.len() + STACK_PLY);
        keys.extend_from_slice(history);
        let base = keys.len();
        null_flags.clear();
        null_flags.resize(base, false);

        let mut prev_moves = [None; STACK_PLY];
        if config.root_anti_repetition {
            prev_moves[0] = root.last_move();
        }
        Self {
            config,
            tt,
            control,
            nodes: 0,
            stats: SearchStats::default(),
            heuristics,
            pv,
            root_side: root.side_to_move(),
            buffers,
            keys,
            null_flags,
            base,
            prev_moves,
        }
    }

    /// Give the allocations back for the next search.
    pub fn into_scratch(self) -> SearchScratch {
        SearchScratch {
            heuristics: self.heuristics,
            pv: self.pv,
            buffers: self.buffers,
            keys: self.keys,
            null_flags: self.null_flags,
        }
    }

    #[inline]
    pub fn aborted(&self) -> bool {
        self.control.aborted(self.nodes)
    }

    /// Borrow the move buffer of `ply`; give it back with [`Self::return_buffer`].
    pub fn take_buffer(&mut self, ply: usize) -> MoveList {
        std::mem::take(&mut self.buffers[ply.min(STACK_PLY - 1)])
    }

    pub fn return_buffer(&mut self, ply: usize, list: MoveList) {
        self.buffers[ply.min(STACK_PLY - 1)] = list;
    }

    /// Record the key of the node at `ply`, dropping anything deeper.
    pub fn push_key(&mut self, ply: usize, key: u64, via_null: bool) {
        let idx = self.base + ply;
        self.keys.truncate(idx);
        self.null_flags.truncate(idx);
        self.keys.push(key);
        self.null_flags.push(via_null);
    }

    /// Prior occurrences of a child of the node at `ply` with `child_key`.
    pub fn child_repetitions(&self, ply: usize, child_key: u64) -> usize {
        let end = (self.base + ply + 1).min(self.keys.len());
        repetitions(
            &self.keys[..end],
            &self.null_flags[..end],
            child_key,
            self.config.rep_scan_max_plies,
        )
    }

    /// The opponent move that led to the node at `ply`.
    #[inline]
    pub fn prev_move(&self, ply: usize) -> Option<Move> {
        self.prev_moves.get(ply).copied().flatten()
    }

    #[inline]
    pub fn set_prev_move(&mut self, ply: usize, mv: Option<Move>) {
        if let Some(slot) = self.prev_moves.get_mut(ply) {
            *slot = mv;
        }
    }

    /// Static evaluation, memoized in the TT's eval slots when a TT is present.
    pub fn static_eval(&self, pos: &Position) -> i32 {
        let Some(tt) = self.tt else {
            return evaluate(pos);
        };
        let key = pos.zobrist_key();
        if let Some(eval) = tt.probe_static_eval(key) {
            return eval;
        }
        let eval = evaluate(pos);
        tt.store_static_eval(key, eval);
        eval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_same_side_matches() {
        // Line A B A B, child would be A again.
        let keys = [1, 2, 1, 2];
        let flags = [false; 4];
        assert_eq!(repetitions(&keys, &flags, 1, 100), 2);
        assert_eq!(repetitions(&keys, &flags, 2, 100), 0);
    }

    #[test]
    fn single_prior_match() {
        let keys = [7, 1, 2];
        let flags = [false; 3];
        assert_eq!(repetitions(&keys, &flags, 1, 100), 1);
    }

    #[test]
    fn scan_stops_at_null_move_boundary() {
        // Position 2 was reached by a null move; the match at index 0 lies beyond it.
        let keys = [5, 9, 6, 8];
        let flags = [false, false, true, false];
        assert_eq!(repetitions(&keys, &flags, 5, 100), 0);
        let no_null = [false; 4];
        assert_eq!(repetitions(&keys, &no_null, 5, 100), 1);
    }

    #[test]
    fn scan_limit_is_respected() {
        let keys = [1, 0, 2, 0, 3, 0];
        let flags = [false; 6];
        assert_eq!(repetitions(&keys, &flags, 1, 2), 0);
        assert_eq!(repetitions(&keys, &flags, 1, 3), 1);
    }

    #[test]
    fn pv_update_copies_child_line() {
        let pos = Position::startpos();
        let e4 = pos.move_from_uci("e2e4").unwrap();
        let d4 = pos.move_from_uci("d2d4").unwrap();
        let mut pv = PvTable::new();
        pv.set_single(1, d4);
        pv.update(0, e4);
        assert_eq!(pv.line(0), vec![e4, d4]);
        pv.clear_ply(0);
        assert!(pv.line(0).is_empty());
    }

    #[test]
    fn context_seeds_history_and_prev_move() {
        let mut pos = Position::startpos();
        pos.apply_uci("e2e4").unwrap();
        pos.apply_uci("e7e5").unwrap();
        let config = SearchConfig::default();
        let flag = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let control = SearchControl::unbounded(flag);
        let mut ctx = SearchContext::new(&config, None, &control, &pos);
        assert_eq!(ctx.prev_move(0).map(|m| m.to_string()), Some("e7e5".to_string()));
        assert_eq!(ctx.root_side, Color::White);

        // The start position is two plies back: a child equal to it is one prior match.
        let start_key = Position::startpos().zobrist_key();
        ctx.push_key(0, pos.zobrist_key(), false);
        assert_eq!(ctx.child_repetitions(0, start_key), 0);
        ctx.push_key(1, 11, false);
        assert_eq!(ctx.child_repetitions(1, start_key), 1);
    }

    #[test]
    fn reused_scratch_starts_clean() {
        let config = SearchConfig::default();
        let flag = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let control = SearchControl::unbounded(flag);

        let mut first = Position::startpos();
        first.apply_uci("g1f3").unwrap();
        first.apply_uci("g8f6").unwrap();
        first.apply_uci("f3g1").unwrap();
        first.apply_uci("f6g8").unwrap();
        let mut ctx = SearchContext::new(&config, None, &control, &first);
        let e4 = first.move_from_uci("e2e4").unwrap();
        for ply in 0..40 {
            ctx.push_key(ply, 1_000 + ply as u64, ply % 3 == 0);
        }
        ctx.pv.set_single(0, e4);
        ctx.nodes = 99;

        // A fresh game: no history behind the root, so the start key is not a repetition.
        let second = Position::startpos();
        let mut ctx = SearchContext::with_scratch(&config, None, &control, &second, ctx.into_scratch());
        assert_eq!(ctx.nodes, 0);
        assert!(ctx.pv.line(0).is_empty());
        assert_eq!(ctx.prev_move(0), None);
        ctx.push_key(0, second.zobrist_key(), false);
        ctx.push_key(1, 7, false);
        assert_eq!(ctx.child_repetitions(1, 1_000), 0);
        assert_eq!(ctx.child_repetitions(1, second.zobrist_key()), 1);
    }
}
