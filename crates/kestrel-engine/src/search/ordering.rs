//! Move ordering: MVV-LVA for captures, history/killer/countermove scores for
//! quiets, and the small list surgeries the search performs (TT-move hoisting,
//! root bounce-back demotion, best-move sanitizing).

use kestrel_core::{MAX_MOVES, Move, Piece, Position};

use crate::config::SearchConfig;
use crate::eval::PIECE_VALUE;
use crate::search::heuristics::Heuristics;
use crate::search::see::see;
use crate::search::tt::TranspositionTable;

/// Score of the first killer slot.
const KILLER_0: i32 = 1_000_000;
/// Score of the second killer slot.
const KILLER_1: i32 = 900_000;

/// A reusable move buffer with a parallel score array.
///
/// One lives per ply in the search context; nodes take it out, fill it and
/// hand it back, so steady-state search does not allocate.
#[derive(Debug, Default, Clone)]
pub struct MoveList {
    pub moves: Vec<Move>,
    pub scores: Vec<i32>,
}

impl MoveList {
    pub fn new() -> Self {
        Self {
            moves: Vec::with_capacity(MAX_MOVES),
            scores: Vec::with_capacity(MAX_MOVES),
        }
    }

    /// Regenerate the legal moves of `pos` into this list; scores reset to 0.
    pub fn generate(&mut self, pos: &Position) -> usize {
        self.fill(pos, false)
    }

    /// Like [`Self::generate`], but a hard-drawn position keeps its moves.
    pub fn generate_all(&mut self, pos: &Position) -> usize {
        self.fill(pos, true)
    }

    fn fill(&mut self, pos: &Position, ignore_draw: bool) -> usize {
        let n = pos.legal_moves(&mut self.moves, ignore_draw);
        self.scores.clear();
        self.scores.resize(n, 0);
        n
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    #[inline]
    fn swap(&mut self, a: usize, b: usize) {
        self.moves.swap(a, b);
        self.scores.swap(a, b);
    }

    /// Swap `mv` to index 0. Returns whether it was found.
    pub fn move_to_front(&mut self, mv: Move) -> bool {
        match self.moves.iter().position(|&m| m == mv) {
            Some(idx) => {
                self.swap(0, idx);
                true
            }
            None => false,
        }
    }

    /// Stable insertion sort of `start..end` by descending score.
    fn sort_range(&mut self, start: usize, end: usize) {
        for i in start + 1..end {
            let (mv, score) = (self.moves[i], self.scores[i]);
            let mut j = i;
            while j > start && self.scores[j - 1] < score {
                self.moves[j] = self.moves[j - 1];
                self.scores[j] = self.scores[j - 1];
                j -= 1;
            }
            self.moves[j] = mv;
            self.scores[j] = score;
        }
    }
}

/// Ordering rank of the capturing piece: cheaper attackers first.
fn lva_rank(piece: Piece) -> i32 {
    match piece {
        Piece::Pawn => 1,
        Piece::Knight | Piece::Bishop => 2,
        Piece::Rook => 3,
        Piece::Queen => 4,
        Piece::King => 5,
    }
}

fn promotion_bonus(piece: Piece) -> i32 {
    match piece {
        Piece::Queen => 800,
        Piece::Rook => 500,
        Piece::Bishop => 330,
        Piece::Knight => 320,
        _ => 200,
    }
}

/// Most-valuable-victim / least-valuable-attacker score with a promotion bias.
pub fn mvv_lva(pos: &Position, mv: Move) -> i32 {
    let victim = pos.captured_piece(mv).map_or(0, |p| PIECE_VALUE[p as usize]);
    let mut score = (victim << 8) - (lva_rank(mv.piece()) << 4);
    if let Some(promo) = mv.promotion() {
        score += promotion_bonus(promo);
    }
    score
}

/// Capture or promotion.
#[inline]
pub fn is_tactical(pos: &Position, mv: Move) -> bool {
    mv.is_promotion() || pos.is_capture(mv)
}

/// Most material `mv` can gain: the victim plus any promotion surplus.
pub fn capture_upper_bound(pos: &Position, mv: Move) -> i32 {
    let mut bound = pos.captured_piece(mv).map_or(0, |p| PIECE_VALUE[p as usize]);
    if let Some(promo) = mv.promotion() {
        bound += PIECE_VALUE[promo as usize] - PIECE_VALUE[Piece::Pawn as usize];
    }
    bound
}

/// Move captures and promotions to the front, sorted by MVV-LVA.
///
/// Returns how many tactical moves now lead the list.
pub fn partition_captures(pos: &Position, list: &mut MoveList) -> usize {
    let mut k = 0;
    for i in 0..list.len() {
        let mv = list.moves[i];
        if is_tactical(pos, mv) {
            list.swap(k, i);
            list.scores[k] = mvv_lva(pos, mv);
            k += 1;
        }
    }
    list.sort_range(0, k);
    k
}

/// Quiet move that steps straight back along the opponent's last move.
pub fn is_reversal(mv: Move, prev: Option<Move>) -> bool {
    prev.is_some_and(|p| mv.from() == p.to() && mv.to() == p.from() && !mv.is_promotion())
}

/// Ordering score of one quiet move.
pub fn score_quiet(
    pos: &Position,
    mv: Move,
    heuristics: &Heuristics,
    ply: usize,
    prev: Option<Move>,
    config: &SearchConfig,
) -> i32 {
    let [k0, k1] = heuristics.killers(ply);
    if k0 == Some(mv) {
        return KILLER_0;
    }
    if k1 == Some(mv) {
        return KILLER_1;
    }

    let side = pos.side_to_move();
    let mut score = heuristics.history(side, mv);
    if let Some(p) = prev {
        if heuristics.countermove(p) == Some(mv) {
            score += config.countermove_bonus;
        }
        score += heuristics.cont_history(side, p, mv);
        if is_reversal(mv, prev) {
            score -= config.reversal_penalty;
        }
    }
    score
}

/// Score and sort the quiet segment `start..`.
pub fn score_quiets(
    pos: &Position,
    list: &mut MoveList,
    start: usize,
    heuristics: &Heuristics,
    ply: usize,
    prev: Option<Move>,
    config: &SearchConfig,
) {
    for i in start..list.len() {
        list.scores[i] = score_quiet(pos, list.moves[i], heuristics, ply, prev, config);
    }
    let end = list.len();
    list.sort_range(start, end);
}

/// Swap `mv` to the start of its segment: index 0 for tactical moves,
/// `capture_count` for quiets.
pub fn hoist_to_segment(pos: &Position, list: &mut MoveList, mv: Move, capture_count: usize) {
    if list.len() <= 1 {
        return;
    }
    let Some(idx) = list.moves.iter().position(|&m| m == mv) else {
        return;
    };
    let mut start = if is_tactical(pos, mv) { 0 } else { capture_count };
    if start >= list.len() {
        start = 0;
    }
    if idx != start {
        list.swap(start, idx);
    }
}

/// Push the first quiet reversal of `prev` to the end of the list,
/// keeping the order of everything else.
pub fn demote_reversal(pos: &Position, list: &mut MoveList, capture_count: usize, prev: Option<Move>) {
    if prev.is_none() || list.len() <= capture_count + 1 {
        return;
    }
    let found = (capture_count..list.len())
        .find(|&i| is_reversal(list.moves[i], prev) && !is_tactical(pos, list.moves[i]));
    if let Some(idx) = found {
        let last = list.len() - 1;
        list.moves[idx..=last].rotate_left(1);
        list.scores[idx..=last].rotate_left(1);
    }
}

/// Replace an illegal or missing best move: keep it if legal, else the legal
/// TT hint, else the first legal move. `None` only when no move is legal.
pub fn sanitize(pos: &Position, best: Option<Move>, tt: Option<&TranspositionTable>) -> Option<Move> {
    let mut legal = Vec::with_capacity(MAX_MOVES);
    pos.legal_moves(&mut legal, true);
    if let Some(mv) = best
        && legal.contains(&mv)
    {
        return Some(mv);
    }
    if let Some(hint) = tt.and_then(|t| t.peek_move(pos.zobrist_key()))
        && legal.contains(&hint)
    {
        return Some(hint);
    }
    legal.first().copied()
}

/// Victim value of `mv` if it qualifies as a ProbCut candidate.
///
/// Candidates capture at least `victim_min` worth of material, do not lose
/// material by SEE and never give check. Checking captures are rejected
/// whatever the king-danger state.
pub fn probcut_victim(pos: &Position, mv: Move, victim_min: i32) -> Option<i32> {
    let victim = pos.captured_piece(mv).map_or(0, |p| PIECE_VALUE[p as usize]);
    if victim < victim_min || see(pos, mv) < 0 || pos.gives_check(mv) {
        return None;
    }
    Some(victim)
}
