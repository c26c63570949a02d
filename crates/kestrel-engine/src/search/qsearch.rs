//! Quiescence search: resolve captures and check evasions before evaluating.

use kestrel_core::{Move, Piece, Position};

use crate::search::context::SearchContext;
use crate::search::negamax::{INF, MATE_SCORE, STACK_PLY};
use crate::search::ordering::{
    MoveList, capture_upper_bound, hoist_to_segment, is_tactical, partition_captures,
};
use crate::search::see::{SEE_VALUE, see};
use crate::search::tt::Bound;

/// Captures worth less than this may be dropped by SEE.
const SEE_PRUNE_CEILING: i32 = SEE_VALUE[Piece::Rook as usize];

/// Quiescence search at `ply`.
///
/// In check every evasion is searched and there is no stand-pat. Otherwise
/// the side to move may stand pat, and only captures and promotions that
/// survive delta and SEE pruning are tried.
pub(super) fn qsearch(
    pos: &mut Position,
    ctx: &mut SearchContext<'_>,
    mut alpha: i32,
    mut beta: i32,
    ply: usize,
) -> Option<i32> {
    if ctx.aborted() {
        return None;
    }
    ctx.nodes += 1;
    ctx.stats.qnodes += 1;

    // Ply ceiling to prevent runaway recursion
    if ply >= STACK_PLY - 1 {
        return Some(ctx.static_eval(pos));
    }

    if pos.is_hard_draw() {
        return Some(0);
    }

    let key = pos.zobrist_key();
    let mut tt_move = None;

    // Any stored bound is deep enough here
    if let Some(hit) = ctx.tt.and_then(|tt| tt.probe(key, 0, ply)) {
        tt_move = hit.best_move;
        match hit.bound {
            Bound::Exact => return Some(hit.score),
            Bound::LowerBound => {
                if hit.score >= beta {
                    return Some(beta);
                }
                alpha = alpha.max(hit.score);
            }
            Bound::UpperBound => {
                if hit.score <= alpha {
                    return Some(alpha);
                }
                beta = beta.min(hit.score);
            }
            Bound::None => {}
        }
        if alpha >= beta {
            return Some(alpha);
        }
    }

    let mut list = ctx.take_buffer(ply);
    let result = if pos.in_check() {
        evasions(pos, ctx, &mut list, alpha, beta, ply, key, tt_move)
    } else {
        captures(pos, ctx, &mut list, alpha, beta, ply, key, tt_move)
    };
    ctx.return_buffer(ply, list);
    result
}

#[allow(clippy::too_many_arguments)]
fn evasions(
    pos: &mut Position,
    ctx: &mut SearchContext<'_>,
    list: &mut MoveList,
    mut alpha: i32,
    beta: i32,
    ply: usize,
    key: u64,
    tt_move: Option<Move>,
) -> Option<i32> {
    let alpha_orig = alpha;
    list.generate(pos);
    if list.is_empty() {
        return Some(-(MATE_SCORE - ply as i32));
    }
    if let Some(mv) = tt_move {
        list.move_to_front(mv);
    }

    let mut best = -INF;
    for i in 0..list.len() {
        let mv = list.moves[i];
        let undo = pos.play_move(mv);
        #[cfg(feature = "debug-checks")]
        crate::search::negamax::assert_mover_not_in_check(pos, mv);
        let score = qsearch(pos, ctx, -beta, -alpha, ply + 1);
        pos.undo_move(undo);
        let score = -score?;

        if score >= beta {
            if let Some(tt) = ctx.tt {
                tt.store(key, Some(mv), 0, score, Bound::LowerBound, ply);
            }
            return Some(score);
        }
        best = best.max(score);
        alpha = alpha.max(score);
    }

    if let Some(tt) = ctx.tt {
        let bound = if best <= alpha_orig {
            Bound::UpperBound
        } else {
            Bound::Exact
        };
        tt.store(key, None, 0, best, bound, ply);
    }
    Some(alpha)
}

#[allow(clippy::too_many_arguments)]
fn captures(
    pos: &mut Position,
    ctx: &mut SearchContext<'_>,
    list: &mut MoveList,
    mut alpha: i32,
    beta: i32,
    ply: usize,
    key: u64,
    tt_move: Option<Move>,
) -> Option<i32> {
    let config = ctx.config;
    let alpha_orig = alpha;

    // Stand-pat: the side to move can choose not to capture
    let stand_pat = ctx.static_eval(pos);
    if stand_pat >= beta {
        if let Some(tt) = ctx.tt {
            tt.store(key, None, 0, stand_pat, Bound::LowerBound, ply);
        }
        return Some(stand_pat);
    }
    alpha = alpha.max(stand_pat);

    list.generate(pos);
    let tactical = partition_captures(pos, list);
    if let Some(mv) = tt_move
        && is_tactical(pos, mv)
    {
        hoist_to_segment(pos, list, mv, tactical);
    }

    for i in 0..tactical {
        let mv = list.moves[i];

        // Skip clearly bad trades unless checking or queening
        if !pos.gives_check(mv) && mv.promotion() != Some(Piece::Queen) {
            let upper = capture_upper_bound(pos, mv);
            if config.qs_delta_pruning && stand_pat + upper + config.delta_margin <= alpha {
                continue;
            }
            if config.qs_see_pruning && upper < SEE_PRUNE_CEILING {
                let gain = see(pos, mv);
                if !mv.is_promotion() && gain < 0 {
                    continue;
                }
                if stand_pat + gain + config.see_margin <= alpha {
                    continue;
                }
            }
        }

        let undo = pos.play_move(mv);
        #[cfg(feature = "debug-checks")]
        crate::search::negamax::assert_mover_not_in_check(pos, mv);
        let score = qsearch(pos, ctx, -beta, -alpha, ply + 1);
        pos.undo_move(undo);
        let score = -score?;

        if score >= beta {
            if let Some(tt) = ctx.tt {
                tt.store(key, Some(mv), 0, score, Bound::LowerBound, ply);
            }
            return Some(score);
        }
        alpha = alpha.max(score);
    }

    if let Some(tt) = ctx.tt {
        let bound = if alpha <= alpha_orig {
            Bound::UpperBound
        } else {
            Bound::Exact
        };
        tt.store(key, None, 0, alpha, bound, ply);
    }
    Some(alpha)
}
