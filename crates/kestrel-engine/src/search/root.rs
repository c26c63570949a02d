//! One fixed-depth search of the root position.

use kestrel_core::{Move, Position};
use tracing::warn;

use crate::search::context::SearchContext;
use crate::search::negamax::{INF, MATE_SCORE, NodeKind, contempt_draw_score, negamax, pvs};
use crate::search::ordering::{MoveList, demote_reversal, partition_captures, sanitize, score_quiets};
use crate::search::tt::Bound;

/// Result of one completed root iteration.
#[derive(Debug, Clone)]
pub(super) struct RootOutcome {
    pub best_move: Option<Move>,
    pub score: i32,
    pub pv: Vec<Move>,
}

/// Search the root to `depth` inside `(alpha, beta)`. `None` when aborted.
pub(super) fn search_root(
    pos: &mut Position,
    ctx: &mut SearchContext<'_>,
    depth: i32,
    alpha: i32,
    beta: i32,
) -> Option<RootOutcome> {
    if ctx.aborted() {
        return None;
    }

    #[cfg(feature = "debug-checks")]
    let start_key = pos.zobrist_key();

    ctx.push_key(0, pos.zobrist_key(), false);
    ctx.pv.clear();
    ctx.nodes += 1;

    let mut list = ctx.take_buffer(0);
    let outcome = root_moves(pos, ctx, &mut list, depth, alpha, beta);
    ctx.return_buffer(0, list);

    #[cfg(feature = "debug-checks")]
    assert_eq!(start_key, pos.zobrist_key(), "root position mutated across search");

    outcome
}

fn root_moves(
    pos: &mut Position,
    ctx: &mut SearchContext<'_>,
    list: &mut MoveList,
    depth: i32,
    mut alpha: i32,
    beta: i32,
) -> Option<RootOutcome> {
    let config = ctx.config;
    let key = pos.zobrist_key();
    let alpha_orig = alpha;

    list.generate_all(pos);
    if list.is_empty() {
        let score = if pos.in_check() { -MATE_SCORE } else { 0 };
        return Some(RootOutcome {
            best_move: None,
            score,
            pv: Vec::new(),
        });
    }

    // Captures by MVV-LVA, quiets by history and killers
    let capture_count = partition_captures(pos, list);
    let prev = ctx.prev_move(0);
    score_quiets(pos, list, capture_count, &ctx.heuristics, 0, prev, config);

    let stand_pat = ctx.static_eval(pos);
    if config.root_anti_repetition {
        let doing_well = if config.use_contempt && config.dynamic_contempt {
            stand_pat > config.contempt_eval_margin
        } else {
            true
        };
        if doing_well {
            demote_reversal(pos, list, capture_count, prev);
        }
    }

    if let Some(mv) = ctx.tt.and_then(|tt| tt.peek_move(key)) {
        list.move_to_front(mv);
    }

    let side = pos.side_to_move();
    let mut best_score = -INF;
    let mut best_move = None;

    for i in 0..list.len() {
        if ctx.aborted() {
            return None;
        }
        let mv = list.moves[i];
        let undo = pos.play_move(mv);
        #[cfg(feature = "debug-checks")]
        crate::search::negamax::assert_mover_not_in_check(pos, mv);
        ctx.set_prev_move(1, Some(mv));

        let repetitions = if config.use_repetition_draw {
            ctx.child_repetitions(0, pos.zobrist_key())
        } else {
            0
        };
        let score = match repetitions {
            0 if i == 0 => negamax(pos, ctx, depth - 1, 1, -beta, -alpha, NodeKind::Pv).map(|s| -s),
            0 => pvs(pos, ctx, depth - 1, 0, alpha, beta, NodeKind::Pv),
            1 => Some(contempt_draw_score(config, stand_pat, side == ctx.root_side)),
            _ => Some(0),
        };
        pos.undo_move(undo);
        let score = score?;

        if score > best_score {
            best_score = score;
            best_move = Some(mv);
            if repetitions > 0 {
                ctx.pv.set_single(0, mv);
            } else {
                ctx.pv.update(0, mv);
            }
        }
        alpha = alpha.max(best_score);
        if alpha >= beta {
            break;
        }
    }

    let chosen = sanitize(pos, best_move, ctx.tt);
    if chosen != best_move {
        warn!(
            searched = ?best_move.map(|m| m.to_string()),
            chosen = ?chosen.map(|m| m.to_string()),
            "root best move replaced by a legal fallback"
        );
    }

    if let Some(tt) = ctx.tt
        && let Some(mv) = chosen
    {
        let bound = if best_score >= beta {
            Bound::LowerBound
        } else if best_score <= alpha_orig {
            Bound::UpperBound
        } else {
            Bound::Exact
        };
        tt.store(key, Some(mv), depth, best_score, bound, 0);
    }

    let mut pv = legalize_pv(pos, &ctx.pv.line(0));
    if let Some(mv) = chosen
        && pv.first() != Some(&mv)
    {
        pv = vec![mv];
    }

    Some(RootOutcome {
        best_move: chosen,
        score: best_score,
        pv,
    })
}

/// Longest prefix of `line` that can be played from `pos`.
pub(super) fn legalize_pv(pos: &mut Position, line: &[Move]) -> Vec<Move> {
    let mut undos = Vec::with_capacity(line.len());
    let mut legal = Vec::with_capacity(line.len());
    for &mv in line {
        if !pos.is_legal(mv) {
            break;
        }
        undos.push(pos.play_move(mv));
        legal.push(mv);
    }
    while let Some(undo) = undos.pop() {
        pos.undo_move(undo);
    }
    legal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legal_pv_is_kept_whole() {
        let mut pos = Position::startpos();
        let e4 = pos.move_from_uci("e2e4").unwrap();
        let mut after = pos.clone();
        after.apply_uci("e2e4").unwrap();
        let e5 = after.move_from_uci("e7e5").unwrap();

        let key = pos.zobrist_key();
        assert_eq!(legalize_pv(&mut pos, &[e4, e5]), vec![e4, e5]);
        assert_eq!(pos.zobrist_key(), key);
    }

    #[test]
    fn pv_is_cut_at_first_illegal_move() {
        let mut pos = Position::startpos();
        let e4 = pos.move_from_uci("e2e4").unwrap();
        // White to move again is illegal after e2e4.
        let d4 = pos.move_from_uci("d2d4").unwrap();
        assert_eq!(legalize_pv(&mut pos, &[e4, d4]), vec![e4]);
        assert_eq!(legalize_pv(&mut pos, &[d4, d4]), vec![d4]);
    }
}
