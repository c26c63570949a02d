//! Principal-variation negamax with the selective-search battery.
//!
//! Every search function returns `Option<i32>`: `None` means the search was
//! aborted and the caller must discard whatever it was computing. Moves are
//! always unmade before the sentinel is propagated with `?`.

use kestrel_core::{Move, Piece, Position};

use crate::config::SearchConfig;
use crate::search::context::SearchContext;
use crate::search::danger::{is_zugzwangish, quick_danger};
use crate::search::lmr::{LmrFactors, suggest_reduction};
use crate::search::ordering::{
    MoveList, hoist_to_segment, is_reversal, is_tactical, partition_captures, probcut_victim,
    score_quiets,
};
use crate::search::qsearch::qsearch;
use crate::search::tt::Bound;

/// Score representing an unreachable upper/lower bound.
pub const INF: i32 = 30_000;

/// Base score for checkmate (adjusted by ply for mate distance).
pub const MATE_SCORE: i32 = 29_000;

/// Maximum main-search ply; deeper nodes return their static evaluation.
pub const MAX_PLY: usize = 128;

/// Ply capacity of the per-ply stacks, quiescence included.
pub const STACK_PLY: usize = 256;

/// Scores at or beyond this magnitude encode a forced mate.
pub const MATE_THRESHOLD: i32 = MATE_SCORE - STACK_PLY as i32;

/// Role of a node in the search tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// On the principal variation (open window).
    Pv,
    /// Null-window node.
    NonPv,
    /// The node reached directly by a null move: no second null move, no LMR.
    NullMove,
    /// Re-search of a node whose null move failed high, with null moves disabled.
    Verify,
}

impl NodeKind {
    #[inline]
    pub fn is_pv(self) -> bool {
        self == NodeKind::Pv
    }

    #[inline]
    pub fn in_null(self) -> bool {
        self == NodeKind::NullMove
    }

    #[inline]
    fn allows_null(self) -> bool {
        matches!(self, NodeKind::Pv | NodeKind::NonPv)
    }

    /// Kind of a child searched with the parent's full window (`open`) or a null window.
    /// Only the null-move node itself is in-null; its children are ordinary.
    #[inline]
    fn child(self, open: bool) -> NodeKind {
        match self {
            NodeKind::Pv if open => NodeKind::Pv,
            _ => NodeKind::NonPv,
        }
    }
}

/// Whether a null-move fail-high must be confirmed by a normal search.
///
/// Either trigger is enough: king danger at sufficient depth, or a reduced
/// null-move depth at or below `null_verify_depth`.
pub fn needs_null_verification(
    config: &SearchConfig,
    depth: i32,
    reduced_depth: i32,
    danger: bool,
) -> bool {
    let on_danger = config.nmp_verify_on_danger && depth >= config.nmp_verify_min_depth && danger;
    let shallow = config.null_verify_depth > 0 && reduced_depth <= config.null_verify_depth;
    on_danger || shallow
}

/// Score of a line that repeats the root side's position once.
///
/// Small values are left alone; the sign either follows the evaluation
/// (dynamic: the side that is better avoids the draw) or the side to move
/// relative to the root side.
pub fn contempt_draw_score(config: &SearchConfig, eval: i32, same_side_as_root: bool) -> i32 {
    if !config.use_contempt {
        return 0;
    }
    let magnitude = eval.abs();
    let base = config.contempt_cp;
    let scaled = if magnitude <= 60 {
        0
    } else if magnitude <= 120 {
        base >> 1
    } else {
        base
    };
    let sign = if config.dynamic_contempt {
        if eval > 60 {
            -1
        } else if eval < -60 {
            1
        } else {
            0
        }
    } else if same_side_as_root {
        -1
    } else {
        1
    };
    sign * scaled
}

/// Facts about the current node that the move loop needs.
struct Node {
    depth: i32,
    ply: usize,
    alpha: i32,
    beta: i32,
    alpha_orig: i32,
    kind: NodeKind,
    in_check: bool,
    key: u64,
    stand_pat: i32,
    trusted: Option<Move>,
    tt_hint: Option<Move>,
    danger: bool,
    bounds_safe: bool,
}

/// Negamax alpha-beta search of `pos` at `ply` with `depth` plies left.
pub(super) fn negamax(
    pos: &mut Position,
    ctx: &mut SearchContext<'_>,
    depth: i32,
    ply: usize,
    mut alpha: i32,
    mut beta: i32,
    kind: NodeKind,
) -> Option<i32> {
    if ctx.aborted() {
        return None;
    }

    let key = pos.zobrist_key();
    ctx.push_key(ply, key, kind.in_null());
    ctx.pv.clear_ply(ply);

    if ply >= MAX_PLY {
        return Some(ctx.static_eval(pos));
    }

    let config = ctx.config;
    let alpha_orig = alpha;

    // Stored bounds tighten the window
    if let Some(tt) = ctx.tt
        && config.use_tt_bounds
        && depth >= config.tt_bound_min_depth
        && let Some(hit) = tt.probe(key, depth, ply)
        && hit.usable
    {
        match hit.bound {
            Bound::Exact => {
                ctx.stats.tt_cutoffs += 1;
                tt.record_cutoff();
                return Some(hit.score);
            }
            Bound::LowerBound => alpha = alpha.max(hit.score),
            Bound::UpperBound => beta = beta.min(hit.score),
            Bound::None => {}
        }
        if alpha >= beta {
            ctx.stats.tt_cutoffs += 1;
            tt.record_cutoff();
            return Some(hit.score);
        }
    }

    ctx.nodes += 1;
    if pos.is_hard_draw() {
        return Some(0);
    }

    // Reductions can push depth below zero; all of it is quiescence
    if depth <= 0 {
        return qsearch(pos, ctx, alpha, beta, ply);
    }

    let in_check = pos.in_check();
    let stand_pat = ctx.static_eval(pos);
    let bounds_safe = alpha.abs() < MATE_THRESHOLD && beta.abs() < MATE_THRESHOLD;
    let danger = quick_danger(pos);

    // Reverse futility
    if config.use_reverse_futility
        && !kind.is_pv()
        && depth <= 2
        && !in_check
        && bounds_safe
        && stand_pat - config.reverse_futility_margin * depth >= beta
    {
        return Some(beta);
    }

    // Razoring
    if config.use_razoring
        && !kind.is_pv()
        && !in_check
        && depth <= 2
        && bounds_safe
        && !danger
        && stand_pat + config.razor_margins[(depth - 1) as usize] <= alpha
    {
        let qs = qsearch(pos, ctx, alpha, beta, ply)?;
        if qs <= alpha {
            ctx.pv.clear_ply(ply);
            return Some(qs);
        }
    }

    // Null-move pruning
    if config.use_null_move
        && kind.allows_null()
        && depth >= config.null_min_depth
        && !in_check
        && !(config.disable_null_in_pv && kind.is_pv())
        && !(config.disable_null_in_zugzwangish && is_zugzwangish(pos))
    {
        ctx.stats.nmp_tried += 1;
        if stand_pat >= beta
            && let Some(undo) = pos.play_null_move()
        {
            let r = config.null_base_reduction + i32::from(depth >= 6);
            let reduced = depth - 1 - r;
            ctx.set_prev_move(ply + 1, None);
            let score = negamax(pos, ctx, reduced, ply + 1, -beta, -beta + 1, NodeKind::NullMove);
            pos.undo_null_move(undo);
            let score = -score?;

            if score >= beta {
                if needs_null_verification(config, depth, reduced, danger) {
                    ctx.stats.nmp_verify += 1;
                    let verify = negamax(pos, ctx, depth - 1, ply, beta - 1, beta, NodeKind::Verify)?;
                    ctx.pv.clear_ply(ply);
                    if verify >= beta {
                        ctx.stats.nmp_cut += 1;
                        return Some(beta);
                    }
                    ctx.stats.nmp_verify_fail += 1;
                } else {
                    ctx.stats.nmp_cut += 1;
                    return Some(beta);
                }
            }
        }
    }

    // Decide whether the stored move is trustworthy before ordering
    let mut tt_hint = None;
    let mut trusted = None;
    if let Some(tt) = ctx.tt
        && let Some(hit) = tt.probe(key, 0, ply)
    {
        tt_hint = hit.best_move;
        let deep_enough =
            hit.depth >= depth || (hit.depth >= depth - 1 && hit.bound != Bound::UpperBound);
        if deep_enough {
            trusted = hit.best_move;
        }
    }

    // Internal iterative deepening
    if trusted.is_none()
        && config.use_iid
        && ctx.tt.is_some()
        && depth >= config.iid_min_depth
        && (!config.iid_pv_only || kind.is_pv())
        && !in_check
    {
        ctx.stats.iid_tried += 1;
        let red = config.iid_reduction.min((depth - 1).max(1));
        let iid_kind = if kind.in_null() {
            NodeKind::NullMove
        } else {
            NodeKind::NonPv
        };
        negamax(pos, ctx, depth - red, ply, alpha, alpha + 1, iid_kind)?;
        ctx.pv.clear_ply(ply);

        if let Some(hit) = ctx.tt.and_then(|tt| tt.probe(key, 0, ply)) {
            tt_hint = hit.best_move;
            if hit.depth >= depth - red || hit.bound != Bound::UpperBound {
                trusted = hit.best_move;
                if trusted.is_some() {
                    ctx.stats.iid_used += 1;
                }
            }
        }
    }

    let node = Node {
        depth,
        ply,
        alpha,
        beta,
        alpha_orig,
        kind,
        in_check,
        key,
        stand_pat,
        trusted,
        tt_hint,
        danger,
        bounds_safe,
    };

    let mut list = ctx.take_buffer(ply);
    let result = search_moves(pos, ctx, &mut list, node);
    ctx.return_buffer(ply, list);
    result
}

/// Move generation, ProbCut, the move loop and the TT store.
fn search_moves(
    pos: &mut Position,
    ctx: &mut SearchContext<'_>,
    list: &mut MoveList,
    node: Node,
) -> Option<i32> {
    let config = ctx.config;
    let Node {
        depth,
        ply,
        mut alpha,
        beta,
        alpha_orig,
        kind,
        in_check,
        key,
        stand_pat,
        trusted,
        tt_hint,
        danger,
        bounds_safe,
    } = node;
    let is_pv = kind.is_pv();

    list.generate(pos);
    let capture_count = partition_captures(pos, list);

    // ProbCut: a strong capture that beats beta by a margin at reduced depth
    let pc_depth = depth - 1 - config.probcut_reduction;
    if config.use_probcut
        && !is_pv
        && !in_check
        && !danger
        && depth >= config.probcut_min_depth
        && beta.abs() < MATE_THRESHOLD
        && pc_depth > 0
    {
        ctx.stats.probcut_tried += 1;
        let limit = capture_count.min(config.probcut_max_moves);
        for i in 0..limit {
            let mv = list.moves[i];
            let Some(victim) = probcut_victim(pos, mv, config.probcut_victim_min) else {
                continue;
            };
            let threshold = beta + config.probcut_margin + (victim >> 2);

            let undo = pos.play_move(mv);
            #[cfg(feature = "debug-checks")]
            assert_mover_not_in_check(pos, mv);
            ctx.set_prev_move(ply + 1, Some(mv));
            let score = negamax(
                pos,
                ctx,
                pc_depth,
                ply + 1,
                -threshold,
                -threshold + 1,
                kind.child(false),
            );
            pos.undo_move(undo);
            let score = -score?;

            if score >= threshold {
                ctx.stats.probcut_cut += 1;
                return Some(beta);
            }
        }
    }

    let prev = ctx.prev_move(ply);
    score_quiets(pos, list, capture_count, &ctx.heuristics, ply, prev, config);

    if list.is_empty() {
        ctx.pv.clear_ply(ply);
        return Some(if in_check {
            -(MATE_SCORE - ply as i32)
        } else {
            0
        });
    }

    if let Some(mv) = trusted {
        hoist_to_segment(pos, list, mv, capture_count);
    }

    let side = pos.side_to_move();
    let mut best_score = -INF;
    let mut best_move = None;
    let mut cut = false;
    let mut rep_used = false;

    for i in 0..list.len() {
        let mv = list.moves[i];
        let is_capture = is_tactical(pos, mv);
        let quiet = !is_capture;
        let gives_check = pos.gives_check(mv);
        let history = ctx.heuristics.history(side, mv);

        // Futility: late quiets that cannot lift stand-pat to alpha
        if config.use_futility
            && !is_pv
            && !in_check
            && quiet
            && !gives_check
            && bounds_safe
            && !danger
            && depth <= 3
            && i >= capture_count + 3
            && stand_pat + config.futility_margins[(depth - 1) as usize] <= alpha
        {
            continue;
        }

        // Late-move and history pruning of very late quiets
        if !is_pv
            && !in_check
            && quiet
            && !gives_check
            && !mv.is_castle()
            && mv.piece() != Piece::Pawn
        {
            let quiet_index = i.saturating_sub(capture_count);
            let static_bad = stand_pat + 50 <= alpha;

            if config.use_lmp
                && depth <= config.lmp_max_depth.min(2)
                && static_bad
                && !(config.lmp_block_on_danger && danger)
            {
                let threshold = config.lmp_base_quiets + depth as usize * config.lmp_scale + 2;
                if quiet_index >= threshold {
                    continue;
                }
            }

            if config.use_history_pruning
                && depth <= config.hist_prune_max_depth.min(2)
                && static_bad
                && !danger
                && !ctx.heuristics.is_killer(ply, mv)
                && tt_hint != Some(mv)
                && quiet_index >= config.hist_prune_after.max(8)
            {
                let cont = prev.map_or(0, |p| ctx.heuristics.cont_history(side, p, mv));
                if history <= config.hist_prune_threshold.min(0) && cont <= 0 {
                    continue;
                }
            }
        }

        let mut reduction = 0;
        if config.use_lmr {
            let factors = LmrFactors {
                depth,
                index: i,
                capture_count,
                is_pv,
                in_check,
                in_null: kind.in_null(),
                is_capture,
                gives_check,
                is_killer: ctx.heuristics.is_killer(ply, mv),
                is_tt_move: trusted == Some(mv),
                history,
                bounce_back: quiet && is_reversal(mv, prev),
                recapture: is_capture && prev.is_some_and(|p| p.to() == mv.to()),
            };
            reduction = suggest_reduction(config, &factors);
            ctx.stats.lmr_tried += 1;
            if reduction > 0 {
                ctx.stats.lmr_reduced += 1;
            }
        }

        let undo = pos.play_move(mv);
        #[cfg(feature = "debug-checks")]
        assert_mover_not_in_check(pos, mv);
        ctx.set_prev_move(ply + 1, Some(mv));

        // Threefold on the line: exact draw, child not searched
        if config.use_repetition_draw && ctx.child_repetitions(ply, pos.zobrist_key()) >= 2 {
            pos.undo_move(undo);
            rep_used = true;
            let score = 0;
            if score > best_score {
                best_score = score;
                best_move = Some(mv);
                ctx.pv.set_single(ply, mv);
            }
            alpha = alpha.max(best_score);
            if alpha >= beta {
                cut = true;
                if quiet {
                    ctx.heuristics
                        .on_beta_cutoff(side, ply, depth, mv, prev, config.history_scale);
                }
                break;
            }
            continue;
        }

        let child_depth = depth - 1;
        let score = if i == 0 {
            negamax(pos, ctx, child_depth, ply + 1, -beta, -alpha, kind.child(true)).map(|s| -s)
        } else if reduction > 0 {
            pvs_reduced(pos, ctx, child_depth, reduction, ply, alpha, beta, kind)
        } else {
            pvs(pos, ctx, child_depth, ply, alpha, beta, kind)
        };
        pos.undo_move(undo);
        let score = score?;

        if score > best_score {
            best_score = score;
            best_move = Some(mv);
            ctx.pv.update(ply, mv);
        }
        alpha = alpha.max(best_score);
        if alpha >= beta {
            cut = true;
            if quiet {
                ctx.heuristics
                    .on_beta_cutoff(side, ply, depth, mv, prev, config.history_scale);
            }
            break;
        }
    }

    if let Some(tt) = ctx.tt
        && let Some(mv) = best_move
        && depth >= 1
    {
        let (mut bound, mut score) = if cut {
            (Bound::LowerBound, best_score)
        } else if best_score <= alpha_orig {
            (Bound::UpperBound, best_score)
        } else {
            (Bound::Exact, best_score)
        };
        // Repetition draws depend on the path; never cache them as exact
        if rep_used && bound == Bound::Exact {
            bound = Bound::LowerBound;
            score = best_score;
        }
        let exact_only = config.store_exact_only_at_shallow && depth <= 2;
        if !exact_only || bound == Bound::Exact {
            tt.store(key, Some(mv), depth, score, bound, ply);
        }
    }

    Some(best_score)
}

/// Null-window probe of a later move, widened when it lands inside the window.
/// Expects the move already played; returns the score from the parent's view.
pub(super) fn pvs(
    pos: &mut Position,
    ctx: &mut SearchContext<'_>,
    child_depth: i32,
    ply: usize,
    alpha: i32,
    beta: i32,
    kind: NodeKind,
) -> Option<i32> {
    let mut score = -negamax(pos, ctx, child_depth, ply + 1, -alpha - 1, -alpha, kind.child(false))?;
    if score > alpha && score < beta {
        score = -negamax(pos, ctx, child_depth, ply + 1, -beta, -alpha, kind.child(true))?;
    }
    Some(score)
}

/// Reduced null-window probe, then full depth, then the full window.
#[allow(clippy::too_many_arguments)]
fn pvs_reduced(
    pos: &mut Position,
    ctx: &mut SearchContext<'_>,
    child_depth: i32,
    reduction: i32,
    ply: usize,
    alpha: i32,
    beta: i32,
    kind: NodeKind,
) -> Option<i32> {
    ctx.stats.lmr_researched += 1;
    let mut score = -negamax(
        pos,
        ctx,
        child_depth - reduction,
        ply + 1,
        -alpha - 1,
        -alpha,
        kind.child(false),
    )?;
    if score > alpha {
        score = -negamax(pos, ctx, child_depth, ply + 1, -alpha - 1, -alpha, kind.child(false))?;
        if score > alpha && score < beta {
            ctx.stats.lmr_widened += 1;
            score = -negamax(pos, ctx, child_depth, ply + 1, -beta, -alpha, kind.child(true))?;
        }
    }
    Some(score)
}

/// Legal move generation must never leave the mover in check.
#[cfg(feature = "debug-checks")]
pub(super) fn assert_mover_not_in_check(pos: &Position, mv: Move) {
    let mover = !pos.side_to_move();
    let attackers = pos.attackers_to(pos.king(mover), pos.occupied()) & pos.colors(pos.side_to_move());
    assert!(attackers.is_empty(), "{mv} left the {mover:?} king in check");
}
