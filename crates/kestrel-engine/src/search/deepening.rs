//! Iterative deepening with aspiration windows.

use std::time::Duration;

use kestrel_core::Position;
use tracing::{debug, trace};

use crate::search::SearchResult;
use crate::search::context::{SearchContext, SearchStats};
use crate::search::negamax::{INF, MATE_SCORE, MATE_THRESHOLD, MAX_PLY};
use crate::search::root::{RootOutcome, search_root};

/// Search depth 1, 2, 3, ... up to `max_depth` or until aborted.
///
/// Each completed depth is reported through `info` as a UCI `info` line and
/// a diagnostic `info string` line. The result of the deepest completed
/// iteration is returned; when none completed the first legal move is
/// returned with score 0.
pub(super) fn iterate(
    pos: &mut Position,
    ctx: &mut SearchContext<'_>,
    max_depth: i32,
    info: &mut dyn FnMut(&str),
) -> SearchResult {
    let max_depth = max_depth.clamp(1, MAX_PLY as i32 - 1);
    let mut completed: Option<SearchResult> = None;
    let mut prev_score = 0;

    for depth in 1..=max_depth {
        let Some(outcome) = aspiration(pos, ctx, depth, prev_score) else {
            debug!(depth, "search aborted mid-iteration");
            break;
        };
        prev_score = outcome.score;
        ctx.heuristics.decay();

        let result = snapshot(ctx, depth, outcome);
        info(&format_info(&result));
        let tt_line = ctx.tt.map(|tt| {
            let s = tt.stats();
            format!(
                " | tt probes {} hits {} stores {} cutoffs {} fill {}",
                s.probes, s.hits, s.stores, s.cutoffs, s.fill_permille
            )
        });
        info(&format!("info string {}{}", ctx.stats, tt_line.unwrap_or_default()));
        debug!(
            depth,
            score = result.score,
            nodes = result.nodes,
            best = ?result.best_move.map(|m| m.to_string()),
            "depth complete"
        );

        let finished = result.best_move.is_none() || mate_within(result.score, depth);
        completed = Some(result);
        if finished {
            break;
        }
    }

    completed.unwrap_or_else(|| fallback(pos, ctx))
}

/// Root search of one depth, re-searched with a wider window until the
/// score lands inside it.
fn aspiration(
    pos: &mut Position,
    ctx: &mut SearchContext<'_>,
    depth: i32,
    prev_score: i32,
) -> Option<RootOutcome> {
    let step = ctx.config.aspiration_cp;
    let full = !ctx.config.use_aspiration || depth == 1 || prev_score.abs() >= MATE_THRESHOLD;
    let (mut alpha, mut beta) = if full {
        (-INF, INF)
    } else {
        (prev_score - step, prev_score + step)
    };

    loop {
        ctx.stats = SearchStats::default();
        let outcome = search_root(pos, ctx, depth, alpha, beta)?;

        if outcome.score <= alpha && alpha > -INF {
            alpha -= 2 * step;
            // A mate score outside the window is opened fully at once
            if alpha < -INF / 2 || outcome.score <= -MATE_THRESHOLD {
                alpha = -INF;
            }
            trace!(depth, score = outcome.score, alpha, beta, "aspiration fail-low");
        } else if outcome.score >= beta && beta < INF {
            beta += 2 * step;
            if beta > INF / 2 || outcome.score >= MATE_THRESHOLD {
                beta = INF;
            }
            trace!(depth, score = outcome.score, alpha, beta, "aspiration fail-high");
        } else {
            return Some(outcome);
        }
    }
}

/// A mate was found whose distance fits inside the searched depth.
fn mate_within(score: i32, depth: i32) -> bool {
    score.abs() >= MATE_THRESHOLD && MATE_SCORE - score.abs() <= depth
}

fn snapshot(ctx: &SearchContext<'_>, depth: i32, outcome: RootOutcome) -> SearchResult {
    let elapsed = ctx.control.elapsed();
    let ponder_move = outcome.pv.get(1).copied();
    SearchResult {
        best_move: outcome.best_move,
        ponder_move,
        score: outcome.score,
        depth,
        nodes: ctx.nodes,
        elapsed,
        nps: nodes_per_second(ctx.nodes, elapsed),
        pv: outcome.pv,
    }
}

/// First legal move with score 0, used when no iteration completed.
fn fallback(pos: &Position, ctx: &SearchContext<'_>) -> SearchResult {
    let mut moves = Vec::new();
    pos.legal_moves(&mut moves, true);
    let best_move = moves.first().copied();
    let elapsed = ctx.control.elapsed();
    SearchResult {
        best_move,
        ponder_move: None,
        score: 0,
        depth: 0,
        nodes: ctx.nodes,
        elapsed,
        nps: nodes_per_second(ctx.nodes, elapsed),
        pv: best_move.into_iter().collect(),
    }
}

pub(super) fn nodes_per_second(nodes: u64, elapsed: Duration) -> u64 {
    let ms = elapsed.as_millis().max(1);
    (u128::from(nodes) * 1000 / ms) as u64
}

/// UCI score token: `cp <n>` or `mate <moves>`.
pub fn format_score(score: i32) -> String {
    if score >= MATE_THRESHOLD {
        format!("mate {}", (MATE_SCORE - score + 1) / 2)
    } else if score <= -MATE_THRESHOLD {
        format!("mate {}", -((MATE_SCORE + score) / 2))
    } else {
        format!("cp {score}")
    }
}

/// The UCI `info` line for a completed depth.
pub fn format_info(result: &SearchResult) -> String {
    let pv: Vec<String> = result.pv.iter().map(|m| m.to_string()).collect();
    let mut line = format!(
        "info depth {} score {} nodes {} nps {} time {}",
        result.depth,
        format_score(result.score),
        result.nodes,
        result.nps,
        result.elapsed.as_millis()
    );
    if !pv.is_empty() {
        line.push_str(" pv ");
        line.push_str(&pv.join(" "));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mate_scores_render_in_moves() {
        assert_eq!(format_score(MATE_SCORE - 1), "mate 1");
        assert_eq!(format_score(MATE_SCORE - 3), "mate 2");
        assert_eq!(format_score(-(MATE_SCORE - 2)), "mate -1");
        assert_eq!(format_score(-MATE_SCORE), "mate 0");
        assert_eq!(format_score(35), "cp 35");
        assert_eq!(format_score(-120), "cp -120");
    }

    #[test]
    fn mate_stop_rule() {
        assert!(mate_within(MATE_SCORE - 1, 1));
        assert!(!mate_within(MATE_SCORE - 3, 2));
        assert!(mate_within(-(MATE_SCORE - 2), 2));
        assert!(!mate_within(500, 64));
    }

    #[test]
    fn nps_never_divides_by_zero() {
        assert_eq!(nodes_per_second(500, Duration::ZERO), 500_000);
        assert_eq!(nodes_per_second(2_000, Duration::from_secs(2)), 1_000);
    }
}
