//! Late-move reductions: the base table and the gating policy around it.

use std::sync::OnceLock;

use crate::config::SearchConfig;

/// Largest depth and move index covered by the table.
const LMR_DIM: usize = 64;

/// Divisor of the log-log product; lower values reduce harder.
const LMR_SCALE: f64 = 2.70;

static LMR_TABLE: OnceLock<[[i32; LMR_DIM + 1]; LMR_DIM + 1]> = OnceLock::new();

fn lmr_table() -> &'static [[i32; LMR_DIM + 1]; LMR_DIM + 1] {
    LMR_TABLE.get_or_init(|| {
        let mut t = [[0i32; LMR_DIM + 1]; LMR_DIM + 1];
        for (d, row) in t.iter_mut().enumerate().skip(1) {
            for (m, cell) in row.iter_mut().enumerate().skip(1) {
                let r = ((d as f64 + 1.0).ln() * (m as f64 + 1.0).ln() / LMR_SCALE).floor();
                *cell = (r as i32).max(1);
            }
        }
        t
    })
}

/// Table reduction for `depth` and 1-based `move_number`, both clamped to `1..=64`.
pub fn base_reduction(depth: i32, move_number: usize) -> i32 {
    let d = depth.clamp(1, LMR_DIM as i32) as usize;
    let m = move_number.clamp(1, LMR_DIM);
    lmr_table()[d][m]
}

/// Everything the reduction policy looks at for one move.
#[derive(Debug, Clone, Copy, Default)]
pub struct LmrFactors {
    pub depth: i32,
    /// Index in the whole ordered list.
    pub index: usize,
    /// Number of captures at the front of the list.
    pub capture_count: usize,
    pub is_pv: bool,
    pub in_check: bool,
    pub in_null: bool,
    pub is_capture: bool,
    pub gives_check: bool,
    pub is_killer: bool,
    pub is_tt_move: bool,
    pub history: i32,
    /// Quiet move that undoes the opponent's last move.
    pub bounce_back: bool,
    /// Capture landing on the square of the opponent's last capture.
    pub recapture: bool,
}

/// Reduction in plies for a late move; 0 means search at full depth.
pub fn suggest_reduction(config: &SearchConfig, f: &LmrFactors) -> i32 {
    if f.in_check || f.in_null || f.depth < config.lmr_min_depth {
        return 0;
    }
    if f.is_pv && f.index == 0 {
        return 0;
    }

    // Quiets count from the end of the capture block.
    let segment_index = if f.is_capture {
        f.index
    } else {
        f.index.saturating_sub(f.capture_count)
    };
    if segment_index < config.lmr_min_move {
        return 0;
    }

    let mut r = base_reduction(f.depth, segment_index + 1);

    if f.is_capture && config.lmr_reduce_captures {
        r = (r - 1).max(0);
    }
    if f.gives_check && config.lmr_reduce_checks {
        r = (r - 1).max(0);
    }
    if f.history <= config.lmr_history_punish {
        r += 1;
    }
    if f.bounce_back && !f.is_capture {
        r += config.lmr_bounce_bump.max(0);
    }

    let exempt = f.recapture
        || (f.is_capture && !config.lmr_reduce_captures)
        || (f.gives_check && !config.lmr_reduce_checks)
        || (f.is_tt_move && config.lmr_skip_tt_move)
        || (f.is_killer && config.lmr_skip_killers)
        || f.history >= config.lmr_history_skip;
    if exempt {
        return 0;
    }

    if f.depth <= 6 {
        r = r.min(1);
    } else if f.depth <= 8 {
        r = r.min(2);
    }
    if f.is_pv {
        r = r.min(config.lmr_pv_max);
    }
    r.min(config.lmr_max).min(f.depth - 1).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Policy with every optional gate and cap opened up.
    fn ungated() -> SearchConfig {
        SearchConfig {
            lmr_min_depth: 1,
            lmr_min_move: 1,
            lmr_max: 64,
            lmr_history_skip: i32::MAX,
            lmr_history_punish: i32::MIN,
            ..SearchConfig::default()
        }
    }

    fn late_quiet(depth: i32, index: usize) -> LmrFactors {
        LmrFactors {
            depth,
            index,
            ..LmrFactors::default()
        }
    }

    #[test]
    fn table_matches_closed_form() {
        for d in 1..=64 {
            for m in 1..=64usize {
                let expected = ((((d + 1) as f64).ln() * ((m + 1) as f64).ln()) / 2.70).floor() as i32;
                assert_eq!(base_reduction(d, m), expected.max(1), "d={d} m={m}");
            }
        }
    }

    #[test]
    fn reduction_is_monotone_in_depth_and_index() {
        let config = ungated();
        for depth in 1..=40 {
            for index in 1..40 {
                let r = suggest_reduction(&config, &late_quiet(depth, index));
                let deeper = suggest_reduction(&config, &late_quiet(depth + 1, index));
                let later = suggest_reduction(&config, &late_quiet(depth, index + 1));
                assert!(deeper >= r, "depth {depth} index {index}");
                assert!(later >= r, "depth {depth} index {index}");
            }
        }
    }

    #[test]
    fn deep_reductions_follow_table() {
        let config = ungated();
        for depth in 9..=40 {
            for index in 1..40 {
                let expected = base_reduction(depth, index + 1).min(depth - 1);
                assert_eq!(suggest_reduction(&config, &late_quiet(depth, index)), expected);
            }
        }
    }

    #[test]
    fn hard_gates_give_zero() {
        let config = SearchConfig::default();
        let base = late_quiet(10, 20);
        assert!(suggest_reduction(&config, &base) > 0);
        assert_eq!(suggest_reduction(&config, &LmrFactors { in_check: true, ..base }), 0);
        assert_eq!(suggest_reduction(&config, &LmrFactors { in_null: true, ..base }), 0);
        assert_eq!(suggest_reduction(&config, &LmrFactors { depth: 2, ..base }), 0);
        assert_eq!(suggest_reduction(&config, &LmrFactors { index: 2, ..base }), 0);
        assert_eq!(suggest_reduction(&config, &LmrFactors { recapture: true, ..base }), 0);
        assert_eq!(suggest_reduction(&config, &LmrFactors { is_killer: true, ..base }), 0);
        assert_eq!(suggest_reduction(&config, &LmrFactors { is_tt_move: true, ..base }), 0);
        assert_eq!(suggest_reduction(&config, &LmrFactors { history: 5000, ..base }), 0);
        assert_eq!(
            suggest_reduction(&config, &LmrFactors { is_capture: true, ..base }),
            0
        );
        assert_eq!(
            suggest_reduction(&config, &LmrFactors { gives_check: true, ..base }),
            0
        );
    }

    #[test]
    fn quiet_index_counts_after_captures() {
        let config = SearchConfig::default();
        // Sixth move overall but only the second quiet.
        let f = LmrFactors {
            capture_count: 4,
            history: 1,
            ..late_quiet(10, 5)
        };
        assert_eq!(suggest_reduction(&config, &f), 0);
    }

    #[test]
    fn shallow_and_pv_caps() {
        let config = SearchConfig::default();
        assert!(suggest_reduction(&config, &late_quiet(6, 30)) <= 1);
        assert!(suggest_reduction(&config, &late_quiet(8, 30)) <= 2);
        let pv = LmrFactors {
            is_pv: true,
            ..late_quiet(20, 30)
        };
        assert!(suggest_reduction(&config, &pv) <= config.lmr_pv_max);
        assert_eq!(
            suggest_reduction(&config, &LmrFactors { is_pv: true, ..late_quiet(20, 0) }),
            0
        );
    }

    #[test]
    fn never_reduces_to_zero_depth_or_below() {
        let config = ungated();
        for depth in 1..=12 {
            let r = suggest_reduction(&config, &late_quiet(depth, 63));
            assert!(r <= depth - 1);
        }
    }

    #[test]
    fn bounce_back_and_bad_history_add() {
        let config = SearchConfig {
            lmr_max: 10,
            ..SearchConfig::default()
        };
        let plain = LmrFactors {
            history: 1,
            ..late_quiet(20, 10)
        };
        let r = suggest_reduction(&config, &plain);
        let bounced = suggest_reduction(&config, &LmrFactors { bounce_back: true, ..plain });
        let punished = suggest_reduction(&config, &LmrFactors { history: -5, ..plain });
        assert_eq!(bounced, r + 1);
        assert_eq!(punished, r + 1);
    }
}
