//! Search configuration: every tunable threshold, margin and switch.
//!
//! A [`SearchConfig`] is built once per engine instance and never changes
//! while a search runs. Use the consuming setters to adjust individual knobs
//! and [`SearchConfig::validate`] before handing it to a
//! [`Searcher`](crate::Searcher).

use std::time::Duration;

/// Rejected configuration values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A numeric knob lies outside its accepted range.
    #[error("{name} = {value} is outside {min}..={max}")]
    OutOfRange {
        /// Field name.
        name: &'static str,
        /// Offending value.
        value: i64,
        /// Smallest accepted value.
        min: i64,
        /// Largest accepted value.
        max: i64,
    },
}

/// Tunable parameters for the search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    // ── Transposition table ──
    pub use_tt: bool,
    /// Use stored bounds to tighten alpha/beta (not just for move ordering).
    pub use_tt_bounds: bool,
    pub tt_size_mb: usize,
    /// Minimum remaining depth at which stored bounds may tighten the window.
    pub tt_bound_min_depth: i32,
    /// At depth <= 2 only exact scores are written.
    pub store_exact_only_at_shallow: bool,

    // ── Windows and quiescence ──
    /// Off: every iteration searches the full (-INF, INF) window.
    pub use_aspiration: bool,
    pub aspiration_cp: i32,
    pub delta_margin: i32,
    pub see_margin: i32,
    pub qs_delta_pruning: bool,
    pub qs_see_pruning: bool,

    // ── Null move ──
    pub use_null_move: bool,
    pub null_min_depth: i32,
    /// Base reduction R; one more is added from depth 6.
    pub null_base_reduction: i32,
    /// Verify a null-move cutoff when the reduced depth is at or below this (0 = never).
    pub null_verify_depth: i32,
    /// Verify a null-move cutoff when the king-danger probe fires.
    pub nmp_verify_on_danger: bool,
    pub nmp_verify_min_depth: i32,
    pub disable_null_in_pv: bool,
    pub disable_null_in_zugzwangish: bool,

    // ── Late-move reductions ──
    pub use_lmr: bool,
    pub lmr_min_depth: i32,
    pub lmr_min_move: usize,
    pub lmr_max: i32,
    pub lmr_pv_max: i32,
    pub lmr_reduce_captures: bool,
    pub lmr_reduce_checks: bool,
    pub lmr_skip_tt_move: bool,
    pub lmr_skip_killers: bool,
    pub lmr_history_skip: i32,
    pub lmr_history_punish: i32,
    pub lmr_bounce_bump: i32,

    // ── Futility family ──
    pub use_futility: bool,
    /// Margins for depth 1, 2 and 3.
    pub futility_margins: [i32; 3],
    pub use_reverse_futility: bool,
    pub reverse_futility_margin: i32,
    pub use_razoring: bool,
    pub razor_margins: [i32; 2],

    // ── Late-move and history pruning ──
    pub use_lmp: bool,
    pub lmp_max_depth: i32,
    pub lmp_base_quiets: usize,
    pub lmp_scale: usize,
    pub lmp_block_on_danger: bool,
    pub use_history_pruning: bool,
    pub hist_prune_max_depth: i32,
    pub hist_prune_after: usize,
    pub hist_prune_threshold: i32,

    // ── Internal iterative deepening ──
    pub use_iid: bool,
    pub iid_min_depth: i32,
    pub iid_reduction: i32,
    pub iid_pv_only: bool,

    // ── ProbCut ──
    pub use_probcut: bool,
    pub probcut_min_depth: i32,
    pub probcut_reduction: i32,
    pub probcut_margin: i32,
    pub probcut_max_moves: usize,
    pub probcut_victim_min: i32,

    // ── Repetition and contempt ──
    pub use_repetition_draw: bool,
    pub rep_scan_max_plies: usize,
    pub use_contempt: bool,
    /// Contempt sign follows the evaluation rather than the root side.
    pub dynamic_contempt: bool,
    pub contempt_cp: i32,
    pub contempt_eval_margin: i32,

    // ── Ordering ──
    pub root_anti_repetition: bool,
    pub reversal_penalty: i32,
    pub countermove_bonus: i32,
    pub history_scale: i32,

    // ── Time ──
    pub default_move_time: Duration,
    pub max_hard_cap: Duration,
    pub move_overhead: Duration,
    /// Share of the remaining clock spent on one move, in percent.
    pub clock_percent: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            use_tt: true,
            use_tt_bounds: true,
            tt_size_mb: 64,
            tt_bound_min_depth: 3,
            store_exact_only_at_shallow: true,

            use_aspiration: true,
            aspiration_cp: 18,
            delta_margin: 40,
            see_margin: 20,
            qs_delta_pruning: true,
            qs_see_pruning: true,

            use_null_move: true,
            null_min_depth: 3,
            null_base_reduction: 2,
            null_verify_depth: 0,
            nmp_verify_on_danger: true,
            nmp_verify_min_depth: 6,
            disable_null_in_pv: true,
            disable_null_in_zugzwangish: true,

            use_lmr: true,
            lmr_min_depth: 3,
            lmr_min_move: 4,
            lmr_max: 3,
            lmr_pv_max: 1,
            lmr_reduce_captures: false,
            lmr_reduce_checks: false,
            lmr_skip_tt_move: true,
            lmr_skip_killers: true,
            lmr_history_skip: 4000,
            lmr_history_punish: 0,
            lmr_bounce_bump: 1,

            use_futility: true,
            futility_margins: [100, 200, 300],
            use_reverse_futility: true,
            reverse_futility_margin: 100,
            use_razoring: true,
            razor_margins: [150, 300],

            use_lmp: true,
            lmp_max_depth: 2,
            lmp_base_quiets: 8,
            lmp_scale: 1,
            lmp_block_on_danger: true,
            use_history_pruning: true,
            hist_prune_max_depth: 2,
            hist_prune_after: 8,
            hist_prune_threshold: 1000,

            use_iid: true,
            iid_min_depth: 5,
            iid_reduction: 2,
            iid_pv_only: true,

            use_probcut: true,
            probcut_min_depth: 5,
            probcut_reduction: 2,
            probcut_margin: 120,
            probcut_max_moves: 8,
            probcut_victim_min: 500,

            use_repetition_draw: true,
            rep_scan_max_plies: 200,
            use_contempt: true,
            dynamic_contempt: true,
            contempt_cp: 20,
            contempt_eval_margin: 50,

            root_anti_repetition: true,
            reversal_penalty: 600_000,
            countermove_bonus: 850_000,
            history_scale: 16_384,

            default_move_time: Duration::from_secs(2),
            max_hard_cap: Duration::from_secs(120),
            move_overhead: Duration::from_millis(10),
            clock_percent: 2,
        }
    }
}

impl SearchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plain alpha-beta: every selective technique, contempt and the TT off.
    ///
    /// Scores become independent of window and move order, which makes this
    /// the reference mode for comparing search variants.
    pub fn without_pruning() -> Self {
        Self {
            use_tt: false,
            qs_delta_pruning: false,
            qs_see_pruning: false,
            use_null_move: false,
            use_lmr: false,
            use_futility: false,
            use_reverse_futility: false,
            use_razoring: false,
            use_lmp: false,
            use_history_pruning: false,
            use_iid: false,
            use_probcut: false,
            use_contempt: false,
            ..Self::default()
        }
    }

    /// Set the transposition table size in megabytes.
    pub fn tt_size_mb(mut self, mb: usize) -> Self {
        self.tt_size_mb = mb;
        self
    }

    pub fn use_tt(mut self, enable: bool) -> Self {
        self.use_tt = enable;
        self
    }

    pub fn use_aspiration(mut self, enable: bool) -> Self {
        self.use_aspiration = enable;
        self
    }

    pub fn aspiration_cp(mut self, cp: i32) -> Self {
        self.aspiration_cp = cp;
        self
    }

    pub fn use_null_move(mut self, enable: bool) -> Self {
        self.use_null_move = enable;
        self
    }

    pub fn use_lmr(mut self, enable: bool) -> Self {
        self.use_lmr = enable;
        self
    }

    pub fn use_probcut(mut self, enable: bool) -> Self {
        self.use_probcut = enable;
        self
    }

    /// Set the contempt value in centipawns (0 disables contempt scoring).
    pub fn contempt_cp(mut self, cp: i32) -> Self {
        self.contempt_cp = cp;
        self.use_contempt = cp != 0;
        self
    }

    pub fn use_repetition_draw(mut self, enable: bool) -> Self {
        self.use_repetition_draw = enable;
        self
    }

    /// Check every numeric knob against its accepted range.
    pub fn validate(self) -> Result<Self, ConfigError> {
        check("tt_size_mb", self.tt_size_mb as i64, 1, 65_536)?;
        check("tt_bound_min_depth", self.tt_bound_min_depth.into(), 0, 64)?;
        check("aspiration_cp", self.aspiration_cp.into(), 1, 1_000)?;
        check("null_min_depth", self.null_min_depth.into(), 1, 64)?;
        check("null_base_reduction", self.null_base_reduction.into(), 1, 8)?;
        check("null_verify_depth", self.null_verify_depth.into(), 0, 64)?;
        check("lmr_min_depth", self.lmr_min_depth.into(), 1, 64)?;
        check("lmr_min_move", self.lmr_min_move as i64, 1, 64)?;
        check("lmr_max", self.lmr_max.into(), 0, 16)?;
        check("lmr_pv_max", self.lmr_pv_max.into(), 0, 16)?;
        check("lmp_scale", self.lmp_scale as i64, 1, 16)?;
        check("iid_reduction", self.iid_reduction.into(), 1, 8)?;
        check("probcut_reduction", self.probcut_reduction.into(), 1, 8)?;
        check("probcut_max_moves", self.probcut_max_moves as i64, 1, 64)?;
        check("contempt_cp", self.contempt_cp.into(), -500, 500)?;
        check("history_scale", self.history_scale.into(), 256, 1 << 20)?;
        check("clock_percent", self.clock_percent.into(), 1, 100)?;
        Ok(self)
    }
}

fn check(name: &'static str, value: i64, min: i64, max: i64) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            name,
            value,
            min,
            max,
        })
    }
}
