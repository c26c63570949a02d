//! Transposition table plus a static-evaluation cache, both lockless.
//!
//! Each search entry is two `AtomicU64` words. The second word carries the
//! data; the first stores `key ^ data`, so a probe validates the key and
//! detects a half-written slot with a single XOR.
//!
//! ## Data word layout
//!
//! ```text
//!   bits 63-48: score       (i16, mate scores node-relative)
//!   bits 47-40: depth       (u8)
//!   bits 39-35: generation  (5 bits, wraps at 32)
//!   bits 34-33: bound       (2 bits)
//!   bits 19-0:  move        (packed `Move`, 0 = none)
//! ```
//!
//! Static-eval slots are one word: the upper 48 key bits and an `i16` eval.
//!
//! All atomic accesses use `Relaxed` ordering.

use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

use kestrel_core::Move;

use crate::search::negamax::MATE_THRESHOLD;

/// Bound type stored in an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Bound {
    /// Empty slot.
    None = 0,
    /// The stored score is exact.
    Exact = 1,
    /// The stored score is a lower bound (the node failed high).
    LowerBound = 2,
    /// The stored score is an upper bound (the node failed low).
    UpperBound = 3,
}

impl Bound {
    const fn from_bits(bits: u64) -> Self {
        match bits & 0x03 {
            1 => Bound::Exact,
            2 => Bound::LowerBound,
            3 => Bound::UpperBound,
            _ => Bound::None,
        }
    }
}

/// A matching entry returned by [`TranspositionTable::probe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtHit {
    pub best_move: Option<Move>,
    pub depth: i32,
    pub bound: Bound,
    /// Score relative to the probing node's ply.
    pub score: i32,
    /// The stored depth meets the depth the caller asked for.
    pub usable: bool,
}

/// Counter snapshot for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TtStats {
    pub probes: u64,
    pub hits: u64,
    pub stores: u64,
    pub cutoffs: u64,
    /// Share of sampled slots written this search, in permille.
    pub fill_permille: u32,
}

/// Convert a search score to its stored form.
///
/// Mate scores are stored as distance from this node rather than from the
/// root so they stay valid when the position is reached along another path.
pub fn score_to_tt(score: i32, ply: usize) -> i32 {
    if score >= MATE_THRESHOLD {
        score + ply as i32
    } else if score <= -MATE_THRESHOLD {
        score - ply as i32
    } else {
        score
    }
}

/// Reverse [`score_to_tt`].
pub fn score_from_tt(score: i32, ply: usize) -> i32 {
    if score >= MATE_THRESHOLD {
        score - ply as i32
    } else if score <= -MATE_THRESHOLD {
        score + ply as i32
    } else {
        score
    }
}

// ── Internal entry type ──────────────────────────────────────────────────────

const GENERATION_MASK: u8 = 0x1F;
const MOVE_MASK: u64 = 0xF_FFFF;

#[derive(Debug, Clone, Copy)]
struct Decoded {
    score: i32,
    depth: i32,
    generation: u8,
    bound: Bound,
    best_move: Option<Move>,
}

fn pack_data(score: i32, depth: i32, generation: u8, bound: Bound, best_move: Option<Move>) -> u64 {
    let score_bits = (score as i16 as u16 as u64) << 48;
    let depth_bits = (depth.clamp(0, u8::MAX as i32) as u64) << 40;
    let gen_bits = ((generation & GENERATION_MASK) as u64) << 35;
    let bound_bits = (bound as u64) << 33;
    let move_bits = best_move.map_or(0, |mv| mv.pack() as u64) & MOVE_MASK;
    score_bits | depth_bits | gen_bits | bound_bits | move_bits
}

fn unpack_data(data: u64) -> Decoded {
    Decoded {
        score: (data >> 48) as u16 as i16 as i32,
        depth: ((data >> 40) & 0xFF) as i32,
        generation: ((data >> 35) as u8) & GENERATION_MASK,
        bound: Bound::from_bits(data >> 33),
        best_move: Move::unpack((data & MOVE_MASK) as u32),
    }
}

struct AtomicEntry {
    check: AtomicU64,
    data: AtomicU64,
}

impl AtomicEntry {
    fn new() -> Self {
        Self {
            check: AtomicU64::new(0),
            data: AtomicU64::new(0),
        }
    }

    /// Data word for `key`, or `None` on a key mismatch or torn write.
    fn load(&self, key: u64) -> Option<u64> {
        let check = self.check.load(Ordering::Relaxed);
        let data = self.data.load(Ordering::Relaxed);
        (data != 0 && check ^ data == key).then_some(data)
    }

    fn store(&self, key: u64, data: u64) {
        self.check.store(key ^ data, Ordering::Relaxed);
        self.data.store(data, Ordering::Relaxed);
    }

    fn clear(&self) {
        self.check.store(0, Ordering::Relaxed);
        self.data.store(0, Ordering::Relaxed);
    }
}

const EVAL_KEY_MASK: u64 = !0xFFFF;

// ── Public API ───────────────────────────────────────────────────────────────

/// Transposition table with a side cache for static evaluations.
///
/// All methods take `&self`.
pub struct TranspositionTable {
    entries: Box<[AtomicEntry]>,
    evals: Box<[AtomicU64]>,
    mask: u64,
    eval_mask: u64,
    generation: AtomicU8,
    probes: AtomicU64,
    hits: AtomicU64,
    stores: AtomicU64,
    cutoffs: AtomicU64,
}

impl TranspositionTable {
    /// Create a table of roughly `mb` megabytes.
    ///
    /// Search entries get seven eighths of the budget, rounded down to a
    /// power of two; the eval cache gets a quarter as many slots.
    pub fn new(mb: usize) -> Self {
        let bytes = mb.max(1) * 1024 * 1024;
        let entry_size = std::mem::size_of::<AtomicEntry>();
        let num_entries = ((bytes / 8 * 7 / entry_size).next_power_of_two() >> 1).max(1);
        let num_evals = (num_entries / 4).max(1);

        let entries: Box<[AtomicEntry]> = (0..num_entries).map(|_| AtomicEntry::new()).collect();
        let evals: Box<[AtomicU64]> = (0..num_evals).map(|_| AtomicU64::new(0)).collect();

        Self {
            entries,
            evals,
            mask: (num_entries - 1) as u64,
            eval_mask: (num_evals - 1) as u64,
            generation: AtomicU8::new(0),
            probes: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            stores: AtomicU64::new(0),
            cutoffs: AtomicU64::new(0),
        }
    }

    /// Reallocate at a new size, discarding all entries.
    pub fn resize(&mut self, mb: usize) {
        *self = Self::new(mb);
    }

    /// Number of search entries.
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Drop every entry and reset generation and counters.
    pub fn clear(&self) {
        for entry in self.entries.iter() {
            entry.clear();
        }
        for slot in self.evals.iter() {
            slot.store(0, Ordering::Relaxed);
        }
        self.generation.store(0, Ordering::Relaxed);
        self.reset_counters();
    }

    /// Start a new search: age existing entries and reset counters.
    pub fn new_search(&self) {
        let current = self.generation.load(Ordering::Relaxed);
        self.generation
            .store(current.wrapping_add(1) & GENERATION_MASK, Ordering::Relaxed);
        self.reset_counters();
    }

    pub fn reset_counters(&self) {
        self.probes.store(0, Ordering::Relaxed);
        self.hits.store(0, Ordering::Relaxed);
        self.stores.store(0, Ordering::Relaxed);
        self.cutoffs.store(0, Ordering::Relaxed);
    }

    #[inline]
    fn entry(&self, key: u64) -> &AtomicEntry {
        &self.entries[(key & self.mask) as usize]
    }

    /// Look up `key`. On a hit, `usable` reports whether the stored depth is
    /// at least `required_depth`.
    pub fn probe(&self, key: u64, required_depth: i32, ply: usize) -> Option<TtHit> {
        self.probes.fetch_add(1, Ordering::Relaxed);
        let data = self.entry(key).load(key)?;
        let decoded = unpack_data(data);
        if decoded.bound == Bound::None {
            return None;
        }
        self.hits.fetch_add(1, Ordering::Relaxed);
        Some(TtHit {
            best_move: decoded.best_move,
            depth: decoded.depth,
            bound: decoded.bound,
            score: score_from_tt(decoded.score, ply),
            usable: decoded.depth >= required_depth,
        })
    }

    /// Stored best move for `key`, without touching the counters.
    pub fn peek_move(&self, key: u64) -> Option<Move> {
        let data = self.entry(key).load(key)?;
        unpack_data(data).best_move
    }

    /// Store a search result.
    ///
    /// The same position is overwritten only by an equal or deeper search
    /// or an exact score. A different position is evicted when it is empty,
    /// from an older search, or not deeper than the new one.
    pub fn store(
        &self,
        key: u64,
        best_move: Option<Move>,
        depth: i32,
        score: i32,
        bound: Bound,
        ply: usize,
    ) {
        let entry = self.entry(key);
        let generation = self.generation.load(Ordering::Relaxed);
        let mut best_move = best_move;

        if let Some(existing) = entry.load(key) {
            let old = unpack_data(existing);
            if depth < old.depth && bound != Bound::Exact && old.bound != Bound::None {
                return;
            }
            if best_move.is_none() {
                best_move = old.best_move;
            }
        } else {
            let old = unpack_data(entry.data.load(Ordering::Relaxed));
            let replace =
                old.bound == Bound::None || old.generation != generation || depth >= old.depth;
            if !replace {
                return;
            }
        }

        let data = pack_data(score_to_tt(score, ply), depth, generation, bound, best_move);
        entry.store(key, data);
        self.stores.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a search cutoff caused by a table hit.
    pub fn record_cutoff(&self) {
        self.cutoffs.fetch_add(1, Ordering::Relaxed);
    }

    /// Cached static evaluation for `key`.
    pub fn probe_static_eval(&self, key: u64) -> Option<i32> {
        let word = self.evals[(key & self.eval_mask) as usize].load(Ordering::Relaxed);
        (word != 0 && word & EVAL_KEY_MASK == key & EVAL_KEY_MASK)
            .then(|| word as u16 as i16 as i32)
    }

    /// Cache a static evaluation. Mate-range values are never cached.
    pub fn store_static_eval(&self, key: u64, eval: i32) {
        if eval.abs() >= MATE_THRESHOLD {
            return;
        }
        let word = (key & EVAL_KEY_MASK) | (eval as i16 as u16 as u64);
        self.evals[(key & self.eval_mask) as usize].store(word, Ordering::Relaxed);
    }

    /// Snapshot of the counters and an occupancy estimate.
    pub fn stats(&self) -> TtStats {
        let generation = self.generation.load(Ordering::Relaxed);
        let sample = self.entries.len().min(1000);
        let filled = self.entries[..sample]
            .iter()
            .filter(|entry| {
                let decoded = unpack_data(entry.data.load(Ordering::Relaxed));
                decoded.bound != Bound::None && decoded.generation == generation
            })
            .count();
        TtStats {
            probes: self.probes.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            stores: self.stores.load(Ordering::Relaxed),
            cutoffs: self.cutoffs.load(Ordering::Relaxed),
            fill_permille: (filled * 1000 / sample.max(1)) as u32,
        }
    }
}

impl std::fmt::Debug for TranspositionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranspositionTable")
            .field("entries", &self.entries.len())
            .field("evals", &self.evals.len())
            .field("generation", &self.generation.load(Ordering::Relaxed))
            .finish()
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
