//! Quiet-move ordering memory: history, killers, countermoves and
//! continuation history.

use kestrel_core::{Color, Move};

use crate::search::negamax::STACK_PLY;

#[inline]
fn side_index(side: Color) -> usize {
    match side {
        Color::White => 0,
        Color::Black => 1,
    }
}

/// Self-bounding history update: `h + bonus - |h| * bonus / scale`.
///
/// Repeated bonuses approach `scale` without ever crossing it.
pub fn bounded_update(h: i32, bonus: i32, scale: i32) -> i32 {
    let damp = (i64::from(h).abs() * i64::from(bonus) / i64::from(scale.max(1))) as i32;
    h + bonus - damp
}

/// All per-search move-ordering tables.
///
/// About 100 KB, so it lives on the heap inside the search context.
pub struct Heuristics {
    history: [[[i32; 64]; 64]; 2],
    killers: [[Option<Move>; 2]; STACK_PLY],
    countermove: [[Option<Move>; 64]; 64],
    cont_history: [[[i32; 64]; 64]; 2],
}

impl Heuristics {
    pub fn new() -> Box<Self> {
        Box::new(Self {
            history: [[[0; 64]; 64]; 2],
            killers: [[None; 2]; STACK_PLY],
            countermove: [[None; 64]; 64],
            cont_history: [[[0; 64]; 64]; 2],
        })
    }

    /// Forget everything (new game).
    pub fn clear(&mut self) {
        self.history = [[[0; 64]; 64]; 2];
        self.killers = [[None; 2]; STACK_PLY];
        self.countermove = [[None; 64]; 64];
        self.cont_history = [[[0; 64]; 64]; 2];
    }

    pub fn history(&self, side: Color, mv: Move) -> i32 {
        self.history[side_index(side)][mv.from() as usize][mv.to() as usize]
    }

    /// Continuation score of `mv` played in reply to a move landing on `prev`'s target.
    pub fn cont_history(&self, side: Color, prev: Move, mv: Move) -> i32 {
        self.cont_history[side_index(side)][prev.to() as usize][mv.to() as usize]
    }

    pub fn countermove(&self, prev: Move) -> Option<Move> {
        self.countermove[prev.from() as usize][prev.to() as usize]
    }

    pub fn killers(&self, ply: usize) -> [Option<Move>; 2] {
        self.killers[ply.min(STACK_PLY - 1)]
    }

    pub fn is_killer(&self, ply: usize, mv: Move) -> bool {
        self.killers(ply).contains(&Some(mv))
    }

    /// Reward a quiet move that failed high.
    ///
    /// `side` is the side that played `mv`; `prev` is the opponent's move
    /// that led to this node.
    pub fn on_beta_cutoff(
        &mut self,
        side: Color,
        ply: usize,
        depth: i32,
        mv: Move,
        prev: Option<Move>,
        scale: i32,
    ) {
        let s = side_index(side);
        let from = mv.from() as usize;
        let to = mv.to() as usize;
        let bonus = depth * depth;

        let h = &mut self.history[s][from][to];
        *h = bounded_update(*h, bonus, scale);

        if let Some(prev) = prev {
            self.countermove[prev.from() as usize][prev.to() as usize] = Some(mv);
            let c = &mut self.cont_history[s][prev.to() as usize][to];
            *c = bounded_update(*c, bonus >> 1, scale);
        }

        let slots = &mut self.killers[ply.min(STACK_PLY - 1)];
        if slots[0] != Some(mv) {
            slots[1] = slots[0];
            slots[0] = Some(mv);
        }
    }

    /// Age history and continuation history by 1/16.
    pub fn decay(&mut self) {
        for table in [&mut self.history, &mut self.cont_history] {
            for row in table.iter_mut().flatten() {
                for x in row.iter_mut() {
                    *x -= *x >> 4;
                }
            }
        }
    }
}
