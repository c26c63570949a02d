//! Perft (performance test) over make/unmake, for move generation verification.

use crate::MAX_MOVES;
use crate::position::Position;

/// Count leaf nodes at `depth` by playing and undoing every legal move.
///
/// Depth 0 returns 1. Depth 1 bulk-counts the legal moves.
pub fn perft(pos: &mut Position, depth: usize) -> u64 {
    if depth == 0 {
        return 1;
    }

    let mut moves = Vec::with_capacity(MAX_MOVES);
    let count = pos.legal_moves(&mut moves, true);
    if depth == 1 {
        return count as u64;
    }

    let mut nodes = 0u64;
    for &mv in &moves {
        let undo = pos.play_move(mv);
        nodes += perft(pos, depth - 1);
        pos.undo_move(undo);
    }
    nodes
}
