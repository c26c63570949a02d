//! Game phase from remaining non-pawn material.

use kestrel_core::{Piece, Position};

/// Phase of a full set of minor and major pieces.
///
/// Weights: knight 1, bishop 1, rook 2, queen 4.
pub const MAX_PHASE: i32 = 24;

/// Game phase in `0..=MAX_PHASE`; promoted pieces cannot push it higher.
pub fn game_phase(pos: &Position) -> i32 {
    let count = |piece| pos.pieces(piece).len() as i32;
    let phase = count(Piece::Knight)
        + count(Piece::Bishop)
        + 2 * count(Piece::Rook)
        + 4 * count(Piece::Queen);
    phase.min(MAX_PHASE)
}

#[cfg(test)]
mod tests {
    use kestrel_core::Position;

    use super::{MAX_PHASE, game_phase};

    #[test]
    fn starting_position_is_max_phase() {
        assert_eq!(game_phase(&Position::startpos()), MAX_PHASE);
    }

    #[test]
    fn pawn_ending_is_zero() {
        let pos = Position::from_fen("8/4p3/4k3/8/8/4K3/4P3/8 w - - 0 1").unwrap();
        assert_eq!(game_phase(&pos), 0);
    }

    #[test]
    fn missing_queen_drops_four() {
        let pos =
            Position::from_fen("rnb1kbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1").unwrap();
        assert_eq!(game_phase(&pos), 20);
    }
}
