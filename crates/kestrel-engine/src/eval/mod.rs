//! Static evaluation: material plus tapered piece-square tables.

pub mod phase;
pub mod pst;

use kestrel_core::{Color, Piece, Position};

use phase::{MAX_PHASE, game_phase};
use pst::pst_value;

/// Material values in centipawns, indexed by piece.
pub const PIECE_VALUE: [i32; 6] = [100, 320, 330, 500, 900, 0];

/// `(middlegame, endgame)` bonus for owning both bishops.
const BISHOP_PAIR: (i32, i32) = (30, 50);

/// Evaluate `pos` in centipawns from the side to move's point of view.
///
/// The result stays far below the mate range.
pub fn evaluate(pos: &Position) -> i32 {
    let (mut mg, mut eg) = (0, 0);

    for color in Color::ALL {
        let sign = if color == Color::White { 1 } else { -1 };
        for piece in Piece::ALL {
            for sq in pos.colored_pieces(color, piece) {
                let (pm, pe) = pst_value(piece, color, sq);
                mg += sign * (PIECE_VALUE[piece as usize] + pm);
                eg += sign * (PIECE_VALUE[piece as usize] + pe);
            }
        }
        if pos.colored_pieces(color, Piece::Bishop).len() >= 2 {
            mg += sign * BISHOP_PAIR.0;
            eg += sign * BISHOP_PAIR.1;
        }
    }

    let phase = game_phase(pos);
    let white = (mg * phase + eg * (MAX_PHASE - phase)) / MAX_PHASE;
    match pos.side_to_move() {
        Color::White => white,
        Color::Black => -white,
    }
}

#[cfg(test)]
mod tests {
    use kestrel_core::Position;

    use super::evaluate;

    #[test]
    fn starting_position_is_balanced() {
        assert_eq!(evaluate(&Position::startpos()), 0);
    }

    #[test]
    fn extra_queen_is_large_advantage() {
        let pos =
            Position::from_fen("rnb1kbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1").unwrap();
        assert!(evaluate(&pos) > 800);
    }

    #[test]
    fn score_is_from_side_to_move() {
        let white =
            Position::from_fen("rnb1kbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1").unwrap();
        let black =
            Position::from_fen("rnb1kbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR b KQkq - 0 1").unwrap();
        assert_eq!(evaluate(&white), -evaluate(&black));
    }
}
