//! Static Exchange Evaluation (SEE).
//!
//! Plays out the capture sequence on one square, each side always
//! recapturing with its least valuable attacker, and scores the result
//! from the mover's point of view.

use kestrel_core::{BitBoard, Color, Move, Piece, Position, Square};

/// Exchange values indexed by piece.
pub const SEE_VALUE: [i32; 6] = [100, 320, 330, 500, 900, 20_000];

#[inline]
pub fn see_value(piece: Piece) -> i32 {
    SEE_VALUE[piece as usize]
}

/// Least valuable member of `attackers` belonging to `side`.
fn least_valuable_attacker(
    pos: &Position,
    attackers: BitBoard,
    side: Color,
) -> Option<(Square, Piece)> {
    Piece::ALL.into_iter().find_map(|piece| {
        let candidates = attackers & pos.colored_pieces(side, piece);
        candidates.next_square().map(|sq| (sq, piece))
    })
}

/// Net material outcome of `mv` after all profitable recaptures.
pub fn see(pos: &Position, mv: Move) -> i32 {
    let from = mv.from();
    let to = mv.to();
    let us = pos.side_to_move();

    let mut occupied = pos.occupied() ^ from.bitboard();
    if mv.is_en_passant() {
        let victim = Square::new(to.file(), from.rank());
        occupied ^= victim.bitboard();
    }

    let mut gain = [0i32; 32];
    gain[0] = pos.captured_piece(mv).map_or(0, see_value);
    if let Some(promo) = mv.promotion() {
        gain[0] += see_value(promo) - see_value(Piece::Pawn);
    }

    // Value of the piece now standing on `to`.
    let mut on_square = mv.promotion().map_or(see_value(mv.piece()), see_value);
    let mut side = !us;
    let mut depth = 0usize;

    loop {
        let attackers = pos.attackers_to(to, occupied) & occupied;
        let Some((sq, piece)) = least_valuable_attacker(pos, attackers, side) else {
            break;
        };
        if depth + 1 == gain.len() {
            break;
        }
        depth += 1;
        gain[depth] = on_square - gain[depth - 1];
        on_square = see_value(piece);
        occupied ^= sq.bitboard();
        side = !side;
    }

    while depth > 0 {
        gain[depth - 1] = -((-gain[depth - 1]).max(gain[depth]));
        depth -= 1;
    }
    gain[0]
}

/// Whether [`see`] of `mv` is at least `threshold`.
#[inline]
pub fn see_ge(pos: &Position, mv: Move, threshold: i32) -> bool {
    see(pos, mv) >= threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    fn see_of(fen: &str, uci: &str) -> i32 {
        let pos = Position::from_fen(fen).unwrap();
        let mv = pos.move_from_uci(uci).unwrap();
        see(&pos, mv)
    }

    #[test]
    fn free_pawn() {
        assert_eq!(see_of("4k3/8/8/3p4/4P3/8/8/4K3 w - - 0 1", "e4d5"), 100);
    }

    #[test]
    fn defended_pawn_taken_by_queen_loses() {
        // Qxd5 exd5 loses the queen for a pawn.
        assert_eq!(see_of("4k3/8/4p3/3p4/8/8/8/3QK3 w - - 0 1", "d1d5"), 100 - 900);
    }

    #[test]
    fn equal_trade() {
        // Nxe5 Nxe5: knight for knight.
        assert_eq!(see_of("4k3/8/2n5/4n3/8/5N2/8/4K3 w - - 0 1", "f3e5"), 0);
    }

    #[test]
    fn xray_rook_backs_up_capture() {
        // Rxd5 cxd5 Rxd5: pawn + pawn - rook.
        assert_eq!(
            see_of("4k3/8/2p5/3p4/8/8/3R4/3RK3 w - - 0 1", "d2d5"),
            100 - 500 + 100
        );
    }

    #[test]
    fn quiet_move_onto_attacked_square() {
        // Knight steps where a pawn takes it.
        assert_eq!(see_of("4k3/8/4p3/8/8/2N5/8/4K3 w - - 0 1", "c3d5"), -320);
    }

    #[test]
    fn en_passant_wins_pawn() {
        assert_eq!(see_of("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1", "e5d6"), 100);
    }

    #[test]
    fn see_ge_threshold() {
        let pos = Position::from_fen("4k3/8/8/3p4/4P3/8/8/4K3 w - - 0 1").unwrap();
        let mv = pos.move_from_uci("e4d5").unwrap();
        assert!(see_ge(&pos, mv, 0));
        assert!(see_ge(&pos, mv, 100));
        assert!(!see_ge(&pos, mv, 101));
    }
}
