//! Piece-square tables, middlegame and endgame, for all six pieces.
//!
//! Tables are written from White's point of view in LERF order
//! (index 0 = a1, index 63 = h8). [`pst_value`] mirrors for Black.

use kestrel_core::{Color, Piece, Square};

#[rustfmt::skip]
const PAWN: [(i32, i32); 64] = [
    (0, 0),     (0, 0),     (0, 0),     (0, 0),     (0, 0),     (0, 0),     (0, 0),     (0, 0), // rank 1
    (5, 0),     (10, 0),    (10, 0),    (-20, -5),  (-20, -5),  (10, 0),    (10, 0),    (5, 0), // rank 2
    (5, 5),     (-5, 5),    (-10, 10),  (0, 10),    (0, 10),    (-10, 10),  (-5, 5),    (5, 5), // rank 3
    (0, 10),    (0, 10),    (0, 15),    (20, 20),   (20, 20),   (0, 15),    (0, 10),    (0, 10), // rank 4
    (5, 15),    (5, 20),    (10, 25),   (25, 30),   (25, 30),   (10, 25),   (5, 20),    (5, 15), // rank 5
    (10, 30),   (10, 30),   (20, 35),   (30, 40),   (30, 40),   (20, 35),   (10, 30),   (10, 30), // rank 6
    (50, 60),   (50, 60),   (50, 60),   (50, 60),   (50, 60),   (50, 60),   (50, 60),   (50, 60), // rank 7
    (0, 0),     (0, 0),     (0, 0),     (0, 0),     (0, 0),     (0, 0),     (0, 0),     (0, 0), // rank 8
];

#[rustfmt::skip]
const KNIGHT: [(i32, i32); 64] = [
    (-50, -50), (-40, -40), (-30, -30), (-30, -30), (-30, -30), (-30, -30), (-40, -40), (-50, -50), // rank 1
    (-40, -40), (-20, -20), (0, 0),     (5, 5),     (5, 5),     (0, 0),     (-20, -20), (-40, -40), // rank 2
    (-30, -30), (5, 5),     (10, 10),   (15, 15),   (15, 15),   (10, 10),   (5, 5),     (-30, -30), // rank 3
    (-30, -30), (0, 0),     (15, 15),   (20, 20),   (20, 20),   (15, 15),   (0, 0),     (-30, -30), // rank 4
    (-30, -30), (5, 5),     (15, 15),   (20, 20),   (20, 20),   (15, 15),   (5, 5),     (-30, -30), // rank 5
    (-30, -30), (0, 0),     (10, 10),   (15, 15),   (15, 15),   (10, 10),   (0, 0),     (-30, -30), // rank 6
    (-40, -40), (-20, -20), (0, 0),     (0, 0),     (0, 0),     (0, 0),     (-20, -20), (-40, -40), // rank 7
    (-50, -50), (-40, -40), (-30, -30), (-30, -30), (-30, -30), (-30, -30), (-40, -40), (-50, -50), // rank 8
];

#[rustfmt::skip]
const BISHOP: [(i32, i32); 64] = [
    (-20, -20), (-10, -10), (-10, -10), (-10, -10), (-10, -10), (-10, -10), (-10, -10), (-20, -20), // rank 1
    (-10, -10), (0, 0),     (0, 0),     (0, 0),     (0, 0),     (0, 0),     (0, 0),     (-10, -10), // rank 2
    (-10, -10), (0, 5),     (5, 5),     (10, 5),    (10, 5),    (5, 5),     (0, 5),     (-10, -10), // rank 3
    (-10, -10), (5, 0),     (5, 10),    (10, 10),   (10, 10),   (5, 10),    (5, 0),     (-10, -10), // rank 4
    (-10, -10), (0, 10),    (10, 10),   (10, 10),   (10, 10),   (10, 10),   (0, 10),    (-10, -10), // rank 5
    (-10, -10), (10, 0),    (10, 10),   (10, 10),   (10, 10),   (10, 10),   (10, 0),    (-10, -10), // rank 6
    (-10, -10), (5, 0),     (0, 0),     (0, 0),     (0, 0),     (0, 0),     (5, 0),     (-10, -10), // rank 7
    (-20, -20), (-10, -10), (-10, -10), (-10, -10), (-10, -10), (-10, -10), (-10, -10), (-20, -20), // rank 8
];

#[rustfmt::skip]
const ROOK: [(i32, i32); 64] = [
    (0, 0),     (0, 0),     (0, 0),     (5, 5),     (5, 5),     (0, 0),     (0, 0),     (0, 0), // rank 1
    (5, 5),     (10, 10),   (10, 10),   (10, 10),   (10, 10),   (10, 10),   (10, 10),   (5, 5), // rank 2
    (-5, -5),   (0, 0),     (0, 0),     (0, 0),     (0, 0),     (0, 0),     (0, 0),     (-5, -5), // rank 3
    (-5, -5),   (0, 0),     (0, 0),     (0, 0),     (0, 0),     (0, 0),     (0, 0),     (-5, -5), // rank 4
    (-5, -5),   (0, 0),     (0, 0),     (0, 0),     (0, 0),     (0, 0),     (0, 0),     (-5, -5), // rank 5
    (-5, -5),   (0, 0),     (0, 0),     (0, 0),     (0, 0),     (0, 0),     (0, 0),     (-5, -5), // rank 6
    (-5, -5),   (0, 0),     (0, 0),     (0, 0),     (0, 0),     (0, 0),     (0, 0),     (-5, -5), // rank 7
    (0, 0),     (0, 0),     (0, 0),     (5, 5),     (5, 5),     (0, 0),     (0, 0),     (0, 0), // rank 8
];

#[rustfmt::skip]
const QUEEN: [(i32, i32); 64] = [
    (-20, -20), (-10, -10), (-10, -10), (-5, -5),   (-5, -5),   (-10, -10), (-10, -10), (-20, -20), // rank 1
    (-10, -10), (0, 0),     (5, 5),     (0, 0),     (0, 0),     (0, 0),     (0, 0),     (-10, -10), // rank 2
    (-10, -10), (5, 5),     (5, 5),     (5, 5),     (5, 5),     (5, 5),     (0, 0),     (-10, -10), // rank 3
    (0, 0),     (0, 0),     (5, 5),     (5, 5),     (5, 5),     (5, 5),     (0, 0),     (-5, -5), // rank 4
    (-5, -5),   (0, 0),     (5, 5),     (5, 5),     (5, 5),     (5, 5),     (0, 0),     (-5, -5), // rank 5
    (-10, -10), (0, 0),     (5, 5),     (5, 5),     (5, 5),     (5, 5),     (0, 0),     (-10, -10), // rank 6
    (-10, -10), (0, 0),     (0, 0),     (0, 0),     (0, 0),     (0, 0),     (0, 0),     (-10, -10), // rank 7
    (-20, -20), (-10, -10), (-10, -10), (-5, -5),   (-5, -5),   (-10, -10), (-10, -10), (-20, -20), // rank 8
];

#[rustfmt::skip]
const KING: [(i32, i32); 64] = [
    (20, -50),  (30, -30),  (10, -30),  (0, -30),   (0, -30),   (10, -30),  (30, -30),  (20, -50), // rank 1
    (20, -30),  (20, -30),  (0, 0),     (0, 0),     (0, 0),     (0, 0),     (20, -30),  (20, -30), // rank 2
    (-10, -30), (-20, -10), (-20, 20),  (-20, 30),  (-20, 30),  (-20, 20),  (-20, -10), (-10, -30), // rank 3
    (-20, -30), (-30, -10), (-30, 30),  (-40, 40),  (-40, 40),  (-30, 30),  (-30, -10), (-20, -30), // rank 4
    (-30, -30), (-30, -10), (-40, 30),  (-50, 40),  (-50, 40),  (-40, 30),  (-30, -10), (-30, -30), // rank 5
    (-30, -30), (-30, -10), (-40, 20),  (-50, 30),  (-50, 30),  (-40, 20),  (-30, -10), (-30, -30), // rank 6
    (-30, -30), (-40, -20), (-40, -10), (-50, 0),   (-50, 0),   (-40, -10), (-40, -20), (-30, -30), // rank 7
    (-30, -50), (-40, -40), (-40, -30), (-50, -20), (-50, -20), (-40, -30), (-40, -40), (-30, -50), // rank 8
];

static TABLES: [[(i32, i32); 64]; 6] = [PAWN, KNIGHT, BISHOP, ROOK, QUEEN, KING];

/// `(middlegame, endgame)` bonus for `piece` of `color` standing on `sq`.
#[inline]
pub fn pst_value(piece: Piece, color: Color, sq: Square) -> (i32, i32) {
    let idx = match color {
        Color::White => sq as usize,
        Color::Black => sq as usize ^ 56,
    };
    TABLES[piece as usize][idx]
}

#[cfg(test)]
mod tests {
    use kestrel_core::{Color, Piece, Square};

    use super::pst_value;

    #[test]
    fn central_pawn_is_rewarded() {
        assert_eq!(pst_value(Piece::Pawn, Color::White, Square::E4), (20, 20));
    }

    #[test]
    fn black_mirrors_white() {
        for (white, black) in [(Square::E4, Square::E5), (Square::G1, Square::G8), (Square::A2, Square::A7)] {
            for piece in Piece::ALL {
                assert_eq!(
                    pst_value(piece, Color::White, white),
                    pst_value(piece, Color::Black, black)
                );
            }
        }
    }

    #[test]
    fn castled_king_beats_central_king_in_middlegame() {
        let castled = pst_value(Piece::King, Color::White, Square::G1).0;
        let central = pst_value(Piece::King, Color::White, Square::E4).0;
        assert!(castled > central);
    }
}
