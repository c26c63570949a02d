//! Cheap king-safety and zugzwang probes used to gate pruning.

use kestrel_core::{BitBoard, File, Piece, Position};

/// Files f, g and h, or a, b and c, depending on the king's wing.
/// `None` for a king on d or e.
fn wing_files(king_file: File) -> Option<[File; 3]> {
    match king_file {
        File::F | File::G | File::H => Some([File::F, File::G, File::H]),
        File::A | File::B | File::C => Some([File::A, File::B, File::C]),
        _ => None,
    }
}

/// Whether the side to move has a visibly weakened king.
///
/// Counts shield holes (wing files without an own pawn) plus enemy pressure
/// (one point for a semi-open file, two for a fully open one) on the king's
/// wing. Three or more points is danger.
///
/// A king on the d or e file has no wing and is never reported in danger,
/// even with an open file beside it; neither neighbouring wing is scanned.
pub fn quick_danger(pos: &Position) -> bool {
    let us = pos.side_to_move();
    let Some(files) = wing_files(pos.king(us).file()) else {
        return false;
    };
    let ours = pos.colored_pieces(us, Piece::Pawn);
    let theirs = pos.colored_pieces(!us, Piece::Pawn);

    let mut points = 0;
    for file in files {
        let mask: BitBoard = file.bitboard();
        let own = !(ours & mask).is_empty();
        let enemy = !(theirs & mask).is_empty();
        if !own {
            points += 1;
            points += if enemy { 1 } else { 2 };
        }
    }
    points >= 3
}

/// Side to move has no pawns, no rooks or queens, and at most two minors.
pub fn is_zugzwangish(pos: &Position) -> bool {
    let us = pos.side_to_move();
    if !pos.colored_pieces(us, Piece::Pawn).is_empty() {
        return false;
    }
    let heavy = pos.colored_pieces(us, Piece::Rook) | pos.colored_pieces(us, Piece::Queen);
    if !heavy.is_empty() {
        return false;
    }
    let minors = pos.colored_pieces(us, Piece::Knight) | pos.colored_pieces(us, Piece::Bishop);
    minors.len() <= 2
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(fen: &str) -> Position {
        Position::from_fen(fen).unwrap()
    }

    #[test]
    fn intact_shield_is_safe() {
        assert!(!quick_danger(&pos("6k1/5ppp/8/8/8/8/5PPP/6K1 w - - 0 1")));
    }

    #[test]
    fn one_missing_pawn_is_not_enough() {
        // h-pawn gone but black has an h-pawn: 1 hole + 1 semi-open = 2.
        assert!(!quick_danger(&pos("6k1/5ppp/8/8/8/8/5PP1/6K1 w - - 0 1")));
    }

    #[test]
    fn open_file_next_to_king_is_danger() {
        // h-file fully open: 1 hole + 2 open = 3.
        assert!(quick_danger(&pos("6k1/5pp1/8/8/8/8/5PP1/6K1 w - - 0 1")));
    }

    #[test]
    fn queenside_king_uses_queenside_files() {
        assert!(!quick_danger(&pos("2k5/ppp5/8/8/8/8/PPP5/2K5 w - - 0 1")));
        assert!(quick_danger(&pos("2k5/ppp5/8/8/8/8/8/2K5 w - - 0 1")));
    }

    #[test]
    fn central_king_never_in_danger() {
        assert!(!quick_danger(&pos("4k3/8/8/8/8/8/8/4K3 w - - 0 1")));
        // No white pawns at all: both wings would score as open on c1 or f1.
        assert!(!quick_danger(&pos("3k4/ppp2ppp/8/8/8/8/8/3K4 w - - 0 1")));
        assert!(!quick_danger(&pos("4k3/ppp2ppp/8/8/8/8/8/4K3 w - - 0 1")));
        assert!(quick_danger(&pos("4k3/ppp2ppp/8/8/8/8/8/2K5 w - - 0 1")));
    }

    #[test]
    fn danger_is_for_side_to_move() {
        // White's shield is gone, black's is intact; black to move.
        assert!(!quick_danger(&pos("6k1/5ppp/8/8/8/8/8/6K1 b - - 0 1")));
    }

    #[test]
    fn zugzwangish_material() {
        assert!(is_zugzwangish(&pos("4k3/8/8/8/8/8/8/2B1KN2 w - - 0 1")));
        assert!(is_zugzwangish(&pos("4k3/8/8/8/8/8/8/4K3 w - - 0 1")));
        assert!(!is_zugzwangish(&pos("4k3/8/8/8/8/8/4P3/4K3 w - - 0 1")));
        assert!(!is_zugzwangish(&pos("4k3/8/8/8/8/8/8/3RK3 w - - 0 1")));
        assert!(!is_zugzwangish(&pos("4k3/8/8/8/8/8/8/1NB1KN2 w - - 0 1")));
        // Only the side to move counts.
        assert!(is_zugzwangish(&pos("3qk3/8/8/8/8/8/8/4K3 w - - 0 1")));
    }
}
