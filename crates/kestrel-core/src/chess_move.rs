//! Chess move value type and its packed transposition-table encoding.

use std::fmt;

use cozy_chess::{File, Piece, Square};

// Packed layout, used only where a move is persisted (TT slots).
const TO_SHIFT: u32 = 0;
const FROM_SHIFT: u32 = 6;
const PIECE_SHIFT: u32 = 12;
const FLAG_SHIFT: u32 = 15;
const PROMO_SHIFT: u32 = 17;
const SQUARE_MASK: u32 = 0x3F;
const PIECE_MASK: u32 = 0x07;
const FLAG_MASK: u32 = 0x03;

/// Special-move category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveKind {
    Normal,
    EnPassant,
    CastleKingside,
    CastleQueenside,
}

impl MoveKind {
    const fn bits(self) -> u32 {
        match self {
            MoveKind::Normal => 0,
            MoveKind::EnPassant => 1,
            MoveKind::CastleKingside => 2,
            MoveKind::CastleQueenside => 3,
        }
    }

    const fn from_bits(bits: u32) -> MoveKind {
        match bits & FLAG_MASK {
            1 => MoveKind::EnPassant,
            2 => MoveKind::CastleKingside,
            3 => MoveKind::CastleQueenside,
            _ => MoveKind::Normal,
        }
    }
}

/// A fully described move: squares, moving piece, promotion and kind.
///
/// Castling is stored king-to-destination (`e1g1`), the standard UCI form.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    from: Square,
    to: Square,
    piece: Piece,
    promotion: Option<Piece>,
    kind: MoveKind,
}

impl Move {
    /// Build a move from its parts.
    pub const fn new(
        from: Square,
        to: Square,
        piece: Piece,
        promotion: Option<Piece>,
        kind: MoveKind,
    ) -> Move {
        Move {
            from,
            to,
            piece,
            promotion,
            kind,
        }
    }

    /// Source square.
    #[inline]
    pub const fn from(self) -> Square {
        self.from
    }

    /// Destination square (king destination for castling).
    #[inline]
    pub const fn to(self) -> Square {
        self.to
    }

    /// The piece being moved.
    #[inline]
    pub const fn piece(self) -> Piece {
        self.piece
    }

    /// Promotion piece, if any.
    #[inline]
    pub const fn promotion(self) -> Option<Piece> {
        self.promotion
    }

    #[inline]
    pub const fn kind(self) -> MoveKind {
        self.kind
    }

    #[inline]
    pub const fn is_castle(self) -> bool {
        matches!(
            self.kind,
            MoveKind::CastleKingside | MoveKind::CastleQueenside
        )
    }

    #[inline]
    pub const fn is_en_passant(self) -> bool {
        matches!(self.kind, MoveKind::EnPassant)
    }

    #[inline]
    pub const fn is_promotion(self) -> bool {
        self.promotion.is_some()
    }

    /// Encode into the packed 20-bit form.
    ///
    /// ```text
    /// bits  0-5:  destination square
    /// bits  6-11: source square
    /// bits 12-14: moving piece      (pawn = 1 .. king = 6)
    /// bits 15-16: flags             (0 normal, 1 en passant, 2 O-O, 3 O-O-O)
    /// bits 17-19: promotion piece   (0 none, knight = 2 .. queen = 5)
    /// ```
    ///
    /// A packed move is never zero, so zero is free to mean "no move".
    pub const fn pack(self) -> u32 {
        let promo = match self.promotion {
            Some(p) => p as u32 + 1,
            None => 0,
        };
        ((self.to as u32) << TO_SHIFT)
            | ((self.from as u32) << FROM_SHIFT)
            | ((self.piece as u32 + 1) << PIECE_SHIFT)
            | (self.kind.bits() << FLAG_SHIFT)
            | (promo << PROMO_SHIFT)
    }

    /// Decode a packed move. Returns `None` for zero or malformed input.
    pub fn unpack(raw: u32) -> Option<Move> {
        let piece_bits = (raw >> PIECE_SHIFT) & PIECE_MASK;
        let piece = Piece::ALL.get((piece_bits as usize).checked_sub(1)?).copied()?;
        let promo_bits = ((raw >> PROMO_SHIFT) & PIECE_MASK) as usize;
        let promotion = match promo_bits {
            0 => None,
            n => Some(Piece::ALL.get(n - 1).copied()?),
        };
        Some(Move {
            from: Square::ALL[((raw >> FROM_SHIFT) & SQUARE_MASK) as usize],
            to: Square::ALL[((raw >> TO_SHIFT) & SQUARE_MASK) as usize],
            piece,
            promotion,
            kind: MoveKind::from_bits(raw >> FLAG_SHIFT),
        })
    }

    /// Convert to the move-generator representation (castling as king-takes-rook).
    pub(crate) fn to_cozy(self) -> cozy_chess::Move {
        let to = match self.kind {
            MoveKind::CastleKingside => Square::new(File::H, self.from.rank()),
            MoveKind::CastleQueenside => Square::new(File::A, self.from.rank()),
            _ => self.to,
        };
        cozy_chess::Move {
            from: self.from,
            to,
            promotion: self.promotion,
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(promo) = self.promotion {
            write!(f, "{}", promo)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Move({self})")
    }
}

#[cfg(test)]
mod tests {
    use cozy_chess::{Piece, Square};

    use super::{Move, MoveKind};

    #[test]
    fn pack_unpack_roundtrip() {
        let moves = [
            Move::new(Square::E2, Square::E4, Piece::Pawn, None, MoveKind::Normal),
            Move::new(Square::E1, Square::G1, Piece::King, None, MoveKind::CastleKingside),
            Move::new(Square::E8, Square::C8, Piece::King, None, MoveKind::CastleQueenside),
            Move::new(Square::E5, Square::D6, Piece::Pawn, None, MoveKind::EnPassant),
            Move::new(Square::A7, Square::A8, Piece::Pawn, Some(Piece::Queen), MoveKind::Normal),
            Move::new(Square::B2, Square::A1, Piece::Pawn, Some(Piece::Knight), MoveKind::Normal),
        ];
        for mv in moves {
            assert_ne!(mv.pack(), 0);
            assert_eq!(Move::unpack(mv.pack()), Some(mv));
        }
    }

    #[test]
    fn packed_bit_layout() {
        let mv = Move::new(Square::E2, Square::E4, Piece::Pawn, None, MoveKind::Normal);
        let raw = mv.pack();
        assert_eq!(raw & 0x3F, Square::E4 as u32);
        assert_eq!((raw >> 6) & 0x3F, Square::E2 as u32);
        assert_eq!((raw >> 12) & 0x7, 1);
        assert_eq!((raw >> 15) & 0x3, 0);
    }

    #[test]
    fn unpack_zero_is_none() {
        assert_eq!(Move::unpack(0), None);
    }

    #[test]
    fn display_is_uci() {
        let castle = Move::new(Square::E1, Square::G1, Piece::King, None, MoveKind::CastleKingside);
        assert_eq!(castle.to_string(), "e1g1");
        let promo = Move::new(Square::A7, Square::A8, Piece::Pawn, Some(Piece::Queen), MoveKind::Normal);
        assert_eq!(promo.to_string(), "a7a8q");
    }

    #[test]
    fn castle_converts_to_king_takes_rook() {
        let short = Move::new(Square::E1, Square::G1, Piece::King, None, MoveKind::CastleKingside);
        assert_eq!(short.to_cozy().to, Square::H1);
        let long = Move::new(Square::E8, Square::C8, Piece::King, None, MoveKind::CastleQueenside);
        assert_eq!(long.to_cozy().to, Square::A8);
    }
}
