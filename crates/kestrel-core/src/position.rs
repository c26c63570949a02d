//! Mutable game position with reversible make/unmake.
//!
//! Wraps a `cozy_chess::Board` and records the key and move of every earlier
//! position so repetition detection and "last move" queries work across both
//! the game history and the current search line.

use std::fmt;

use cozy_chess::{
    BitBoard, Board, Color, File, Piece, Square, get_bishop_moves, get_king_moves,
    get_knight_moves, get_pawn_attacks, get_rook_moves,
};
use tracing::trace;

use crate::chess_move::{Move, MoveKind};
use crate::error::PositionError;
use crate::MAX_MOVES;

/// FEN of the standard starting position.
pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Dark squares (a1 is dark).
const DARK_SQUARES: BitBoard = BitBoard(0xAA55_AA55_AA55_AA55);

/// Opaque token returned by [`Position::play_move`] and
/// [`Position::play_null_move`]; hand it back to the matching undo call.
#[must_use = "every played move must be undone with the returned token"]
#[derive(Debug)]
pub struct Undo {
    board: Board,
}

/// A chess position plus the history that led to it.
#[derive(Clone)]
pub struct Position {
    board: Board,
    /// Keys of all earlier positions, oldest first.
    keys: Vec<u64>,
    /// Move that led from `keys[i]` to the next position; `None` for a null move.
    moves: Vec<Option<Move>>,
}

impl Position {
    /// The standard starting position.
    pub fn startpos() -> Position {
        Position::from_board(Board::default())
    }

    /// Parse a position from FEN.
    pub fn from_fen(fen: &str) -> Result<Position, PositionError> {
        let board = Board::from_fen(fen.trim(), false).map_err(|err| PositionError::InvalidFen {
            fen: fen.to_string(),
            reason: format!("{err:?}"),
        })?;
        Ok(Position::from_board(board))
    }

    fn from_board(board: Board) -> Position {
        Position {
            board,
            keys: Vec::with_capacity(512),
            moves: Vec::with_capacity(512),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────────────

    /// Zobrist key of the current position.
    #[inline]
    pub fn zobrist_key(&self) -> u64 {
        self.board.hash()
    }

    #[inline]
    pub fn side_to_move(&self) -> Color {
        self.board.side_to_move()
    }

    /// Whether the side to move is in check.
    #[inline]
    pub fn in_check(&self) -> bool {
        !self.board.checkers().is_empty()
    }

    /// Keys of the positions preceding this one, oldest first.
    pub fn history_keys(&self) -> &[u64] {
        &self.keys
    }

    /// The move that produced this position, if it was a real move.
    pub fn last_move(&self) -> Option<Move> {
        self.moves.last().copied().flatten()
    }

    #[inline]
    pub fn halfmove_clock(&self) -> u8 {
        self.board.halfmove_clock()
    }

    #[inline]
    pub fn piece_on(&self, sq: Square) -> Option<Piece> {
        self.board.piece_on(sq)
    }

    #[inline]
    pub fn color_on(&self, sq: Square) -> Option<Color> {
        self.board.color_on(sq)
    }

    #[inline]
    pub fn pieces(&self, piece: Piece) -> BitBoard {
        self.board.pieces(piece)
    }

    #[inline]
    pub fn colors(&self, color: Color) -> BitBoard {
        self.board.colors(color)
    }

    #[inline]
    pub fn colored_pieces(&self, color: Color, piece: Piece) -> BitBoard {
        self.board.colored_pieces(color, piece)
    }

    #[inline]
    pub fn occupied(&self) -> BitBoard {
        self.board.occupied()
    }

    #[inline]
    pub fn king(&self, color: Color) -> Square {
        self.board.king(color)
    }

    /// All pieces of either color attacking `sq`, with sliders seeing through
    /// `occupied` rather than the real occupancy.
    pub fn attackers_to(&self, sq: Square, occupied: BitBoard) -> BitBoard {
        let b = &self.board;
        let diagonal = b.pieces(Piece::Bishop) | b.pieces(Piece::Queen);
        let orthogonal = b.pieces(Piece::Rook) | b.pieces(Piece::Queen);
        (get_knight_moves(sq) & b.pieces(Piece::Knight))
            | (get_king_moves(sq) & b.pieces(Piece::King))
            | (get_bishop_moves(sq, occupied) & diagonal)
            | (get_rook_moves(sq, occupied) & orthogonal)
            | (get_pawn_attacks(sq, Color::White) & b.colored_pieces(Color::Black, Piece::Pawn))
            | (get_pawn_attacks(sq, Color::Black) & b.colored_pieces(Color::White, Piece::Pawn))
    }

    /// The piece `mv` captures, if any (a pawn for en passant).
    pub fn captured_piece(&self, mv: Move) -> Option<Piece> {
        if mv.is_en_passant() {
            return Some(Piece::Pawn);
        }
        if mv.is_castle() {
            return None;
        }
        match self.board.color_on(mv.to()) {
            Some(color) if color != self.board.side_to_move() => self.board.piece_on(mv.to()),
            _ => None,
        }
    }

    #[inline]
    pub fn is_capture(&self, mv: Move) -> bool {
        self.captured_piece(mv).is_some()
    }

    /// Whether playing `mv` leaves the opponent in check.
    pub fn gives_check(&self, mv: Move) -> bool {
        let mut child = self.board.clone();
        child.play_unchecked(mv.to_cozy());
        !child.checkers().is_empty()
    }

    /// Draws that hold regardless of play: the fifty-move rule (unless the
    /// side to move is mated) and insufficient mating material.
    pub fn is_hard_draw(&self) -> bool {
        if self.board.halfmove_clock() >= 100 {
            return !(self.in_check() && !self.has_legal_move());
        }
        self.is_insufficient_material()
    }

    fn is_insufficient_material(&self) -> bool {
        let b = &self.board;
        let heavy = b.pieces(Piece::Pawn) | b.pieces(Piece::Rook) | b.pieces(Piece::Queen);
        if !heavy.is_empty() {
            return false;
        }
        let knights = b.pieces(Piece::Knight);
        let bishops = b.pieces(Piece::Bishop);
        let minors = knights.len() + bishops.len();
        if minors <= 1 {
            return true;
        }
        // KB v KB with both bishops on the same square color.
        if knights.is_empty() && bishops.len() == 2 {
            let white = b.colored_pieces(Color::White, Piece::Bishop);
            let black = b.colored_pieces(Color::Black, Piece::Bishop);
            if white.len() == 1 && black.len() == 1 {
                let dark = bishops & DARK_SQUARES;
                return dark.len() != 1;
            }
        }
        false
    }

    fn has_legal_move(&self) -> bool {
        self.board.generate_moves(|_| true)
    }

    // ── Move generation ──────────────────────────────────────────────────────

    /// Fill `buf` with every legal move and return the count.
    ///
    /// Unless `ignore_draw` is set, a hard-drawn position yields no moves.
    pub fn legal_moves(&self, buf: &mut Vec<Move>, ignore_draw: bool) -> usize {
        buf.clear();
        if !ignore_draw && self.is_hard_draw() {
            return 0;
        }
        let board = &self.board;
        board.generate_moves(|piece_moves| {
            let piece = piece_moves.piece;
            for mv in piece_moves {
                buf.push(classify(board, mv, piece));
            }
            false
        });
        debug_assert!(buf.len() <= MAX_MOVES);
        buf.len()
    }

    /// Whether `mv` is legal here, including its recorded piece and kind.
    pub fn is_legal(&self, mv: Move) -> bool {
        if self.board.piece_on(mv.from()) != Some(mv.piece())
            || !self.board.is_legal(mv.to_cozy())
        {
            return false;
        }
        classify(&self.board, mv.to_cozy(), mv.piece()) == mv
    }

    /// Resolve a UCI move string (`e2e4`, `e1g1`, `a7a8q`) against the legal moves.
    pub fn move_from_uci(&self, uci: &str) -> Result<Move, PositionError> {
        let mut buf = Vec::with_capacity(MAX_MOVES);
        self.legal_moves(&mut buf, true);
        buf.into_iter()
            .find(|mv| mv.to_string() == uci)
            .ok_or_else(|| PositionError::IllegalMove {
                uci: uci.to_string(),
            })
    }

    // ── Make / unmake ────────────────────────────────────────────────────────

    /// Play `mv`, which must be legal in this position.
    pub fn play_move(&mut self, mv: Move) -> Undo {
        let previous = self.board.clone();
        self.keys.push(previous.hash());
        self.moves.push(Some(mv));
        self.board.play_unchecked(mv.to_cozy());
        Undo { board: previous }
    }

    /// Restore the position from before the matching [`play_move`](Self::play_move).
    pub fn undo_move(&mut self, undo: Undo) {
        self.board = undo.board;
        self.keys.pop();
        self.moves.pop();
    }

    /// Pass the turn. Returns `None` when the side to move is in check.
    pub fn play_null_move(&mut self) -> Option<Undo> {
        let passed = self.board.null_move()?;
        let previous = std::mem::replace(&mut self.board, passed);
        self.keys.push(previous.hash());
        self.moves.push(None);
        Some(Undo { board: previous })
    }

    pub fn undo_null_move(&mut self, undo: Undo) {
        self.undo_move(undo);
    }

    /// Play a UCI move permanently, as when replaying a game record.
    pub fn apply_uci(&mut self, uci: &str) -> Result<(), PositionError> {
        let mv = self.move_from_uci(uci)?;
        trace!(%mv, "applying game move");
        let _kept = self.play_move(mv);
        Ok(())
    }
}

/// Lift a generator move into a [`Move`], recognizing castling and en passant.
fn classify(board: &Board, mv: cozy_chess::Move, piece: Piece) -> Move {
    let stm = board.side_to_move();
    if piece == Piece::King && board.color_on(mv.to) == Some(stm) {
        let kingside = (mv.to.file() as usize) > (mv.from.file() as usize);
        let (file, kind) = if kingside {
            (File::G, MoveKind::CastleKingside)
        } else {
            (File::C, MoveKind::CastleQueenside)
        };
        return Move::new(mv.from, Square::new(file, mv.from.rank()), piece, None, kind);
    }
    if piece == Piece::Pawn && mv.from.file() != mv.to.file() && board.piece_on(mv.to).is_none() {
        return Move::new(mv.from, mv.to, piece, None, MoveKind::EnPassant);
    }
    Move::new(mv.from, mv.to, piece, mv.promotion, MoveKind::Normal)
}

impl Default for Position {
    fn default() -> Self {
        Position::startpos()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.board)
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Position")
            .field("fen", &self.board.to_string())
            .field("history", &self.keys.len())
            .finish()
    }
}
