//! Position and move types for kestrel, backed by `cozy-chess` move generation.

mod chess_move;
mod error;
mod perft;
mod position;

pub use chess_move::{Move, MoveKind};
pub use cozy_chess::{BitBoard, Color, File, Piece, Rank, Square};
pub use error::PositionError;
pub use perft::perft;
pub use position::{Position, STARTING_FEN, Undo};

/// Upper bound on the number of legal moves in any chess position.
pub const MAX_MOVES: usize = 256;
