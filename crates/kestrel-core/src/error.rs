//! Error types for position setup and move parsing.

/// Errors raised while building or advancing a [`Position`](crate::Position).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PositionError {
    /// The FEN string could not be parsed into a legal position.
    #[error("invalid FEN \"{fen}\": {reason}")]
    InvalidFen {
        /// The rejected FEN string.
        fen: String,
        /// Parser diagnostic.
        reason: String,
    },

    /// A UCI move string is malformed or not legal in the current position.
    #[error("illegal or malformed move: {uci}")]
    IllegalMove {
        /// The rejected move text.
        uci: String,
    },
}

#[cfg(test)]
mod tests {
    use super::PositionError;

    #[test]
    fn illegal_move_display() {
        let err = PositionError::IllegalMove {
            uci: "e2e5".to_string(),
        };
        assert_eq!(format!("{err}"), "illegal or malformed move: e2e5");
    }
}
