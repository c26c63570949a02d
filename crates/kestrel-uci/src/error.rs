//! UCI protocol errors.

use kestrel_core::PositionError;

/// Errors that can occur during UCI protocol handling.
#[derive(Debug, thiserror::Error)]
pub enum UciError {
    /// The `position` command is missing `startpos` or `fen` keyword.
    #[error("malformed position command: missing startpos or fen keyword")]
    MalformedPosition,

    /// Failed to parse a FEN string.
    #[error("invalid FEN: {source}")]
    InvalidFen {
        #[source]
        source: PositionError,
    },

    /// A move in the `position` command is malformed or illegal.
    #[error("invalid move: {uci_move}")]
    InvalidMove {
        /// The UCI move string that was rejected.
        uci_move: String,
    },

    /// A `go` parameter was given without its value.
    #[error("missing value for go parameter {param}")]
    MissingGoValue { param: String },

    /// A `go` parameter value could not be parsed.
    #[error("invalid value for go parameter {param}: {value}")]
    InvalidGoValue { param: String, value: String },

    /// `setoption` without a `name` clause.
    #[error("malformed setoption command")]
    MalformedSetOption,

    /// `setoption` for an option this engine does not expose.
    #[error("unknown option: {name}")]
    UnknownOption { name: String },

    /// An option value is missing, unparseable or out of range.
    #[error("invalid value for option {name}: {value}")]
    InvalidOptionValue { name: String, value: String },

    /// An I/O error occurred while reading from stdin.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}
