//! UCI command parsing.

use std::time::Duration;

use kestrel_core::Position;
use kestrel_engine::GoParams;

use crate::error::UciError;

/// Largest transposition table accepted through `setoption name Hash`.
pub const MAX_HASH_MB: usize = 65_536;
/// Contempt accepted through `setoption name Contempt`, in centipawns.
pub const CONTEMPT_RANGE: std::ops::RangeInclusive<i32> = -500..=500;

/// A parsed UCI command.
#[derive(Debug)]
pub enum Command {
    /// `uci` -- identify the engine.
    Uci,
    /// `isready` -- synchronization ping.
    IsReady,
    /// `ucinewgame` -- reset engine state.
    UciNewGame,
    /// `position` -- a position with its game moves already applied.
    Position(Box<Position>),
    /// `go` -- start searching with given parameters.
    Go(GoParams),
    /// `setoption` -- change an engine option.
    SetOption(UciOption),
    /// `ponderhit` -- opponent played the expected move during pondering.
    PonderHit,
    /// `stop` -- halt the current search.
    Stop,
    /// `quit` -- exit the engine.
    Quit,
    /// Unrecognized command (silently ignored per UCI convention).
    Unknown(String),
}

/// Options settable through `setoption`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UciOption {
    /// Transposition table size in megabytes.
    Hash(usize),
    /// The `Clear Hash` button.
    ClearHash,
    /// Draw contempt in centipawns.
    Contempt(i32),
}

/// Parse a single line of UCI input into a [`Command`].
pub fn parse_command(line: &str) -> Result<Command, UciError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let Some((&head, args)) = tokens.split_first() else {
        return Ok(Command::Unknown(String::new()));
    };

    match head {
        "uci" => Ok(Command::Uci),
        "isready" => Ok(Command::IsReady),
        "ucinewgame" => Ok(Command::UciNewGame),
        "stop" => Ok(Command::Stop),
        "quit" => Ok(Command::Quit),
        "ponderhit" => Ok(Command::PonderHit),
        "position" => parse_position(args),
        "go" => parse_go(args),
        "setoption" => parse_setoption(args),
        _ => Ok(Command::Unknown(head.to_string())),
    }
}

/// Parse the `position` command arguments.
///
/// Supports:
/// - `position startpos [moves e2e4 d7d5 ...]`
/// - `position fen <fen-string> [moves e2e4 d7d5 ...]`
///
/// Each game move is played on the position, so the returned position
/// carries the key history that repetition detection needs.
fn parse_position(tokens: &[&str]) -> Result<Command, UciError> {
    let moves_at = tokens.iter().position(|&t| t == "moves");
    let (setup, moves) = match moves_at {
        Some(i) => (&tokens[..i], &tokens[i + 1..]),
        None => (tokens, &[][..]),
    };

    let mut position = match setup.split_first() {
        Some((&"startpos", _)) => Position::startpos(),
        Some((&"fen", fields)) if !fields.is_empty() => {
            Position::from_fen(&fields.join(" ")).map_err(|source| UciError::InvalidFen { source })?
        }
        _ => return Err(UciError::MalformedPosition),
    };

    for &uci_move in moves {
        position
            .apply_uci(uci_move)
            .map_err(|_| UciError::InvalidMove {
                uci_move: uci_move.to_string(),
            })?;
    }

    Ok(Command::Position(Box::new(position)))
}

/// Parse the `go` command arguments.
///
/// Supports: wtime, btime, winc, binc, movestogo, depth, movetime,
/// nodes, mate, infinite, ponder. Unknown tokens are silently skipped.
fn parse_go(tokens: &[&str]) -> Result<Command, UciError> {
    let mut params = GoParams::default();

    let mut i = 0;
    while i < tokens.len() {
        let value = tokens.get(i + 1).copied();
        match tokens[i] {
            "wtime" => params.wtime = Some(parse_millis(value, "wtime")?),
            "btime" => params.btime = Some(parse_millis(value, "btime")?),
            "winc" => params.winc = Some(parse_millis(value, "winc")?),
            "binc" => params.binc = Some(parse_millis(value, "binc")?),
            "movestogo" => params.movestogo = Some(parse_int(value, "movestogo")?),
            "depth" => params.depth = Some(parse_int(value, "depth")?),
            "movetime" => params.movetime = Some(parse_millis(value, "movetime")?),
            "nodes" => params.nodes = Some(parse_int(value, "nodes")?),
            "mate" => params.mate = Some(parse_int(value, "mate")?),
            "infinite" => {
                params.infinite = true;
                i += 1;
                continue;
            }
            "ponder" => {
                params.ponder = true;
                i += 1;
                continue;
            }
            _ => {
                // Unknown token (e.g. searchmoves) -- skip
                i += 1;
                continue;
            }
        }
        i += 2;
    }

    Ok(Command::Go(params))
}

/// Parse `setoption name <name> [value <value>]`. Option names are
/// case-insensitive and may contain spaces.
fn parse_setoption(tokens: &[&str]) -> Result<Command, UciError> {
    let Some((&"name", rest)) = tokens.split_first() else {
        return Err(UciError::MalformedSetOption);
    };
    let value_at = rest.iter().position(|t| t.eq_ignore_ascii_case("value"));
    let (name, value) = match value_at {
        Some(i) => (rest[..i].join(" "), rest[i + 1..].join(" ")),
        None => (rest.join(" "), String::new()),
    };

    let option = match name.to_ascii_lowercase().as_str() {
        "hash" => {
            let mb: usize = parse_option(&name, &value)?;
            if !(1..=MAX_HASH_MB).contains(&mb) {
                return Err(invalid_option(&name, &value));
            }
            UciOption::Hash(mb)
        }
        "clear hash" => UciOption::ClearHash,
        "contempt" => {
            let cp: i32 = parse_option(&name, &value)?;
            if !CONTEMPT_RANGE.contains(&cp) {
                return Err(invalid_option(&name, &value));
            }
            UciOption::Contempt(cp)
        }
        _ => return Err(UciError::UnknownOption { name }),
    };

    Ok(Command::SetOption(option))
}

fn parse_option<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, UciError> {
    value.trim().parse().map_err(|_| invalid_option(name, value))
}

fn invalid_option(name: &str, value: &str) -> UciError {
    UciError::InvalidOptionValue {
        name: name.to_string(),
        value: value.to_string(),
    }
}

/// Parse a millisecond value from a token.
fn parse_millis(token: Option<&str>, param: &str) -> Result<Duration, UciError> {
    // Some GUIs send negative clocks when flagging; treat them as zero.
    let ms: i64 = parse_int(token, param)?;
    Ok(Duration::from_millis(ms.max(0) as u64))
}

/// Parse an integer value from a token.
fn parse_int<T: std::str::FromStr>(token: Option<&str>, param: &str) -> Result<T, UciError> {
    let value = token.ok_or_else(|| UciError::MissingGoValue {
        param: param.to_string(),
    })?;
    value.parse().map_err(|_| UciError::InvalidGoValue {
        param: param.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn go(line: &str) -> GoParams {
        match parse_command(line).unwrap() {
            Command::Go(params) => params,
            other => panic!("expected Go, got {other:?}"),
        }
    }

    fn position(line: &str) -> Position {
        match parse_command(line).unwrap() {
            Command::Position(pos) => *pos,
            other => panic!("expected Position, got {other:?}"),
        }
    }

    fn option(line: &str) -> UciOption {
        match parse_command(line).unwrap() {
            Command::SetOption(opt) => opt,
            other => panic!("expected SetOption, got {other:?}"),
        }
    }

    #[test]
    fn parse_simple_commands() {
        assert!(matches!(parse_command("uci").unwrap(), Command::Uci));
        assert!(matches!(parse_command("isready").unwrap(), Command::IsReady));
        assert!(matches!(parse_command("ucinewgame").unwrap(), Command::UciNewGame));
        assert!(matches!(parse_command("stop").unwrap(), Command::Stop));
        assert!(matches!(parse_command("quit").unwrap(), Command::Quit));
        assert!(matches!(parse_command("ponderhit").unwrap(), Command::PonderHit));
    }

    #[test]
    fn parse_position_startpos() {
        assert_eq!(
            position("position startpos").zobrist_key(),
            Position::startpos().zobrist_key()
        );
    }

    #[test]
    fn parse_position_startpos_with_moves() {
        let pos = position("position startpos moves e2e4 e7e5 g1f3");
        let mut expected = Position::startpos();
        for mv in ["e2e4", "e7e5", "g1f3"] {
            expected.apply_uci(mv).unwrap();
        }
        assert_eq!(pos.zobrist_key(), expected.zobrist_key());
        assert_eq!(pos.history_keys().len(), 3);
        assert_eq!(pos.last_move().map(|m| m.to_string()).as_deref(), Some("g1f3"));
    }

    #[test]
    fn parse_position_fen() {
        let pos = position(
            "position fen rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1",
        );
        assert_eq!(pos.side_to_move(), kestrel_core::Color::Black);
    }

    #[test]
    fn parse_position_fen_with_moves() {
        let pos = position("position fen 4k3/8/8/8/8/8/4P3/4K3 w - - 0 1 moves e2e4 e8d7");
        assert_eq!(pos.history_keys().len(), 2);
        assert_eq!(pos.side_to_move(), kestrel_core::Color::White);
    }

    #[test]
    fn parse_position_errors() {
        assert!(matches!(
            parse_command("position"),
            Err(UciError::MalformedPosition)
        ));
        assert!(matches!(
            parse_command("position fen"),
            Err(UciError::MalformedPosition)
        ));
        assert!(matches!(
            parse_command("position fen invalid"),
            Err(UciError::InvalidFen { .. })
        ));
        assert!(matches!(
            parse_command("position startpos moves e2e5"),
            Err(UciError::InvalidMove { .. })
        ));
    }

    #[test]
    fn parse_go_bare_defaults() {
        assert_eq!(go("go"), GoParams::default());
    }

    #[test]
    fn parse_go_depth() {
        assert_eq!(go("go depth 6").depth, Some(6));
    }

    #[test]
    fn parse_go_clock() {
        let params = go("go wtime 300000 btime 290000 winc 2000 binc 1000 movestogo 20");
        assert_eq!(params.wtime, Some(Duration::from_millis(300_000)));
        assert_eq!(params.btime, Some(Duration::from_millis(290_000)));
        assert_eq!(params.winc, Some(Duration::from_millis(2_000)));
        assert_eq!(params.binc, Some(Duration::from_millis(1_000)));
        assert_eq!(params.movestogo, Some(20));
    }

    #[test]
    fn parse_go_negative_clock_is_zero() {
        assert_eq!(go("go wtime -50 btime 1000").wtime, Some(Duration::ZERO));
    }

    #[test]
    fn parse_go_limits() {
        assert_eq!(go("go movetime 5000").movetime, Some(Duration::from_millis(5000)));
        assert_eq!(go("go nodes 1000000").nodes, Some(1_000_000));
        assert_eq!(go("go mate 3").mate, Some(3));
        assert!(go("go infinite").infinite);
    }

    #[test]
    fn parse_go_ponder_with_time() {
        let params = go("go ponder wtime 300000 btime 300000");
        assert!(params.ponder);
        assert_eq!(params.wtime, Some(Duration::from_millis(300_000)));
    }

    #[test]
    fn parse_go_skips_unknown_tokens() {
        let params = go("go searchmoves e2e4 depth 3");
        assert_eq!(params.depth, Some(3));
    }

    #[test]
    fn parse_go_bad_values() {
        assert!(matches!(
            parse_command("go wtime"),
            Err(UciError::MissingGoValue { .. })
        ));
        assert!(matches!(
            parse_command("go depth abc"),
            Err(UciError::InvalidGoValue { .. })
        ));
    }

    #[test]
    fn parse_setoption_hash() {
        assert_eq!(option("setoption name Hash value 64"), UciOption::Hash(64));
        assert_eq!(option("setoption name hash value 1"), UciOption::Hash(1));
    }

    #[test]
    fn parse_setoption_clear_hash() {
        assert_eq!(option("setoption name Clear Hash"), UciOption::ClearHash);
    }

    #[test]
    fn parse_setoption_contempt() {
        assert_eq!(option("setoption name Contempt value -35"), UciOption::Contempt(-35));
    }

    #[test]
    fn parse_setoption_errors() {
        assert!(matches!(
            parse_command("setoption Hash 16"),
            Err(UciError::MalformedSetOption)
        ));
        assert!(matches!(
            parse_command("setoption name Threads value 4"),
            Err(UciError::UnknownOption { .. })
        ));
        assert!(matches!(
            parse_command("setoption name Hash value 0"),
            Err(UciError::InvalidOptionValue { .. })
        ));
        assert!(matches!(
            parse_command("setoption name Contempt value 900"),
            Err(UciError::InvalidOptionValue { .. })
        ));
        assert!(matches!(
            parse_command("setoption name Hash value lots"),
            Err(UciError::InvalidOptionValue { .. })
        ));
    }

    #[test]
    fn parse_unknown_and_empty() {
        assert!(matches!(parse_command("foobar").unwrap(), Command::Unknown(_)));
        assert!(matches!(parse_command("   ").unwrap(), Command::Unknown(_)));
    }
}
