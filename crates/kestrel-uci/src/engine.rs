//! Event-driven UCI engine: a stdin reader, the protocol loop and one search thread.

use std::io::{self, BufRead};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;

use tracing::{debug, info, warn};

use kestrel_core::Position;
use kestrel_engine::{GoParams, SearchConfig, SearchResult, Searcher, TimeBudget};

use crate::command::{Command, MAX_HASH_MB, UciOption, parse_command};
use crate::error::UciError;

/// Stack size of the search thread; recursion runs up to 256 plies deep.
const SEARCH_STACK_BYTES: usize = 16 * 1024 * 1024;

/// Internal engine state: tracks whether the engine is idle, searching, or pondering.
enum EngineState {
    Idle,
    Searching,
    Pondering,
}

/// Events processed by the main engine loop.
enum EngineEvent {
    UciCommand(Result<Command, UciError>),
    SearchDone(SearchDone),
    InputClosed,
}

/// Payload returned by the search thread when it finishes.
struct SearchDone {
    result: SearchResult,
    searcher: Searcher,
}

/// The search being pondered, kept so `ponderhit` can start its clock.
struct PonderInfo {
    go: GoParams,
    position: Position,
}

/// The UCI engine, holding the current game position and the searcher.
///
/// Runs an event-driven loop on the main thread, dispatching searches
/// to a worker thread and processing UCI commands concurrently.
pub struct UciEngine {
    position: Position,
    searcher: Option<Searcher>,
    state: EngineState,
    stop_flag: Arc<AtomicBool>,
    /// Values of the options set so far, used to rebuild a lost searcher.
    hash_mb: usize,
    contempt_cp: i32,
    pondering: Option<PonderInfo>,
    pending_clear_tt: bool,
    /// Pending TT resize (MB) to apply when the search thread returns the searcher.
    pending_resize_tt: Option<usize>,
    pending_contempt: Option<i32>,
}

impl UciEngine {
    /// Create a new engine with the starting position and default configuration.
    pub fn new() -> Self {
        let config = SearchConfig::default();
        Self {
            position: Position::startpos(),
            hash_mb: config.tt_size_mb,
            contempt_cp: config.contempt_cp,
            searcher: Some(Searcher::new(config)),
            state: EngineState::Idle,
            stop_flag: Arc::new(AtomicBool::new(false)),
            pondering: None,
            pending_clear_tt: false,
            pending_resize_tt: None,
            pending_contempt: None,
        }
    }

    /// Run the UCI event loop, reading from stdin until `quit` or input closes.
    pub fn run(mut self) -> Result<(), UciError> {
        let (tx, rx) = mpsc::channel::<EngineEvent>();

        let stdin_tx = tx.clone();
        thread::Builder::new()
            .name("uci-input".to_string())
            .spawn(move || read_input(stdin_tx))?;

        for event in &rx {
            match event {
                EngineEvent::UciCommand(Ok(cmd)) => match cmd {
                    Command::Uci => self.handle_uci(),
                    Command::IsReady => self.handle_isready(),
                    Command::UciNewGame => self.handle_ucinewgame(),
                    Command::Position(position) => self.handle_position(*position),
                    Command::Go(params) => self.handle_go(params, &tx),
                    Command::SetOption(opt) => self.handle_setoption(opt),
                    Command::PonderHit => self.handle_ponderhit(),
                    Command::Stop => self.handle_stop(),
                    Command::Quit => {
                        // Stop any active search and wait for it to finish
                        if !matches!(self.state, EngineState::Idle) {
                            self.handle_stop();
                            for ev in &rx {
                                if let EngineEvent::SearchDone(done) = ev {
                                    self.finish_search(done);
                                    break;
                                }
                            }
                        }
                        break;
                    }
                    Command::Unknown(_) => {}
                },
                EngineEvent::UciCommand(Err(e)) => {
                    warn!(error = %e, "UCI parse error");
                }
                EngineEvent::SearchDone(done) => {
                    self.finish_search(done);
                }
                EngineEvent::InputClosed => break,
            }
        }

        info!("kestrel shutting down");
        Ok(())
    }

    fn handle_uci(&self) {
        println!("id name kestrel");
        println!("id author the kestrel developers");
        println!(
            "option name Hash type spin default {} min 1 max {MAX_HASH_MB}",
            SearchConfig::default().tt_size_mb
        );
        println!("option name Clear Hash type button");
        println!(
            "option name Contempt type spin default {} min -500 max 500",
            SearchConfig::default().contempt_cp
        );
        println!("option name Ponder type check default false");
        println!("uciok");
    }

    fn handle_isready(&self) {
        println!("readyok");
    }

    fn handle_ucinewgame(&mut self) {
        self.position = Position::startpos();
        match self.searcher {
            Some(ref searcher) => searcher.clear_tt(),
            // Search thread owns the searcher, defer until it comes back
            None => self.pending_clear_tt = true,
        }
    }

    fn handle_setoption(&mut self, option: UciOption) {
        debug!(?option, "setoption");
        match option {
            UciOption::Hash(mb) => {
                self.hash_mb = mb;
                match self.searcher {
                    Some(ref mut searcher) => searcher.resize_tt(mb),
                    None => self.pending_resize_tt = Some(mb),
                }
            }
            UciOption::ClearHash => match self.searcher {
                Some(ref searcher) => searcher.clear_tt(),
                None => self.pending_clear_tt = true,
            },
            UciOption::Contempt(cp) => {
                self.contempt_cp = cp;
                match self.searcher {
                    Some(ref mut searcher) => searcher.set_contempt(cp),
                    None => self.pending_contempt = Some(cp),
                }
            }
        }
    }

    fn handle_position(&mut self, position: Position) {
        debug!(fen = %position, "position set");
        self.position = position;
    }

    fn handle_go(&mut self, params: GoParams, tx: &mpsc::Sender<EngineEvent>) {
        if !matches!(self.state, EngineState::Idle) {
            warn!("go received while not idle, ignoring");
            return;
        }
        let Some(mut searcher) = self.searcher.take() else {
            warn!("no searcher available, ignoring go");
            return;
        };

        self.stop_flag = Arc::new(AtomicBool::new(false));
        let cancel = Arc::clone(&self.stop_flag);
        let mut position = self.position.clone();
        let go = params.clone();
        let tx = tx.clone();

        let spawned = thread::Builder::new()
            .name("search".to_string())
            .stack_size(SEARCH_STACK_BYTES)
            .spawn(move || {
                let result = searcher.find_best_move(&mut position, cancel, &go, &mut |line| {
                    println!("{line}");
                });
                let _ = tx.send(EngineEvent::SearchDone(SearchDone { result, searcher }));
            });

        if let Err(e) = spawned {
            warn!(error = %e, "failed to spawn search thread");
            // The closure, and the searcher with it, is gone
            let config = SearchConfig::default()
                .tt_size_mb(self.hash_mb)
                .contempt_cp(self.contempt_cp);
            self.searcher = Some(Searcher::new(config));
            println!("bestmove 0000");
            return;
        }

        if params.ponder {
            self.pondering = Some(PonderInfo {
                go: params,
                position: self.position.clone(),
            });
            self.state = EngineState::Pondering;
        } else {
            self.state = EngineState::Searching;
        }
    }

    /// Switch a ponder search to a normal timed search: the clock starts now,
    /// with the budget the same `go` would have had without `ponder`.
    fn handle_ponderhit(&mut self) {
        if !matches!(self.state, EngineState::Pondering) {
            warn!("ponderhit received while not pondering, ignoring");
            return;
        }
        self.state = EngineState::Searching;
        let Some(ponder) = self.pondering.take() else {
            return;
        };

        let timed = GoParams {
            ponder: false,
            ..ponder.go
        };
        let config = SearchConfig::default();
        let budget = TimeBudget::from_go(&timed, ponder.position.side_to_move(), &config);
        let Some(limit) = budget.limit else {
            return;
        };

        debug!(limit_ms = limit.as_millis() as u64, "ponderhit, clock started");
        let stop = Arc::clone(&self.stop_flag);
        let timer = thread::Builder::new()
            .name("ponder-timer".to_string())
            .spawn(move || {
                thread::sleep(limit);
                stop.store(true, Ordering::Release);
            });
        if let Err(e) = timer {
            warn!(error = %e, "failed to start ponder timer, stopping search");
            self.handle_stop();
        }
    }

    fn handle_stop(&mut self) {
        self.stop_flag.store(true, Ordering::Release);
    }

    fn finish_search(&mut self, done: SearchDone) {
        let mut searcher = done.searcher;

        if let Some(mb) = self.pending_resize_tt.take() {
            // Resize supersedes clear; a fresh allocation is already empty
            searcher.resize_tt(mb);
            self.pending_clear_tt = false;
        } else if self.pending_clear_tt {
            searcher.clear_tt();
            self.pending_clear_tt = false;
        }
        if let Some(cp) = self.pending_contempt.take() {
            searcher.set_contempt(cp);
        }

        self.searcher = Some(searcher);
        self.pondering = None;

        let result = &done.result;
        info!(
            best = ?result.best_move.map(|m| m.to_string()),
            score = result.score,
            depth = result.depth,
            "search complete"
        );
        println!("{}", bestmove_line(result));

        self.state = EngineState::Idle;
    }
}

impl Default for UciEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Forward stdin lines to the engine loop until input closes.
fn read_input(tx: mpsc::Sender<EngineEvent>) {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        match line {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                debug!(cmd = %trimmed, "received UCI command");
                if tx.send(EngineEvent::UciCommand(parse_command(trimmed))).is_err() {
                    return;
                }
            }
            Err(e) => {
                warn!(error = %e, "stdin read failed");
                break;
            }
        }
    }
    let _ = tx.send(EngineEvent::InputClosed);
}

/// `bestmove <move> [ponder <move>]`, or `bestmove 0000` without a legal move.
fn bestmove_line(result: &SearchResult) -> String {
    match (result.best_move, result.ponder_move) {
        (Some(best), Some(ponder)) => format!("bestmove {best} ponder {ponder}"),
        (Some(best), None) => format!("bestmove {best}"),
        (None, _) => "bestmove 0000".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn result(best: Option<&str>, ponder: Option<&str>) -> SearchResult {
        let mut pos = Position::startpos();
        let best = best.map(|uci| pos.move_from_uci(uci).unwrap());
        let ponder = ponder.map(|uci| {
            pos.apply_uci(&best.unwrap().to_string()).unwrap();
            pos.move_from_uci(uci).unwrap()
        });
        SearchResult {
            best_move: best,
            ponder_move: ponder,
            score: 0,
            depth: 1,
            nodes: 1,
            elapsed: Duration::ZERO,
            nps: 0,
            pv: best.into_iter().chain(ponder).collect(),
        }
    }

    #[test]
    fn bestmove_with_ponder() {
        assert_eq!(
            bestmove_line(&result(Some("e2e4"), Some("e7e5"))),
            "bestmove e2e4 ponder e7e5"
        );
    }

    #[test]
    fn bestmove_without_ponder() {
        assert_eq!(bestmove_line(&result(Some("g1f3"), None)), "bestmove g1f3");
    }

    #[test]
    fn bestmove_without_legal_move() {
        assert_eq!(bestmove_line(&result(None, None)), "bestmove 0000");
    }

    #[test]
    fn options_are_deferred_while_searching() {
        let mut engine = UciEngine::new();
        let searcher = engine.searcher.take().unwrap();

        engine.handle_setoption(UciOption::Hash(4));
        engine.handle_setoption(UciOption::ClearHash);
        engine.handle_setoption(UciOption::Contempt(-15));
        assert_eq!(engine.pending_resize_tt, Some(4));
        assert!(engine.pending_clear_tt);
        assert_eq!(engine.pending_contempt, Some(-15));

        engine.finish_search(SearchDone {
            result: result(Some("e2e4"), None),
            searcher,
        });
        let searcher = engine.searcher.as_ref().unwrap();
        assert_eq!(searcher.config().tt_size_mb, 4);
        assert_eq!(searcher.config().contempt_cp, -15);
        assert!(engine.pending_resize_tt.is_none());
        assert!(!engine.pending_clear_tt);
        assert!(matches!(engine.state, EngineState::Idle));
    }

    #[test]
    fn ponderhit_outside_ponder_is_ignored() {
        let mut engine = UciEngine::new();
        engine.handle_ponderhit();
        assert!(matches!(engine.state, EngineState::Idle));
        assert!(!engine.stop_flag.load(Ordering::Acquire));
    }
}
