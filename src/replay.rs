//! Trace replay
//!
//! Feeds a text trace of heap events through a fresh ledger. One event per
//! line: `<kind> <new_size> [<old_size>]`, where `kind` is a name
//! (`alloc`, `calloc`, `free`, `realloc`) or a raw code.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use thiserror::Error;

use crate::event::{parse_line, LineError, ParseKindError};
use crate::ledger::{Ledger, Snapshot};
use crate::LedgerError;

/// Replay settings
#[derive(Debug, Clone, Default)]
pub struct ReplayConfig {
    /// Abort on the first invalid event kind instead of skipping it
    pub strict: bool,

    /// Keep a live-bytes sample for every accepted event
    pub record_timeline: bool,
}

impl ReplayConfig {
    /// Strict replay, no timeline
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }
}

/// Errors that can occur while replaying a trace
#[derive(Error, Debug)]
pub enum ReplayError {
    /// Reading the trace failed
    #[error("failed to read trace: {0}")]
    Io(#[from] std::io::Error),

    /// A line could not be parsed
    #[error("line {line}: {reason}")]
    Parse {
        /// 1-based line number
        line: usize,
        /// What was wrong with it
        reason: String,
    },

    /// The ledger rejected an event
    #[error("line {line}: {source}")]
    Ledger {
        /// 1-based line number
        line: usize,
        /// Ledger error
        #[source]
        source: LedgerError,
    },
}

/// Live bytes after each accepted event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timeline {
    samples: Vec<(u64, u64)>, // (event_index, current_live)
}

impl Timeline {
    fn push(&mut self, snapshot: &Snapshot) {
        self.samples.push((snapshot.event_count, snapshot.current_live));
    }

    /// All `(event_index, current_live)` samples, event index 1-based
    pub fn samples(&self) -> &[(u64, u64)] {
        &self.samples
    }

    /// First sample at the highest live value
    pub fn peak(&self) -> Option<(u64, u64)> {
        self.samples
            .iter()
            .copied()
            .reduce(|best, sample| if sample.1 > best.1 { sample } else { best })
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether no events were accepted
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Result of a replay
#[derive(Debug, Clone)]
pub struct ReplayOutcome {
    /// Final ledger totals
    pub snapshot: Snapshot,
    /// Events skipped for an invalid kind (lenient mode only)
    pub rejected: usize,
    /// Per-event samples, if requested
    pub timeline: Option<Timeline>,
}

/// Replays traces through a ledger
#[derive(Debug, Clone, Default)]
pub struct Replayer {
    config: ReplayConfig,
}

impl Replayer {
    /// Create a replayer
    pub fn new(config: ReplayConfig) -> Self {
        Self { config }
    }

    /// Replay a trace file
    pub fn replay_file(&self, path: impl AsRef<Path>) -> Result<ReplayOutcome, ReplayError> {
        let file = File::open(path.as_ref())?;
        self.replay_reader(BufReader::new(file))
    }

    /// Replay an in-memory trace
    pub fn replay_str(&self, trace: &str) -> Result<ReplayOutcome, ReplayError> {
        self.replay_reader(trace.as_bytes())
    }

    /// Replay from any buffered reader
    pub fn replay_reader(&self, reader: impl BufRead) -> Result<ReplayOutcome, ReplayError> {
        let mut ledger = Ledger::active();
        let mut timeline = self.config.record_timeline.then(Timeline::default);
        let mut rejected = 0;

        for (idx, line) in reader.lines().enumerate() {
            let line_no = idx + 1;
            let line = line?;

            let event = match parse_line(&line) {
                Ok(Some(event)) => event,
                Ok(None) => continue,
                Err(LineError::Kind(ParseKindError::UnknownCode(code))) => {
                    let err = LedgerError::InvalidEventKind(code);
                    if self.config.strict {
                        return Err(ReplayError::Ledger { line: line_no, source: err });
                    }
                    tracing::warn!(line = line_no, code, "skipping event: {}", err);
                    rejected += 1;
                    continue;
                }
                Err(LineError::Kind(err @ ParseKindError::UnknownName(_))) => {
                    if self.config.strict {
                        return Err(ReplayError::Parse {
                            line: line_no,
                            reason: err.to_string(),
                        });
                    }
                    tracing::warn!(line = line_no, "skipping event: {}", err);
                    rejected += 1;
                    continue;
                }
                Err(LineError::Malformed(reason)) => {
                    return Err(ReplayError::Parse { line: line_no, reason });
                }
            };

            ledger
                .record(event)
                .map_err(|source| ReplayError::Ledger { line: line_no, source })?;

            if let Some(timeline) = timeline.as_mut() {
                let snapshot = ledger
                    .report()
                    .map_err(|source| ReplayError::Ledger { line: line_no, source })?;
                timeline.push(&snapshot);
            }
        }

        let snapshot = ledger
            .report()
            .map_err(|source| ReplayError::Ledger { line: 0, source })?;
        tracing::debug!(
            events = snapshot.event_count,
            rejected,
            max_live = snapshot.max_live,
            "trace replayed"
        );

        Ok(ReplayOutcome {
            snapshot,
            rejected,
            timeline,
        })
    }
}
