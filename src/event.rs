//! Heap events as reported by an allocator shim
//!
//! An event is one state change of the heap: an allocation, a free, or a
//! resize. Individual allocations have no identity here, only sizes.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::LedgerError;

/// Kind of heap state change
///
/// Closed set: a value of this type is always a valid kind. Untyped codes
/// coming from outside the crate go through [`EventKind::from_code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum EventKind {
    /// Plain allocation (`malloc`-style)
    Allocate,
    /// Free of a previously reported allocation
    Free,
    /// Resize of an existing allocation (`realloc`-style)
    Resize,
    /// Zero-initialised allocation (`calloc`-style); accounted like `Allocate`
    AllocateZeroed,
}

impl EventKind {
    /// Every kind, in raw code order
    pub const ALL: [EventKind; 4] = [
        EventKind::Allocate,
        EventKind::Free,
        EventKind::Resize,
        EventKind::AllocateZeroed,
    ];

    /// Raw code of this kind
    ///
    /// 0 = allocate, 1 = free, 2 = resize, 3 = zeroed allocate.
    pub fn code(self) -> u32 {
        match self {
            EventKind::Allocate => 0,
            EventKind::Free => 1,
            EventKind::Resize => 2,
            EventKind::AllocateZeroed => 3,
        }
    }

    /// Decode a raw event code
    pub fn from_code(code: u32) -> Result<Self, LedgerError> {
        match code {
            0 => Ok(EventKind::Allocate),
            1 => Ok(EventKind::Free),
            2 => Ok(EventKind::Resize),
            3 => Ok(EventKind::AllocateZeroed),
            other => Err(LedgerError::InvalidEventKind(other)),
        }
    }

    /// Short lowercase name, as accepted in traces
    pub fn name(self) -> &'static str {
        match self {
            EventKind::Allocate => "alloc",
            EventKind::Free => "free",
            EventKind::Resize => "realloc",
            EventKind::AllocateZeroed => "calloc",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a trace token names no known event kind
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseKindError {
    /// Token was numeric but outside the defined codes
    #[error("unknown event code {0}")]
    UnknownCode(u32),

    /// Token was not a recognised name
    #[error("unknown event kind '{0}'")]
    UnknownName(String),
}

impl FromStr for EventKind {
    type Err = ParseKindError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        if let Ok(code) = token.parse::<u32>() {
            return EventKind::from_code(code).map_err(|_| ParseKindError::UnknownCode(code));
        }

        match token.to_ascii_lowercase().as_str() {
            "alloc" | "malloc" | "allocate" => Ok(EventKind::Allocate),
            "calloc" | "alloc_zeroed" | "zalloc" => Ok(EventKind::AllocateZeroed),
            "free" | "dealloc" => Ok(EventKind::Free),
            "realloc" | "resize" => Ok(EventKind::Resize),
            _ => Err(ParseKindError::UnknownName(token.to_string())),
        }
    }
}

/// One reported heap event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct HeapEvent {
    /// What happened
    pub kind: EventKind,
    /// Allocated size, freed size, or post-resize size
    pub new_size: u64,
    /// Pre-resize size; 0 for every other kind
    pub old_size: u64,
}

impl HeapEvent {
    /// Allocation of `size` bytes
    pub fn allocate(size: u64) -> Self {
        Self {
            kind: EventKind::Allocate,
            new_size: size,
            old_size: 0,
        }
    }

    /// Zero-initialised allocation of `size` bytes
    pub fn allocate_zeroed(size: u64) -> Self {
        Self {
            kind: EventKind::AllocateZeroed,
            new_size: size,
            old_size: 0,
        }
    }

    /// Free of `size` bytes
    pub fn free(size: u64) -> Self {
        Self {
            kind: EventKind::Free,
            new_size: size,
            old_size: 0,
        }
    }

    /// Resize from `old_size` to `new_size` bytes
    pub fn resize(old_size: u64, new_size: u64) -> Self {
        Self {
            kind: EventKind::Resize,
            new_size,
            old_size,
        }
    }

    /// Signed change in live bytes this event causes
    pub fn delta(&self) -> i128 {
        match self.kind {
            EventKind::Allocate | EventKind::AllocateZeroed => self.new_size as i128,
            EventKind::Free => -(self.new_size as i128),
            EventKind::Resize => self.new_size as i128 - self.old_size as i128,
        }
    }
}

/// Why a trace line could not be turned into an event
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LineError {
    /// The kind token was not recognised
    #[error(transparent)]
    Kind(#[from] ParseKindError),

    /// Anything else wrong with the line's shape or numbers
    #[error("{0}")]
    Malformed(String),
}

/// Parse one trace line: `<kind> <new_size> [<old_size>]`
///
/// Returns `Ok(None)` for blank lines and `#` comments.
pub fn parse_line(line: &str) -> Result<Option<HeapEvent>, LineError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut fields = line.split_whitespace();
    let kind_token = fields
        .next()
        .ok_or_else(|| LineError::Malformed("missing event kind".to_string()))?;
    let size_token = fields
        .next()
        .ok_or_else(|| LineError::Malformed("missing size".to_string()))?;
    let old_token = fields.next();
    if let Some(extra) = fields.next() {
        return Err(LineError::Malformed(format!("unexpected field '{}'", extra)));
    }

    let kind = kind_token.parse::<EventKind>()?;
    let new_size = parse_size(size_token)?;
    let old_size = match old_token {
        Some(token) => parse_size(token)?,
        None if kind == EventKind::Resize => {
            return Err(LineError::Malformed("resize needs an old size".to_string()))
        }
        None => 0,
    };

    if kind != EventKind::Resize && old_size != 0 {
        return Err(LineError::Malformed(format!(
            "old size {} only applies to resize",
            old_size
        )));
    }

    Ok(Some(HeapEvent {
        kind,
        new_size,
        old_size,
    }))
}

fn parse_size(token: &str) -> Result<u64, LineError> {
    token
        .parse::<u64>()
        .map_err(|_| LineError::Malformed(format!("invalid size '{}'", token)))
}
