//! Error types for tree construction, rendering and regeneration
use thiserror::Error;

/// Problems found while building a node tree or parsing a control command.
///
/// These are raised at construction time, never while a tick is running.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("unknown mode: {0}")]
    UnknownMode(String),

    #[error("unknown color scheme: {0}")]
    UnknownScheme(String),

    #[error("unknown signal: {0}")]
    UnknownSignal(String),

    #[error("unknown fixture kind: {0}")]
    UnknownFixtureKind(String),

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("malformed weights: {0}")]
    MalformedWeights(String),

    #[error("empty candidate set")]
    NoCandidates,

    #[error("fixture group '{0}' is empty")]
    EmptyGroup(String),

    #[error("{node} expects {expected} children, got {got}")]
    ChildCount {
        node: &'static str,
        expected: &'static str,
        got: usize,
    },

    #[error("fixture span {0}..{1} is outside the rig")]
    SpanOutOfRange(usize, usize),

    #[error("split children overlap at fixture {0}")]
    OverlappingSpans(usize),

    #[error("op children leave fixtures {0}..{1} uncovered")]
    UncoveredSpan(usize, usize),

    #[error("node already has a parent or is not part of this tree")]
    ChildUnavailable,

    #[error("unknown content group: {0}")]
    UnknownContentGroup(String),

    #[error("content group '{0}' is empty")]
    EmptyContentGroup(String),
}

/// Failures reported by the renderer collaborator during a tick.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("render target pool exhausted ({0} targets in use)")]
    PoolExhausted(usize),

    #[error("content unavailable: {0}")]
    ContentUnavailable(String),

    #[error("frame size mismatch: expected {expected:?}, got {got:?}")]
    SizeMismatch { expected: (u32, u32), got: (u32, u32) },
}

/// Rejected regeneration requests.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShiftError {
    #[error("shift fraction must be within 0..=1, got {0}")]
    InvalidFraction(f64),
}
