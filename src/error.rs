use thiserror::Error;

/// Crate-wide error taxonomy.
///
/// Component boundaries translate low-level transport/storage errors into one of
/// these variants; public entry points collapse them further into
/// {ok, input error, state error, timeout, internal}.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input: missing operation definition, unknown machine id, negative
    /// quantity. Recoverable — callers fall back to defaults or skip with a
    /// diagnostic, they never abort a whole scheduling run because of this variant.
    #[error("input error: {0}")]
    Input(String),

    /// Invariant violation, e.g. logging more than the required quantity. Surfaced
    /// to the caller; nothing is persisted.
    #[error("state error: {0}")]
    State(String),

    /// Device timeout or a transient store error. Retried with bounded backoff by
    /// the caller; for the status engine this is treated as OFF.
    #[error("transient I/O error: {0}")]
    TransientIo(String),

    /// Persistent unavailability after the retry budget is exhausted. The affected
    /// task must stop and be restarted externally.
    #[error("fatal I/O error: {0}")]
    FatalIo(String),

    /// A request or transaction exceeded its deadline.
    #[error("operation timed out")]
    Timeout,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// The five user-visible outcomes a CLI/API boundary may report, per the error
/// handling design's propagation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    InputError,
    StateError,
    Timeout,
    Internal,
}

impl Error {
    pub fn outcome(&self) -> Outcome {
        match self {
            Error::Input(_) => Outcome::InputError,
            Error::State(_) => Outcome::StateError,
            Error::Timeout => Outcome::Timeout,
            Error::TransientIo(_) | Error::FatalIo(_) | Error::Io(_) | Error::Json(_) => Outcome::Internal,
        }
    }
}
