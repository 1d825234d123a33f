// PERFPREP ERROR TYPES
// ONLY RUN-LEVEL FAILURES ARE ERRORS. PER-STEP FAILURES ARE DATA (toggle::Outcome).

use thiserror::Error;

// THE ONE FAIL-FAST CONDITION: NO RIGHTS, NO WRITES
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("privilege elevation failed: {reason}")]
pub struct ElevationFailed {
    pub reason: String,
}

impl ElevationFailed {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Elevation(#[from] ElevationFailed),

    #[error("unknown profile '{0}' (try `perfprep list`)")]
    UnknownProfile(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
