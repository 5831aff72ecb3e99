use std::io;
use thiserror::Error;

/// Failures raised by a [`HistoryStore`](crate::core::history::HistoryStore) provider.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("git {command} failed: {stderr}")]
    Git { command: String, stderr: String },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Object {id} is not a {expected}")]
    WrongKind { id: String, expected: &'static str },
    #[error("Reference already exists: {0}")]
    RefExists(String),
    #[error("Corrupt object {id}: {reason}")]
    Corrupt { id: String, reason: String },
}

/// Failures that abort a puzzle build. There is no partial success: the caller
/// discards whatever was written to the target before retrying.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Directory {0} isn't empty, pass --force to override it")]
    TargetNotEmpty(String),
    #[error("Streets hold {capacity} houses but {residents} canonical residents need one")]
    NotEnoughHouses { capacity: usize, residents: usize },
    #[error("Ran out of unique filler names")]
    NamePoolExhausted,
    #[error("No {0} to pick from")]
    EmptyPool(&'static str),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Invalid seed: {0}")]
    InvalidSeed(String),
}

/// Failed verification step. Terminal: the first failing check is reported.
#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("Structural check failed: {0}")]
    Structural(String),
    #[error("{check}: expected {expected} result(s), found {actual}")]
    Cardinality {
        check: String,
        expected: usize,
        actual: usize,
    },
    #[error("Suspect {0} has no address")]
    AddressLookup(String),
    #[error("Expected exactly one remaining suspect, found: {}", .0.join(", "))]
    AmbiguousSolution(Vec<String>),
    #[error("Solution tag holds {actual}, the culprit hashes to {expected}")]
    SolutionMismatch { expected: String, actual: String },
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl VerifyError {
    /// Stable name of the failed check.
    pub fn check_name(&self) -> &'static str {
        match self {
            VerifyError::Structural(_) => "structural",
            VerifyError::Cardinality { .. } => "cardinality",
            VerifyError::AddressLookup(_) => "address-lookup",
            VerifyError::AmbiguousSolution(_) => "ambiguous-solution",
            VerifyError::SolutionMismatch { .. } => "solution-mismatch",
            VerifyError::Store(_) => "store",
        }
    }
}

/// Anything the command line surface can fail with.
#[derive(Error, Debug)]
pub enum GitsteryError {
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Verify(#[from] VerifyError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
