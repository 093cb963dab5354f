pub mod sqlite;

use crate::core::PersistenceError;
use std::fmt;

pub use sqlite::{SqliteQuoteStore, StoredQuoteRow};

/// Result of the best-effort write, consumed only for logging.
///
/// Kept apart from the request's own `Result` so a storage problem has no way
/// into the response.
#[derive(Debug)]
pub enum PersistOutcome {
    Written,
    Failed(PersistenceError),
}

impl PersistOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, PersistOutcome::Written)
    }
}

impl From<Result<(), PersistenceError>> for PersistOutcome {
    fn from(result: Result<(), PersistenceError>) -> Self {
        match result {
            Ok(()) => PersistOutcome::Written,
            Err(e) => PersistOutcome::Failed(e),
        }
    }
}

impl fmt::Display for PersistOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistOutcome::Written => write!(f, "written"),
            PersistOutcome::Failed(e) => write!(f, "failed: {e}"),
        }
    }
}
