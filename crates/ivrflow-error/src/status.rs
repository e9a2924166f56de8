//! Retry classification for errors

use std::fmt;

/// Whether an error may go away if the same operation is attempted again.
///
/// The compiler itself never retries; the status is a hint for whoever drives
/// a batch (for example, re-running only documents whose rendering failed
/// because the backend was temporarily unavailable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ErrorStatus {
    /// Same input, same failure. Malformed XML, missing modules, bad format names.
    #[default]
    Permanent,

    /// Environmental failure, a later attempt may succeed.
    Temporary,

    /// Was temporary but kept failing; stop retrying.
    Persistent,
}

impl ErrorStatus {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorStatus::Temporary)
    }

    /// Demote a temporary failure after the caller gave up on it.
    pub fn persist(self) -> Self {
        match self {
            ErrorStatus::Temporary => ErrorStatus::Persistent,
            other => other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorStatus::Permanent => "permanent",
            ErrorStatus::Temporary => "temporary",
            ErrorStatus::Persistent => "persistent",
        }
    }
}

impl fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
