use std::{io, path::PathBuf};

use thiserror::Error;

/// Errors surfaced by module loading, track building and directory browsing.
#[derive(Debug, Error)]
pub enum Error {
    #[error("not enough memory")]
    OutOfMemory,
    #[error("invalid module: {0}")]
    InvalidModule(String),
    #[error("cannot list {}: {source}", path.display())]
    InvalidPath {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// The fixed message shown to the player when playing a module fails.
    pub fn user_message(&self) -> &'static str {
        match self {
            Error::OutOfMemory => "NOT ENOUGH MEMORY",
            Error::InvalidModule(_) | Error::Io(_) => "INVALID MOD FILE",
            Error::InvalidPath { .. } => "INVALID PATH",
        }
    }
}

impl From<std::collections::TryReserveError> for Error {
    fn from(_: std::collections::TryReserveError) -> Self {
        Error::OutOfMemory
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages() {
        assert_eq!(Error::OutOfMemory.user_message(), "NOT ENOUGH MEMORY");
        assert_eq!(
            Error::InvalidModule("bad tracker id".into()).user_message(),
            "INVALID MOD FILE"
        );
    }

    #[test]
    fn test_reserve_failure_is_oom() {
        let mut v: Vec<u64> = Vec::new();
        let err: Error = v.try_reserve(usize::MAX).unwrap_err().into();
        assert!(matches!(err, Error::OutOfMemory));
    }
}
