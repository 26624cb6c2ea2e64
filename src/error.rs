use std::io;
use thiserror::Error;

/// type alias for all operations on a [`Store`](crate::Store) that could fail
pub type Result<T> = std::result::Result<T, StoreError>;

/// Error variants used throughout the store.
/// It wraps any lower level errors from third party crates
#[derive(Error)]
pub enum StoreError {
    /// variant for errors caused by std::io
    #[error("IO error")]
    Io {
        /// source of the IO Error
        #[from]
        source: io::Error,
    },

    /// variant for a shard file whose contents do not parse as records
    #[error("shard file corrupt: {}", .0)]
    Corrupt(String),

    /// variant for invalid arguments, such as oversized keys or values
    #[error("{}", .0)]
    InvalidInput(String),

    /// variant for errors when parsing strings to some other type
    #[error("{}", .0)]
    Parsing(String),

    /// variant for a poisoned shard lock
    #[error("lock poisoned: {}", .0)]
    Lock(String),

    /// variant for wire protocol errors reported by or to a peer
    #[error("{}", .0)]
    Protocol(String),
}

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        StoreError::Lock(err.to_string())
    }
}

/// a custom Debug implementation that will write the entire error chain
impl std::fmt::Debug for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// writes the entire error chain of the given error `e`, to the formatter.
fn error_chain_fmt(
    e: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f, "{}\n", e)?;
    let mut current = e.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by: {}", cause)?;
        current = cause.source();
    }
    Ok(())
}
