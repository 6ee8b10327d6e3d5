//! Error types for the tables in this crate.

use thiserror::Error;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

/// Failure outcomes shared by every table.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The key (or key pair) is not present.
    #[error("key not found")]
    NotFound,

    /// No slot is available and the table cannot grow any further.
    ///
    /// The table is left exactly as it was before the failed insert.
    #[error("table is full")]
    Full,

    /// A size sequence or alphabet was rejected at construction.
    #[error("invalid table configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Create an invalid configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Error::InvalidConfig(msg.into())
    }

    /// Whether this is [`Error::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound)
    }
}

/// Abort on a broken structural invariant.
///
/// Reaching this means the probing or collapsing logic has a defect; carrying
/// on would silently corrupt the table.
#[cold]
#[track_caller]
pub(crate) fn invariant_violation(what: &str) -> ! {
    log::error!("table invariant violated: {what}");
    panic!("table invariant violated: {what}");
}
