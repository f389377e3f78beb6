//! Error handling for the hash function search
//!
//! The search core never terminates the process; every fatal condition of
//! the search surfaces as an [`Error`] and the caller decides what to do
//! with it. The CLI maps all of them to a message on stderr and exit code 1.

use thiserror::Error;

fn positions_hint(positions_given: &bool) -> &'static str {
    if *positions_given {
        "try different key positions, a larger size multiple, or allow duplicates"
    } else {
        "try a larger size multiple or allow duplicates"
    }
}

/// Error type for the perfect hash search
#[derive(Debug, Error)]
pub enum Error {
    /// No keywords were supplied at all.
    #[error("no input keywords given")]
    NoKeywords,

    /// An input keyword has length zero. Lookup code cannot distinguish an
    /// empty key, so the search rejects it eagerly.
    #[error("empty input keyword is not allowed; check for len == 0 before calling the generated lookup function")]
    EmptyKeyword,

    /// Distinct keywords produced identical key signatures and duplicate
    /// handling is disabled.
    #[error("{count} input keys have identical key signatures; {}", positions_hint(.positions_given))]
    DuplicateKeys {
        /// Number of keywords spliced into equivalence classes.
        count: usize,
        /// Whether the key positions were user-supplied.
        positions_given: bool,
    },

    /// The final verification pass found two representatives with the same
    /// hash value even though duplicate handling is disabled.
    #[error("internal error, duplicate hash code value {hash}; {}", positions_hint(.positions_given))]
    InternalCollision {
        /// The colliding hash value.
        hash: i32,
        /// Whether the key positions were user-supplied.
        positions_given: bool,
    },

    /// A key position specification could not be parsed.
    #[error("invalid key position specification: {0}")]
    InvalidPositions(String),
}

/// Result type alias for search operations
pub type Result<T> = std::result::Result<T, Error>;
