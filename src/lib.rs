//! perfhash - perfect hash function generation for static keyword sets
//!
//! Given a set of distinct keywords, this crate searches for a perfect hash
//! function of the form
//!
//! ```text
//! hash(keyword) = len(keyword)? + sum(asso_values[keyword[i] + alpha_inc[i]] : i in Pos)
//! ```
//!
//! where `Pos` is a small set of byte positions, `alpha_inc` a vector of
//! per-position increments and `asso_values` a table of per-character
//! weights. The resulting parameters map every keyword to a distinct
//! integer in a compact range and are meant to be baked into generated
//! lookup code for constant-time keyword recognition.
//!
//! The search runs in three stages: find byte positions under which the
//! keywords' character tuples differ, find increments that keep the
//! resulting multisets distinct, then find associated values giving
//! collision-free hash sums. Tunables for all three live in [`Options`].
//!
//! # Example
//!
//! ```
//! use perfhash::{generate, Keyword, Options};
//!
//! let keywords = ["if", "else", "for", "while", "return"]
//!     .iter()
//!     .map(Keyword::new)
//!     .collect();
//! let solution = generate(keywords, Options::default())?;
//!
//! let mut hashes: Vec<i32> = solution
//!     .representatives()
//!     .map(|keyword| keyword.hash_value)
//!     .collect();
//! hashes.dedup();
//! assert_eq!(hashes.len(), 5);
//! # Ok::<(), perfhash::Error>(())
//! ```
//!
//! Keywords with identical key signatures are rejected by default; enable
//! [`Options::duplicates`] to collapse them into equivalence classes that
//! share a hash value instead.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod bool_array;
pub mod error;
pub mod hash_table;
pub mod keyword;
pub mod options;
pub mod positions;
pub mod search;

pub use error::{Error, Result};
pub use keyword::{Keyword, KeywordExt};
pub use options::Options;
pub use positions::{Positions, LASTCHAR, MAX_KEY_POS};
pub use search::{Search, Solution};

/// Searches for a perfect hash function over `keywords`.
///
/// # Arguments
/// * `keywords` - The keyword set; byte strings, nonempty and ideally
///   distinct
/// * `options` - Tunables for the three search stages
///
/// # Returns
/// The discovered hash function parameters and the keyword list sorted by
/// hash value
pub fn generate(keywords: Vec<Keyword>, options: Options) -> Result<Solution> {
    Search::new(keywords, options).optimize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reexports() {
        let _ = Options::default();
        let _ = Positions::new();
        assert_eq!(LASTCHAR, -1);
        assert_eq!(MAX_KEY_POS, 255);

        let keyword = Keyword::new("test");
        assert_eq!(keyword.allchars, b"test");
    }
}
