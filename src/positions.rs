//! Byte position sets
//!
//! A generated hash function inspects each keyword at a small set of byte
//! positions. This module stores such a set sorted in descending order;
//! the special last-character position sorts below every fixed position and
//! therefore comes last during iteration. Stage 2 of the search depends on
//! that ordering when it maps positions to alpha increment indices.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Denotes the last byte of a keyword, whatever the keyword's length.
pub const LASTCHAR: i32 = -1;

/// Largest fixed byte position a hash function may inspect (1-based).
pub const MAX_KEY_POS: i32 = 255;

/// An ordered set of distinct byte positions.
///
/// Entries are 1-based positions in `1..=MAX_KEY_POS` plus optionally
/// [`LASTCHAR`], kept sorted in strictly descending order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Positions {
    positions: Vec<i32>,
}

impl Positions {
    /// Creates an empty position set.
    pub fn new() -> Self {
        Positions {
            positions: Vec::new(),
        }
    }

    /// Returns whether `pos` is in the set.
    pub fn contains(&self, pos: i32) -> bool {
        self.positions.contains(&pos)
    }

    /// Inserts `pos`, keeping the descending order. Inserting a position
    /// that is already present has no effect.
    pub fn add(&mut self, pos: i32) {
        debug_assert!(pos == LASTCHAR || (1..=MAX_KEY_POS).contains(&pos));
        match self.positions.binary_search_by(|p| pos.cmp(p)) {
            Ok(_) => {}
            Err(at) => self.positions.insert(at, pos),
        }
    }

    /// Removes `pos` if present.
    pub fn remove(&mut self, pos: i32) {
        if let Ok(at) = self.positions.binary_search_by(|p| pos.cmp(p)) {
            self.positions.remove(at);
        }
    }

    /// Number of positions in the set.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Returns whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Iterates the positions in descending order, [`LASTCHAR`] last.
    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        self.positions.iter().copied()
    }
}

impl FromStr for Positions {
    type Err = Error;

    /// Parses a comma-separated position list such as `"1,3,$"` or
    /// `"1-4,$"`. `$` names the last character; ranges are inclusive.
    fn from_str(s: &str) -> Result<Self> {
        let mut positions = Positions::new();
        for token in s.split(',') {
            let token = token.trim();
            if token == "$" {
                positions.add(LASTCHAR);
                continue;
            }
            let (lo, hi) = match token.split_once('-') {
                Some((lo, hi)) => (parse_position(lo, s)?, parse_position(hi, s)?),
                None => {
                    let p = parse_position(token, s)?;
                    (p, p)
                }
            };
            if lo > hi {
                return Err(Error::InvalidPositions(s.to_string()));
            }
            for p in lo..=hi {
                positions.add(p);
            }
        }
        if positions.is_empty() {
            return Err(Error::InvalidPositions(s.to_string()));
        }
        Ok(positions)
    }
}

fn parse_position(token: &str, whole: &str) -> Result<i32> {
    let p: i32 = token
        .parse()
        .map_err(|_| Error::InvalidPositions(whole.to_string()))?;
    if (1..=MAX_KEY_POS).contains(&p) {
        Ok(p)
    } else {
        Err(Error::InvalidPositions(whole.to_string()))
    }
}

impl fmt::Display for Positions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, pos) in self.positions.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if *pos == LASTCHAR {
                write!(f, "$")?;
            } else {
                write!(f, "{}", pos)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descending_order_with_lastchar_last() {
        let mut positions = Positions::new();
        positions.add(2);
        positions.add(LASTCHAR);
        positions.add(7);
        positions.add(1);
        let collected: Vec<i32> = positions.iter().collect();
        assert_eq!(collected, vec![7, 2, 1, LASTCHAR]);
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut positions = Positions::new();
        positions.add(3);
        positions.add(3);
        assert_eq!(positions.len(), 1);
    }

    #[test]
    fn test_remove() {
        let mut positions = Positions::new();
        positions.add(1);
        positions.add(4);
        positions.remove(1);
        assert!(!positions.contains(1));
        assert!(positions.contains(4));
        positions.remove(9);
        assert_eq!(positions.len(), 1);
    }

    #[test]
    fn test_parse() {
        let positions: Positions = "1,3,$".parse().unwrap();
        let collected: Vec<i32> = positions.iter().collect();
        assert_eq!(collected, vec![3, 1, LASTCHAR]);

        let ranged: Positions = "2-4".parse().unwrap();
        let collected: Vec<i32> = ranged.iter().collect();
        assert_eq!(collected, vec![4, 3, 2]);

        assert!("".parse::<Positions>().is_err());
        assert!("0".parse::<Positions>().is_err());
        assert!("4-2".parse::<Positions>().is_err());
        assert!("abc".parse::<Positions>().is_err());
        assert!("300".parse::<Positions>().is_err());
    }

    #[test]
    fn test_display_round_trip() {
        let positions: Positions = "1,3,$".parse().unwrap();
        assert_eq!(positions.to_string(), "3, 1, $");
    }
}
