//! Search tunables
//!
//! The option layer (CLI or embedding code) fills this struct once; the
//! search core only reads it. Defaults match the classic generator
//! behavior: a size multiple of 1, an initial associated value of 0 and a
//! deterministic jump of 5.

use log::warn;

use crate::positions::Positions;

/// Default jump between candidate associated values.
pub const DEFAULT_JUMP: i32 = 5;

/// Tunables controlling the three search stages.
#[derive(Debug, Clone)]
pub struct Options {
    /// Build key signatures from every byte instead of selected positions.
    pub all_chars: bool,
    /// Omit the keyword length from the hash and from signature equality.
    pub no_length: bool,
    /// Base alphabet of 128 bytes instead of 256.
    pub seven_bit: bool,
    /// Allow several keywords to share a key signature (and hash value).
    pub duplicates: bool,
    /// Reorder keywords by character occurrence before the value search.
    pub reorder: bool,
    /// Start from random associated values (seeds the generator from wall
    /// time, so results are no longer reproducible).
    pub random: bool,
    /// Cap the iteration count when resolving a collision.
    pub fast: bool,
    /// Scales the bound on associated values: 0 uses the keyword count,
    /// a positive value multiplies it, a negative value divides it.
    pub size_multiple: i32,
    /// First associated value tried for every character.
    pub initial_asso_value: i32,
    /// Step between successive candidate associated values; 0 selects a
    /// random walk. A nonzero jump must be odd so that successive
    /// candidates enumerate the whole value range.
    pub jump: i32,
    /// Iteration cap in fast mode; 0 derives the cap from the keyword count.
    pub iterations: i32,
    /// Number of (initial value, jump) seed pairs to try; 0 runs the value
    /// search once with the configured pair.
    pub asso_iterations: i32,
    /// User-chosen key positions; when set, the position search is skipped.
    pub key_positions: Option<Positions>,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            all_chars: false,
            no_length: false,
            seven_bit: false,
            duplicates: false,
            reorder: false,
            random: false,
            fast: false,
            size_multiple: 1,
            initial_asso_value: 0,
            jump: DEFAULT_JUMP,
            iterations: 0,
            asso_iterations: 0,
            key_positions: None,
        }
    }
}

impl Options {
    /// Normalizes interdependent values. A nonzero even jump would only
    /// ever enumerate half of the value range, so it is bumped to the next
    /// odd number.
    pub fn normalize(&mut self) {
        if self.jump < 0 {
            warn!("jump value {} is negative, using {}", self.jump, -self.jump);
            self.jump = -self.jump;
        }
        if self.jump != 0 && self.jump % 2 == 0 {
            warn!("jump value {} is even, using {}", self.jump, self.jump + 1);
            self.jump += 1;
        }
        if self.iterations < 0 {
            warn!("iterations value {} is negative, using 0", self.iterations);
            self.iterations = 0;
        }
        if self.asso_iterations < 0 {
            warn!(
                "asso_iterations value {} is negative, using 0",
                self.asso_iterations
            );
            self.asso_iterations = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = Options::default();
        assert_eq!(options.size_multiple, 1);
        assert_eq!(options.jump, DEFAULT_JUMP);
        assert_eq!(options.initial_asso_value, 0);
        assert!(!options.duplicates);
        assert!(options.key_positions.is_none());
    }

    #[test]
    fn test_normalize_makes_jump_odd() {
        let mut options = Options {
            jump: 4,
            ..Options::default()
        };
        options.normalize();
        assert_eq!(options.jump, 5);

        let mut zero = Options {
            jump: 0,
            ..Options::default()
        };
        zero.normalize();
        assert_eq!(zero.jump, 0);
    }
}
