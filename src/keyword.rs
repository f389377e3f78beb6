//! Keywords and their key signatures
//!
//! A [`Keyword`] is what the input layer hands over; a [`KeywordExt`] adds
//! the scratch state the search mutates, most importantly `selchars`: the
//! sequence of characters selected from the keyword by the chosen byte
//! positions. During the position and increment searches `selchars` is
//! rebuilt many times, so the buffer is reused rather than reallocated.

use crate::positions::{Positions, LASTCHAR};

/// A keyword as supplied by the input layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyword {
    /// The keyword bytes.
    pub allchars: Vec<u8>,
    /// Attribute text following the keyword in the input, passed through
    /// untouched to the output layer.
    pub rest: Vec<u8>,
    /// Input line the keyword came from.
    pub lineno: u32,
}

impl Keyword {
    /// Creates a keyword with no attributes.
    pub fn new(allchars: impl AsRef<[u8]>) -> Self {
        Keyword {
            allchars: allchars.as_ref().to_vec(),
            rest: Vec::new(),
            lineno: 0,
        }
    }

    /// Creates a keyword carrying attribute text and a source line number.
    pub fn with_rest(allchars: impl AsRef<[u8]>, rest: impl AsRef<[u8]>, lineno: u32) -> Self {
        Keyword {
            allchars: allchars.as_ref().to_vec(),
            rest: rest.as_ref().to_vec(),
            lineno,
        }
    }
}

/// A keyword enriched with the state owned by the search.
#[derive(Debug, Clone)]
pub struct KeywordExt {
    /// The keyword bytes.
    pub allchars: Vec<u8>,
    /// Attribute text for the output layer.
    pub rest: Vec<u8>,
    /// Input line the keyword came from.
    pub lineno: u32,
    /// Selected characters under the current positions and increments.
    /// Tuple form is ordered by position; multiset form is sorted ascending.
    pub selchars: Vec<u32>,
    /// Hash value under the current associated values.
    pub hash_value: i32,
    /// Sum of the occurrence counts of this keyword's selected characters.
    pub occurrence: i32,
    /// Arena index of the next member of this keyword's equivalence class.
    pub duplicate_link: Option<usize>,
    /// Slot index assigned by the output layer.
    pub final_index: i32,
}

impl From<Keyword> for KeywordExt {
    fn from(keyword: Keyword) -> Self {
        KeywordExt {
            allchars: keyword.allchars,
            rest: keyword.rest,
            lineno: keyword.lineno,
            selchars: Vec::new(),
            hash_value: 0,
            occurrence: 0,
            duplicate_link: None,
            final_index: -1,
        }
    }
}

impl KeywordExt {
    /// Keyword length in bytes.
    pub fn len(&self) -> usize {
        self.allchars.len()
    }

    /// Returns whether the keyword is empty.
    pub fn is_empty(&self) -> bool {
        self.allchars.is_empty()
    }

    /// Rebuilds `selchars` as the tuple of bytes at the given positions,
    /// in position-iteration order. With `use_all_chars` every byte is
    /// taken. Positions beyond the end of this keyword contribute nothing.
    pub fn init_selchars_tuple(&mut self, use_all_chars: bool, positions: &Positions) {
        self.build_selchars(use_all_chars, positions, None);
    }

    /// Rebuilds `selchars` as a multiset: bytes at the given positions plus
    /// the per-position alpha increment, sorted ascending so that equal
    /// multisets compare equal elementwise.
    pub fn init_selchars_multiset(
        &mut self,
        use_all_chars: bool,
        positions: &Positions,
        alpha_inc: &[u32],
    ) {
        self.build_selchars(use_all_chars, positions, Some(alpha_inc));
        self.selchars.sort_unstable();
    }

    fn build_selchars(
        &mut self,
        use_all_chars: bool,
        positions: &Positions,
        alpha_inc: Option<&[u32]>,
    ) {
        let len = self.allchars.len();
        self.selchars.clear();
        if use_all_chars {
            for (i, &b) in self.allchars.iter().enumerate() {
                let inc = alpha_inc.map_or(0, |a| a[i]);
                self.selchars.push(u32::from(b) + inc);
            }
        } else {
            for pos in positions.iter() {
                let i = if pos == LASTCHAR {
                    len - 1
                } else if pos as usize <= len {
                    (pos - 1) as usize
                } else {
                    continue;
                };
                let inc = alpha_inc.map_or(0, |a| a[i]);
                self.selchars.push(u32::from(self.allchars[i]) + inc);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ext(word: &str) -> KeywordExt {
        KeywordExt::from(Keyword::new(word))
    }

    #[test]
    fn test_tuple_follows_position_order() {
        let mut kw = ext("hash");
        let positions: Positions = "1,3,$".parse().unwrap();
        kw.init_selchars_tuple(false, &positions);
        // Positions iterate descending: 3, 1, then the last char.
        assert_eq!(kw.selchars, vec![u32::from(b's'), u32::from(b'h'), u32::from(b'h')]);
    }

    #[test]
    fn test_positions_past_the_end_are_skipped() {
        let mut kw = ext("ab");
        let positions: Positions = "1,5".parse().unwrap();
        kw.init_selchars_tuple(false, &positions);
        assert_eq!(kw.selchars, vec![u32::from(b'a')]);
    }

    #[test]
    fn test_multiset_adds_increments_and_sorts() {
        let mut kw = ext("ba");
        let positions: Positions = "1,2".parse().unwrap();
        let alpha_inc = [0, 3];
        kw.init_selchars_multiset(false, &positions, &alpha_inc);
        // Position 2 selects 'a' + 3, position 1 selects 'b' + 0; sorted.
        let mut expected = vec![u32::from(b'a') + 3, u32::from(b'b')];
        expected.sort_unstable();
        assert_eq!(kw.selchars, expected);
    }

    #[test]
    fn test_lastchar_uses_final_byte_increment() {
        let mut kw = ext("abc");
        let mut positions = Positions::new();
        positions.add(LASTCHAR);
        let alpha_inc = [0, 0, 7];
        kw.init_selchars_multiset(false, &positions, &alpha_inc);
        assert_eq!(kw.selchars, vec![u32::from(b'c') + 7]);
    }

    #[test]
    fn test_all_chars_ignores_positions() {
        let mut kw = ext("xy");
        let positions: Positions = "1".parse().unwrap();
        kw.init_selchars_tuple(true, &positions);
        assert_eq!(kw.selchars, vec![u32::from(b'x'), u32::from(b'y')]);
    }
}
