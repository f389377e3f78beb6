//! Search for a perfect hash function
//!
//! The most general form of the hash function is
//!
//! ```text
//! hash(keyword) = len(keyword)? + sum(asso_values[keyword[i] + alpha_inc[i]] : i in Pos)
//! ```
//!
//! where `Pos` is a set of byte positions, each `alpha_inc[i]` and each
//! `asso_values[c]` a nonnegative integer. Three facts drive the search:
//! if all keywords differ, some `Pos` makes all position tuples differ; if
//! all tuples differ, some increments make all multisets differ; and if all
//! multisets differ, some associated values make all hash sums differ. The
//! three stages in [`stages`] and [`asso`] find each piece in turn; this
//! module owns the shared state and sequences the stages.
//!
//! The keyword list is index-based: the arena `keywords` is never
//! reordered, `order` holds the current traversal order, and duplicate
//! equivalence classes hang off their representative through
//! `duplicate_link` arena indices.

mod asso;
mod stages;

use log::{debug, warn};
use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::bool_array::BoolArray;
use crate::error::{Error, Result};
use crate::hash_table::KeywordTable;
use crate::keyword::{Keyword, KeywordExt};
use crate::options::Options;
use crate::positions::Positions;

/// State of one perfect hash search.
///
/// Create it with [`Search::new`], run [`Search::optimize`], receive a
/// [`Solution`]. One search per process; nothing here is reentrant.
#[derive(Debug)]
pub struct Search {
    /// Keyword arena; never reordered.
    pub(crate) keywords: Vec<KeywordExt>,
    /// Current traversal order, as arena indices. After `prepare` only
    /// equivalence-class representatives remain.
    pub(crate) order: Vec<usize>,
    pub(crate) options: Options,
    pub(crate) total_keys: usize,
    /// Keywords remaining in `order` after duplicates were spliced out.
    pub(crate) list_len: usize,
    pub(crate) total_duplicates: usize,
    pub(crate) min_key_len: usize,
    pub(crate) max_key_len: usize,
    pub(crate) key_positions: Positions,
    pub(crate) alpha_inc: Vec<u32>,
    pub(crate) alpha_size: usize,
    pub(crate) occurrences: Vec<i32>,
    pub(crate) determined: Vec<bool>,
    pub(crate) asso_values: Vec<i32>,
    pub(crate) asso_value_max: i32,
    pub(crate) max_hash_value: i32,
    pub(crate) collision_detector: BoolArray,
    /// Scratch for the disjoint union of two key signatures.
    pub(crate) union_set: Vec<u32>,
    pub(crate) initial_asso_value: i32,
    pub(crate) jump: i32,
    pub(crate) fewest_collisions: i32,
    /// Keywords handled so far by the value search, for diagnostics.
    pub(crate) num_done: usize,
    pub(crate) rng: SmallRng,
}

impl Search {
    /// Creates a search over the given keywords.
    pub fn new(keywords: Vec<Keyword>, mut options: Options) -> Self {
        options.normalize();
        let keywords: Vec<KeywordExt> = keywords.into_iter().map(KeywordExt::from).collect();
        let order: Vec<usize> = (0..keywords.len()).collect();
        Search {
            keywords,
            order,
            options,
            total_keys: 0,
            list_len: 0,
            total_duplicates: 0,
            min_key_len: 0,
            max_key_len: 0,
            key_positions: Positions::new(),
            alpha_inc: Vec::new(),
            alpha_size: 0,
            occurrences: Vec::new(),
            determined: Vec::new(),
            asso_values: Vec::new(),
            asso_value_max: 0,
            max_hash_value: 0,
            collision_detector: BoolArray::new(1),
            union_set: Vec::new(),
            initial_asso_value: 0,
            jump: 0,
            fewest_collisions: 0,
            num_done: 0,
            rng: SmallRng::seed_from_u64(0),
        }
    }

    /// Computes the keyword count and the length extremes, rejecting empty
    /// input and empty keywords.
    fn preprepare(&mut self) -> Result<()> {
        self.total_keys = self.order.len();
        if self.total_keys == 0 {
            return Err(Error::NoKeywords);
        }

        self.min_key_len = usize::MAX;
        self.max_key_len = 0;
        for &ki in &self.order {
            let len = self.keywords[ki].len();
            self.min_key_len = self.min_key_len.min(len);
            self.max_key_len = self.max_key_len.max(len);
        }

        // The comparison expressions of generated lookup code don't work
        // for an empty string, so fail eagerly.
        if self.min_key_len == 0 {
            return Err(Error::EmptyKeyword);
        }
        Ok(())
    }

    /// Builds the final key signatures and the duplicate equivalence
    /// classes. Only one representative per class stays in `order`; its
    /// peers are reachable through `duplicate_link`.
    fn prepare(&mut self) -> Result<()> {
        let alpha_inc = self.alpha_inc.clone();
        self.init_selchars_multiset(&alpha_inc);

        self.list_len = self.total_keys;
        self.total_duplicates = 0;
        let mut representatives = KeywordTable::new(self.list_len, self.options.no_length);
        let mut kept = Vec::with_capacity(self.order.len());
        for i in 0..self.order.len() {
            let ki = self.order[i];
            match representatives.insert(ki, &self.keywords) {
                None => {
                    self.keywords[ki].duplicate_link = None;
                    kept.push(ki);
                }
                Some(other) => {
                    self.total_duplicates += 1;
                    self.list_len -= 1;
                    self.keywords[ki].duplicate_link = self.keywords[other].duplicate_link;
                    self.keywords[other].duplicate_link = Some(ki);

                    let message = format!(
                        "key link: \"{}\" = \"{}\", with key set \"{}\"",
                        String::from_utf8_lossy(&self.keywords[ki].allchars),
                        String::from_utf8_lossy(&self.keywords[other].allchars),
                        signature_string(&self.keywords[ki].selchars),
                    );
                    if self.options.duplicates {
                        debug!("{}", message);
                    } else {
                        warn!("{}", message);
                    }
                }
            }
        }
        self.order = kept;

        if self.total_duplicates > 0 {
            if self.options.duplicates {
                warn!(
                    "{} input keys have identical key signatures, examine output carefully",
                    self.total_duplicates
                );
            } else {
                return Err(Error::DuplicateKeys {
                    count: self.total_duplicates,
                    positions_given: self.options.key_positions.is_some(),
                });
            }
        }

        // Upper bound on the indices passed to asso_values[].
        let max_alpha_inc = self.alpha_inc.iter().copied().max().unwrap_or(0);
        let base_alphabet = if self.options.seven_bit { 128 } else { 256 };
        self.alpha_size = base_alphabet + max_alpha_inc as usize;

        self.occurrences = vec![0; self.alpha_size];
        for &ki in &self.order {
            for &c in &self.keywords[ki].selchars {
                self.occurrences[c as usize] += 1;
            }
        }

        self.asso_values = vec![0; self.alpha_size];
        self.determined = vec![false; self.alpha_size];
        Ok(())
    }

    /// Sum of the occurrence counts of a keyword's selected characters.
    /// Keywords sharing many selected characters with others score high.
    fn compute_occurrence(&self, ki: usize) -> i32 {
        self.keywords[ki]
            .selchars
            .iter()
            .map(|&c| self.occurrences[c as usize])
            .sum()
    }

    fn already_determined(&self, ki: usize) -> bool {
        self.keywords[ki]
            .selchars
            .iter()
            .all(|&c| self.determined[c as usize])
    }

    /// Reorders the keyword list to surface inevitable collisions early in
    /// the value search (Cichelli). Frequently occurring keywords come
    /// first; after each keyword, every later keyword whose hash value is
    /// already fully determined moves up directly behind it.
    fn reorder(&mut self) {
        for i in 0..self.order.len() {
            let ki = self.order[i];
            self.keywords[ki].occurrence = self.compute_occurrence(ki);
        }

        let mut order = std::mem::take(&mut self.order);
        order.sort_by_key(|&ki| std::cmp::Reverse(self.keywords[ki].occurrence));

        self.determined.fill(false);
        let mut i = 0;
        while i + 1 < order.len() {
            for &c in &self.keywords[order[i]].selchars {
                self.determined[c as usize] = true;
            }

            // Stable-partition the suffix: keywords whose selected
            // characters are all determined move up behind position i.
            let mut moved = 0;
            for j in (i + 1)..order.len() {
                if self.already_determined(order[j]) {
                    let ki = order.remove(j);
                    order.insert(i + 1 + moved, ki);
                    moved += 1;
                }
            }
            i += moved + 1;
        }
        self.order = order;
    }

    /// Sorts the keyword list by increasing hash value.
    fn sort(&mut self) {
        let mut order = std::mem::take(&mut self.order);
        order.sort_by_key(|&ki| self.keywords[ki].hash_value);
        self.order = order;
    }

    /// Runs the whole search: positions, increments, associated values,
    /// final verification, sort. Consumes the search.
    pub fn optimize(mut self) -> Result<Solution> {
        self.preprepare()?;
        if let Some(positions) = self.options.key_positions.clone() {
            self.key_positions = positions;
        } else {
            self.find_positions();
        }
        debug!("key positions: {{{}}}", self.key_positions);
        self.find_alpha_inc();
        self.prepare()?;
        if self.options.reorder {
            self.reorder();
        }
        self.prepare_asso_values();

        if self.options.asso_iterations == 0 {
            // Try only the configured initial value and jump.
            self.find_asso_values();
        } else {
            self.find_best_asso_values();
        }

        // One final check, just to make sure nothing weird happened.
        self.collision_detector.clear();
        for i in 0..self.order.len() {
            let ki = self.order[i];
            let hash = self.compute_hash(ki);
            if self.collision_detector.set_bit(hash as usize) {
                if self.options.duplicates {
                    // Counted but tolerated.
                    self.total_duplicates += 1;
                } else {
                    return Err(Error::InternalCollision {
                        hash,
                        positions_given: self.options.key_positions.is_some(),
                    });
                }
            }
        }

        self.sort();

        if log::log_enabled!(log::Level::Debug) {
            self.dump();
        }

        let hash_includes_len = !self.options.no_length;
        let all_chars = self.options.all_chars;
        Ok(Solution {
            keywords: self.keywords,
            order: self.order,
            total_keys: self.total_keys,
            min_key_len: self.min_key_len,
            max_key_len: self.max_key_len,
            key_positions: self.key_positions,
            alpha_inc: self.alpha_inc,
            total_duplicates: self.total_duplicates,
            alpha_size: self.alpha_size,
            asso_values: self.asso_values,
            asso_value_max: self.asso_value_max,
            max_hash_value: self.max_hash_value,
            hash_includes_len,
            all_chars,
        })
    }

    /// Runs the value search over successive (initial value, jump) pairs
    /// and installs the associated values with the fewest collisions,
    /// breaking ties toward the smaller maximum hash value. The pairs are
    /// (0,1), (1,1), (2,1), (0,3), (3,1), (1,3), (4,1), (2,3), (0,5), ...
    fn find_best_asso_values(&mut self) {
        let mut best_asso_values = vec![0i32; self.alpha_size];
        let mut best_collisions = i32::MAX;
        let mut best_max_hash_value = i32::MAX;

        self.initial_asso_value = 0;
        self.jump = 1;
        let mut remaining = self.options.asso_iterations;
        loop {
            self.find_asso_values();

            let mut collisions = 0;
            let mut max_hash_value = i32::MIN;
            self.collision_detector.clear();
            for i in 0..self.order.len() {
                let ki = self.order[i];
                let hash = self.compute_hash(ki);
                max_hash_value = max_hash_value.max(hash);
                if self.collision_detector.set_bit(hash as usize) {
                    collisions += 1;
                }
            }
            if collisions < best_collisions
                || (collisions == best_collisions && max_hash_value < best_max_hash_value)
            {
                best_asso_values.copy_from_slice(&self.asso_values);
                best_collisions = collisions;
                best_max_hash_value = max_hash_value;
            }

            remaining -= 1;
            if remaining == 0 {
                break;
            }
            if self.initial_asso_value >= 2 {
                self.initial_asso_value -= 2;
                self.jump += 2;
            } else {
                self.initial_asso_value += self.jump;
                self.jump = 1;
            }
        }
        // Install the best values found; hash values are recomputed by the
        // final check.
        self.asso_values.copy_from_slice(&best_asso_values);
    }

    /// Rebuilds every keyword's signature as a position tuple.
    pub(crate) fn init_selchars_tuple(&mut self, positions: &Positions) {
        let use_all_chars = self.options.all_chars;
        for &ki in &self.order {
            self.keywords[ki].init_selchars_tuple(use_all_chars, positions);
        }
    }

    /// Rebuilds every keyword's signature as a sorted multiset under the
    /// current key positions and the given increments.
    pub(crate) fn init_selchars_multiset(&mut self, alpha_inc: &[u32]) {
        let use_all_chars = self.options.all_chars;
        let positions = self.key_positions.clone();
        for &ki in &self.order {
            self.keywords[ki].init_selchars_multiset(use_all_chars, &positions, alpha_inc);
        }
    }

    /// Longest possible key signature under the current configuration.
    pub(crate) fn max_keysig_size(&self) -> usize {
        if self.options.all_chars {
            self.max_key_len
        } else {
            self.key_positions.len()
        }
    }

    /// Dumps the occurrence and associated value tables plus the keyword
    /// list, mirroring the information the output layer consumes.
    fn dump(&self) {
        debug!("dumping occurrence and associated value tables");
        for c in 0..self.alpha_size {
            if self.occurrences[c] != 0 {
                debug!(
                    "asso_values[{}] = {:6}, occurrences[{}] = {:6}",
                    c, self.asso_values[c], c, self.occurrences[c]
                );
            }
        }
        debug!(
            "total non-linked keys = {}, total keywords = {}, total duplicates = {}, maximum key length = {}",
            self.list_len, self.total_keys, self.total_duplicates, self.max_key_len
        );
        for &ki in &self.order {
            let keyword = &self.keywords[ki];
            debug!(
                "{:11}, {:11}, {}, {}",
                keyword.hash_value,
                keyword.len(),
                signature_string(&keyword.selchars),
                String::from_utf8_lossy(&keyword.allchars)
            );
        }
    }
}

fn signature_string(selchars: &[u32]) -> String {
    selchars
        .iter()
        .map(|&c| char::from_u32(c).unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

/// Everything the output layer needs from a finished search.
#[derive(Debug, Clone)]
pub struct Solution {
    /// Keyword arena, including spliced-out duplicates.
    pub keywords: Vec<KeywordExt>,
    /// Arena indices of the representatives, ascending by hash value.
    pub order: Vec<usize>,
    /// Number of keywords read, duplicates included.
    pub total_keys: usize,
    /// Shortest keyword length.
    pub min_key_len: usize,
    /// Longest keyword length.
    pub max_key_len: usize,
    /// Byte positions the hash function inspects.
    pub key_positions: Positions,
    /// Per-position increments added before the associated value lookup.
    pub alpha_inc: Vec<u32>,
    /// Number of keywords sharing another keyword's signature or hash.
    pub total_duplicates: usize,
    /// Bound on the indices into `asso_values`.
    pub alpha_size: usize,
    /// Associated value per alphabet character.
    pub asso_values: Vec<i32>,
    /// Exclusive power-of-two bound on each associated value.
    pub asso_value_max: i32,
    /// Upper bound on any hash value under these associated values.
    pub max_hash_value: i32,
    /// Whether the keyword length participates in the hash.
    pub hash_includes_len: bool,
    /// Whether signatures were built from every byte.
    pub all_chars: bool,
}

impl Solution {
    /// Iterates the equivalence-class representatives ascending by hash
    /// value.
    pub fn representatives(&self) -> impl Iterator<Item = &KeywordExt> + '_ {
        self.order.iter().map(move |&ki| &self.keywords[ki])
    }

    /// Iterates the duplicate chain hanging off the keyword at arena index
    /// `ki` (not including the representative itself).
    pub fn duplicate_chain(&self, ki: usize) -> impl Iterator<Item = &KeywordExt> + '_ {
        let mut next = self.keywords[ki].duplicate_link;
        std::iter::from_fn(move || {
            let ki = next?;
            next = self.keywords[ki].duplicate_link;
            Some(&self.keywords[ki])
        })
    }

    /// Evaluates the discovered hash function for `word`.
    ///
    /// Returns `None` for words outside the contract of the function:
    /// lengths outside `min_key_len..=max_key_len`, or bytes that fall
    /// outside the alphabet (possible under a 7-bit alphabet).
    pub fn hash(&self, word: &[u8]) -> Option<i32> {
        if word.len() < self.min_key_len || word.len() > self.max_key_len {
            return None;
        }
        let mut sum = if self.hash_includes_len {
            word.len() as i32
        } else {
            0
        };
        if self.all_chars {
            for (i, &b) in word.iter().enumerate() {
                sum += self.asso_value(u32::from(b) + self.alpha_inc[i])?;
            }
        } else {
            for pos in self.key_positions.iter() {
                let i = if pos == crate::positions::LASTCHAR {
                    word.len() - 1
                } else if pos as usize <= word.len() {
                    (pos - 1) as usize
                } else {
                    continue;
                };
                sum += self.asso_value(u32::from(word[i]) + self.alpha_inc[i])?;
            }
        }
        Some(sum)
    }

    fn asso_value(&self, c: u32) -> Option<i32> {
        self.asso_values.get(c as usize).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn search(words: &[&str]) -> Search {
        let keywords = words.iter().map(|w| Keyword::new(*w)).collect();
        Search::new(keywords, Options::default())
    }

    #[test]
    fn test_preprepare_computes_extremes() {
        let mut s = search(&["if", "while", "for"]);
        s.preprepare().unwrap();
        assert_eq!(s.total_keys, 3);
        assert_eq!(s.min_key_len, 2);
        assert_eq!(s.max_key_len, 5);
    }

    #[test]
    fn test_preprepare_rejects_empty_keyword() {
        let mut s = search(&["ok", ""]);
        assert!(matches!(s.preprepare(), Err(Error::EmptyKeyword)));
    }

    #[test]
    fn test_preprepare_rejects_empty_input() {
        let mut s = search(&[]);
        assert!(matches!(s.preprepare(), Err(Error::NoKeywords)));
    }

    #[test]
    fn test_prepare_builds_equivalence_classes() {
        let mut s = search(&["ab", "ba", "cd"]);
        s.options.duplicates = true;
        s.preprepare().unwrap();
        s.key_positions = "1,2".parse().unwrap();
        s.alpha_inc = vec![0; s.max_key_len];
        s.prepare().unwrap();

        // "ab" and "ba" collapse under the sorted multiset signature.
        assert_eq!(s.total_duplicates, 1);
        assert_eq!(s.order.len(), 2);
        assert_eq!(s.keywords[0].duplicate_link, Some(1));
        assert_eq!(s.keywords[1].duplicate_link, None);
    }

    #[test]
    fn test_prepare_fails_without_duplicate_handling() {
        let mut s = search(&["ab", "ba"]);
        s.preprepare().unwrap();
        s.key_positions = "1,2".parse().unwrap();
        s.alpha_inc = vec![0; s.max_key_len];
        assert!(matches!(
            s.prepare(),
            Err(Error::DuplicateKeys { count: 1, .. })
        ));
    }

    #[test]
    fn test_occurrences_count_multiset_members() {
        let mut s = search(&["aa", "ab"]);
        s.options.duplicates = true;
        s.preprepare().unwrap();
        s.key_positions = "1,2".parse().unwrap();
        s.alpha_inc = vec![0; s.max_key_len];
        s.prepare().unwrap();
        assert_eq!(s.occurrences[u32::from(b'a') as usize], 3);
        assert_eq!(s.occurrences[u32::from(b'b') as usize], 1);
    }
}
