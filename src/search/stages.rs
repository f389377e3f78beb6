//! Finding good byte positions and alpha increments
//!
//! Stage 1 picks a position set under which the keywords' character tuples
//! are as distinct as possible; Stage 2 picks per-position increments that
//! keep that distinctness when the tuples become sorted multisets. Both
//! stages score candidates by the same measure: the number of keywords
//! whose signature equals an earlier keyword's.

use log::debug;

use crate::hash_table::KeywordTable;
use crate::positions::{Positions, LASTCHAR, MAX_KEY_POS};
use crate::search::Search;

/// Candidate positions in the order the original search scans them:
/// highest fixed position first, the last-character position at the end.
fn candidates(imax: i32) -> impl Iterator<Item = i32> {
    (1..=imax).rev().chain(std::iter::once(LASTCHAR))
}

impl Search {
    /// Number of keywords whose position tuple collides with an earlier
    /// keyword's under the given positions.
    fn count_duplicates_tuple(&mut self, positions: &Positions) -> usize {
        self.init_selchars_tuple(positions);

        let mut count = 0;
        let mut representatives = KeywordTable::new(self.total_keys, self.options.no_length);
        for &ki in &self.order {
            if representatives.insert(ki, &self.keywords).is_some() {
                count += 1;
            }
        }
        count
    }

    /// Number of keywords whose multiset signature collides with an
    /// earlier keyword's under the current positions and the given
    /// increments.
    fn count_duplicates_multiset(&mut self, alpha_inc: &[u32]) -> usize {
        self.init_selchars_multiset(alpha_inc);

        let mut count = 0;
        let mut representatives = KeywordTable::new(self.total_keys, self.options.no_length);
        for &ki in &self.order {
            if representatives.insert(ki, &self.keywords).is_some() {
                count += 1;
            }
        }
        count
    }

    /// Positions that must occur to distinguish keyword pairs of equal
    /// length differing in exactly one non-final byte. No position choice
    /// without them can tell such a pair apart.
    fn mandatory_positions(&self) -> Positions {
        let mut mandatory = Positions::new();
        for a in 0..self.order.len() {
            for b in (a + 1)..self.order.len() {
                let k1 = &self.keywords[self.order[a]];
                let k2 = &self.keywords[self.order[b]];
                if k1.len() != k2.len() {
                    continue;
                }
                let n = k1.len();
                let mut i = 1;
                while i < n && k1.allchars[i - 1] == k2.allchars[i - 1] {
                    i += 1;
                }
                if i < n && k1.allchars[i..] == k2.allchars[i..] {
                    // The keywords differ only at position i.
                    if !mandatory.contains(i as i32) {
                        mandatory.add(i as i32);
                    }
                }
            }
        }
        mandatory
    }

    /// Stage 1: finds a small position set keeping the keywords' tuples
    /// distinct. Greedy in three phases: grow while the duplicate count
    /// drops, then shrink while it doesn't rise, then trade position pairs
    /// for single replacements while it doesn't rise.
    pub(crate) fn find_positions(&mut self) {
        let mandatory = if self.options.duplicates {
            Positions::new()
        } else {
            self.mandatory_positions()
        };

        let imax = (self.max_key_len as i32).min(MAX_KEY_POS);

        // Add positions as long as this decreases the duplicate count.
        // Ties prefer the position giving the more efficient hash function.
        let mut current = mandatory.clone();
        let mut current_duplicates = self.count_duplicates_tuple(&current);
        loop {
            let mut best = Positions::new();
            let mut best_duplicates = usize::MAX;
            for i in candidates(imax) {
                if current.contains(i) {
                    continue;
                }
                let mut trial = current.clone();
                trial.add(i);
                let duplicates = self.count_duplicates_tuple(&trial);
                if duplicates < best_duplicates
                    || (duplicates == best_duplicates && i != LASTCHAR)
                {
                    best = trial;
                    best_duplicates = duplicates;
                }
            }
            if best_duplicates >= current_duplicates {
                break;
            }
            current = best;
            current_duplicates = best_duplicates;
        }

        // Remove positions as long as this doesn't increase the count.
        loop {
            let mut best = Positions::new();
            let mut best_duplicates = usize::MAX;
            for i in candidates(imax) {
                if !current.contains(i) || mandatory.contains(i) {
                    continue;
                }
                let mut trial = current.clone();
                trial.remove(i);
                let duplicates = self.count_duplicates_tuple(&trial);
                if duplicates < best_duplicates
                    || (duplicates == best_duplicates && i == LASTCHAR)
                {
                    best = trial;
                    best_duplicates = duplicates;
                }
            }
            if best_duplicates > current_duplicates {
                break;
            }
            current = best;
            current_duplicates = best_duplicates;
        }

        // Replace two positions by one as long as this doesn't increase
        // the count.
        loop {
            let mut best = Positions::new();
            let mut best_duplicates = usize::MAX;
            for i1 in candidates(imax) {
                if !current.contains(i1) || mandatory.contains(i1) {
                    continue;
                }
                for i2 in candidates(imax) {
                    if i2 == i1 || !current.contains(i2) || mandatory.contains(i2) {
                        continue;
                    }
                    for i3 in candidates(imax) {
                        if current.contains(i3) {
                            continue;
                        }
                        let mut trial = current.clone();
                        trial.remove(i1);
                        trial.remove(i2);
                        trial.add(i3);
                        let duplicates = self.count_duplicates_tuple(&trial);
                        if duplicates < best_duplicates
                            || (duplicates == best_duplicates
                                && (i1 == LASTCHAR || i2 == LASTCHAR || i3 != LASTCHAR))
                        {
                            best = trial;
                            best_duplicates = duplicates;
                        }
                    }
                }
            }
            if best_duplicates > current_duplicates {
                break;
            }
            current = best;
            current_duplicates = best_duplicates;
        }

        self.key_positions = current;
    }

    /// Stage 2: finds increments under which the multiset signatures are
    /// as distinct as the position tuples already were. Each round commits
    /// the single increment bump that best reduces the artificial
    /// duplicates, retrying with larger bumps when one step is not enough.
    pub(crate) fn find_alpha_inc(&mut self) {
        // The increments must not introduce duplicates beyond those the
        // position tuples already have.
        let positions = self.key_positions.clone();
        let duplicates_goal = self.count_duplicates_tuple(&positions);

        let mut current = vec![0u32; self.max_key_len];
        let mut current_duplicates = self.count_duplicates_multiset(&current);

        if current_duplicates > duplicates_goal {
            // The increment indices we are free to bump. The
            // last-character position is excluded: its byte index varies
            // with the keyword length. Positions iterate descending, so it
            // can only be the final entry.
            let indices: Vec<usize> = if self.options.all_chars {
                (0..self.max_key_len).collect()
            } else {
                self.key_positions
                    .iter()
                    .filter(|&pos| pos != LASTCHAR)
                    .map(|pos| (pos - 1) as usize)
                    .collect()
            };

            let mut best = vec![0u32; self.max_key_len];
            let mut trial = vec![0u32; self.max_key_len];
            loop {
                let mut inc = 1;
                loop {
                    let mut best_duplicates = usize::MAX;
                    for &index in &indices {
                        trial.copy_from_slice(&current);
                        trial[index] += inc;
                        let duplicates = self.count_duplicates_multiset(&trial);
                        if duplicates < best_duplicates {
                            best.copy_from_slice(&trial);
                            best_duplicates = duplicates;
                        }
                    }
                    if best_duplicates < current_duplicates {
                        current.copy_from_slice(&best);
                        current_duplicates = best_duplicates;
                        break;
                    }
                    inc += 1;
                }
                if current_duplicates <= duplicates_goal {
                    break;
                }
            }
        }

        if current.iter().any(|&inc| inc != 0) {
            debug!("alpha increments: {:?}", current);
        }
        self.alpha_inc = current;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyword::Keyword;
    use crate::options::Options;

    fn prepared(words: &[&str]) -> Search {
        let keywords = words.iter().map(|w| Keyword::new(*w)).collect();
        let mut search = Search::new(keywords, Options::default());
        search.preprepare().unwrap();
        search
    }

    #[test]
    fn test_mandatory_positions() {
        // "aab" and "abb" differ exactly at position 2.
        let search = prepared(&["aab", "abb"]);
        let mandatory = search.mandatory_positions();
        assert!(mandatory.contains(2));
        assert_eq!(mandatory.len(), 1);

        // "ab" and "ba" differ at two positions: nothing is mandatory.
        let search = prepared(&["ab", "ba"]);
        assert!(search.mandatory_positions().is_empty());

        // A final-byte difference is never mandatory.
        let search = prepared(&["ab", "ac"]);
        assert!(search.mandatory_positions().is_empty());
    }

    #[test]
    fn test_find_positions_single_char_keys() {
        let mut search = prepared(&["a", "b", "c", "d"]);
        search.find_positions();
        let positions: Vec<i32> = search.key_positions.iter().collect();
        assert_eq!(positions, vec![1]);
    }

    #[test]
    fn test_find_positions_prefers_no_positions_when_lengths_differ() {
        // All lengths distinct: the length alone separates the keywords,
        // so no position beats the empty set.
        let mut search = prepared(&["if", "for", "while"]);
        search.find_positions();
        assert!(search.key_positions.is_empty());
    }

    #[test]
    fn test_find_positions_keeps_mandatory() {
        let mut search = prepared(&["aab", "abb", "xy"]);
        search.find_positions();
        assert!(search.key_positions.contains(2));
    }

    #[test]
    fn test_find_alpha_inc_stays_zero_when_tuples_survive_sorting() {
        let mut search = prepared(&["a", "b", "c"]);
        search.find_positions();
        search.find_alpha_inc();
        assert!(search.alpha_inc.iter().all(|&inc| inc == 0));
    }

    #[test]
    fn test_find_alpha_inc_separates_anagrams() {
        // With positions {1, 2} the sorted multisets of "ab" and "ba"
        // coincide until an increment breaks the symmetry.
        let keywords = vec![Keyword::new("ab"), Keyword::new("ba")];
        let mut search = Search::new(keywords, Options::default());
        search.preprepare().unwrap();
        search.key_positions = "1,2".parse().unwrap();
        search.find_alpha_inc();

        let alpha_inc = search.alpha_inc.clone();
        assert_eq!(search.count_duplicates_multiset(&alpha_inc), 0);
        assert!(search.alpha_inc.iter().any(|&inc| inc != 0));
    }
}
