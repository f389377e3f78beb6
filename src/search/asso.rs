//! Finding good associated values
//!
//! Stage 3 assigns every alphabet character an associated value below a
//! power-of-two bound so that all keyword hash sums come out distinct.
//! Keywords are admitted one at a time; each collision with an earlier
//! keyword triggers a walk over candidate values for some character the
//! two signatures don't share, with a generation-stamped bit array serving
//! as the collision detector. These loops are the hot path of the whole
//! search: they do no allocation and clear the detector in O(1).

use std::time::{SystemTime, UNIX_EPOCH};

use log::debug;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::bool_array::BoolArray;
use crate::search::Search;

/// Disjoint union of two ascending multisets: the set of elements
/// contained in them with different multiplicity, each emitted once.
/// Equal elements cancel one-for-one in the merge walk.
fn compute_disjoint_union(set_1: &[u32], set_2: &[u32], result: &mut Vec<u32>) {
    result.clear();
    let mut push_distinct = |next: u32, out: &mut Vec<u32>| {
        if out.last() != Some(&next) {
            out.push(next);
        }
    };

    let (mut i, mut j) = (0, 0);
    while i < set_1.len() && j < set_2.len() {
        if set_1[i] == set_2[j] {
            i += 1;
            j += 1;
        } else if set_1[i] < set_2[j] {
            push_distinct(set_1[i], result);
            i += 1;
        } else {
            push_distinct(set_2[j], result);
            j += 1;
        }
    }
    while i < set_1.len() {
        push_distinct(set_1[i], result);
        i += 1;
    }
    while j < set_2.len() {
        push_distinct(set_2[j], result);
        j += 1;
    }
}

impl Search {
    /// Sizes the associated value range and the collision detector, and
    /// latches the configured starting point of the value walk.
    pub(crate) fn prepare_asso_values(&mut self) {
        let size_multiple = self.options.size_multiple;
        let non_linked_length = self.list_len as i32;
        let mut asso_value_max = if size_multiple == 0 {
            non_linked_length
        } else if size_multiple > 0 {
            non_linked_length * size_multiple
        } else {
            non_linked_length / -size_multiple
        };
        // Round up to the next power of two. An asso_values[c] can then be
        // kept in range with a mask, and an odd jump walks through every
        // value of the range before repeating one.
        if asso_value_max == 0 {
            asso_value_max = 1;
        }
        asso_value_max |= asso_value_max >> 1;
        asso_value_max |= asso_value_max >> 2;
        asso_value_max |= asso_value_max >> 4;
        asso_value_max |= asso_value_max >> 8;
        asso_value_max |= asso_value_max >> 16;
        asso_value_max += 1;
        self.asso_value_max = asso_value_max;

        // Bound for the hash values, given the bound for asso_values[].
        let length_term = if self.options.no_length {
            0
        } else {
            self.max_key_len as i32
        };
        self.max_hash_value =
            length_term + (asso_value_max - 1) * self.max_keysig_size() as i32;

        self.collision_detector = BoolArray::new(self.max_hash_value as usize + 1);
        self.union_set = Vec::with_capacity(2 * self.max_keysig_size());

        debug!(
            "total non-linked keys = {}, maximum associated value is {}, maximum size of generated hash table is {}",
            non_linked_length, asso_value_max, self.max_hash_value
        );

        if self.options.random || self.options.jump == 0 {
            let seed = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|elapsed| elapsed.as_secs())
                .unwrap_or(0);
            self.rng = SmallRng::seed_from_u64(seed);
        }

        self.initial_asso_value = if self.options.random {
            -1
        } else {
            self.options.initial_asso_value
        };
        self.jump = self.options.jump;
    }

    /// Puts a first guess into asso_values[]. A negative starting point
    /// selects a random guess per character.
    fn init_asso_values(&mut self) {
        if self.initial_asso_value < 0 {
            for value in &mut self.asso_values {
                *value = (self.rng.gen::<u32>() as i32) & (self.asso_value_max - 1);
            }
        } else {
            let value = self.initial_asso_value & (self.asso_value_max - 1);
            self.asso_values.fill(value);
        }
    }

    /// Recomputes and stores the hash value of the keyword at arena index
    /// `ki` under the current asso_values[]. Called very frequently.
    #[inline]
    pub(crate) fn compute_hash(&mut self, ki: usize) -> i32 {
        let keyword = &self.keywords[ki];
        let mut sum = if self.options.no_length {
            0
        } else {
            keyword.len() as i32
        };
        for &c in &keyword.selchars {
            sum += self.asso_values[c as usize];
        }
        self.keywords[ki].hash_value = sum;
        sum
    }

    /// Sorts the union-set scratch by increasing occurrence count.
    /// Insertion sort; the set is short.
    fn sort_by_occurrence(&mut self) {
        for i in 1..self.union_set.len() {
            let tmp = self.union_set[i];
            let mut curr = i;
            while curr > 0
                && self.occurrences[tmp as usize]
                    < self.occurrences[self.union_set[curr - 1] as usize]
            {
                self.union_set[curr] = self.union_set[curr - 1];
                curr -= 1;
            }
            self.union_set[curr] = tmp;
        }
    }

    /// Walks candidate values for asso_values[c]. A candidate succeeds if
    /// the recomputed hash values of the keywords up to list position
    /// `curr_pos` inclusive produce fewer than `fewest_collisions`
    /// collisions; the walk then keeps the candidate, lowers
    /// `fewest_collisions` and returns `false`. After `iterations`
    /// unsuccessful candidates the original value is restored and `true`
    /// is returned.
    fn try_asso_value(&mut self, c: u32, curr_pos: usize, iterations: i32) -> bool {
        let original_value = self.asso_values[c as usize];

        for attempt in 0..iterations {
            // Next value, wrapping around mod asso_value_max.
            let step = if self.jump != 0 {
                self.jump
            } else {
                (self.rng.gen::<u32>() >> 1) as i32
            };
            self.asso_values[c as usize] =
                (self.asso_values[c as usize] + step) & (self.asso_value_max - 1);

            self.collision_detector.clear();
            let mut collisions = 0;
            let mut pos = 0;
            loop {
                let ki = self.order[pos];
                let hash = self.compute_hash(ki);
                // Too many collisions: safely abort this fruitless walk.
                if self.collision_detector.set_bit(hash as usize) {
                    collisions += 1;
                    if collisions >= self.fewest_collisions {
                        break;
                    }
                }
                if pos == curr_pos {
                    self.fewest_collisions = collisions;
                    debug!("- resolved after {} iterations", attempt + 1);
                    return false;
                }
                pos += 1;
            }
        }

        // No more tries; restore the original value.
        self.asso_values[c as usize] = original_value;
        true
    }

    /// Tries to separate the hash values of two colliding keywords by
    /// changing asso_values[c] for some character c occurring in their
    /// signatures with different multiplicity.
    fn change_some_asso_value(&mut self, prior_pos: usize, curr_pos: usize) {
        let prior_ki = self.order[prior_pos];
        let curr_ki = self.order[curr_pos];
        debug!(
            "collision on keyword #{}, prior = \"{}\", curr = \"{}\", hash = {}",
            self.num_done,
            String::from_utf8_lossy(&self.keywords[prior_ki].allchars),
            String::from_utf8_lossy(&self.keywords[curr_ki].allchars),
            self.keywords[curr_ki].hash_value
        );

        compute_disjoint_union(
            &self.keywords[prior_ki].selchars,
            &self.keywords[curr_ki].selchars,
            &mut self.union_set,
        );
        // Try the least used characters first; changing them disturbs the
        // fewest other keywords.
        self.sort_by_occurrence();

        let iterations = if !self.options.fast {
            // Try all possible values of asso_values[c].
            self.asso_value_max
        } else if self.options.iterations != 0 {
            self.options.iterations
        } else {
            self.list_len as i32
        };

        for i in 0..self.union_set.len() {
            let c = self.union_set[i];
            if !self.try_asso_value(c, curr_pos, iterations) {
                // This modification lowered the collision count; every
                // hash value up to curr_pos is already updated.
                debug!(
                    "  by changing asso_values[{}] to {}",
                    c, self.asso_values[c as usize]
                );
                return;
            }
        }

        // Failed to resolve the collision: restore consistent hash values
        // for the keywords up to curr_pos and carry on.
        for pos in 0..=curr_pos {
            let ki = self.order[pos];
            self.compute_hash(ki);
        }
        debug!(
            "** collision not resolved after {} iterations, {} duplicates remain, continuing...",
            iterations,
            self.fewest_collisions + self.total_duplicates as i32
        );
    }

    /// Admits one keyword after the other, resolving each hash collision
    /// with an earlier keyword as it appears.
    pub(crate) fn find_asso_values(&mut self) {
        self.fewest_collisions = 0;
        self.init_asso_values();

        self.num_done = 1;
        for curr_pos in 0..self.order.len() {
            let curr_ki = self.order[curr_pos];
            self.compute_hash(curr_ki);

            for prior_pos in 0..curr_pos {
                let prior_ki = self.order[prior_pos];
                if self.keywords[prior_ki].hash_value == self.keywords[curr_ki].hash_value {
                    self.fewest_collisions += 1;
                    self.change_some_asso_value(prior_pos, curr_pos);
                    break;
                }
            }
            self.num_done += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyword::Keyword;
    use crate::options::Options;

    #[test]
    fn test_disjoint_union_cancels_equal_multiplicities() {
        let mut result = Vec::new();
        compute_disjoint_union(&[1, 2, 2, 5], &[2, 3, 5], &mut result);
        // One 2 cancels, one survives; 5 cancels; 1 and 3 survive.
        assert_eq!(result, vec![1, 2, 3]);
    }

    #[test]
    fn test_disjoint_union_never_repeats_elements() {
        let mut result = Vec::new();
        compute_disjoint_union(&[4, 4, 4], &[], &mut result);
        assert_eq!(result, vec![4]);

        compute_disjoint_union(&[1, 1, 2], &[2, 2, 2], &mut result);
        assert_eq!(result, vec![1, 2]);
    }

    #[test]
    fn test_disjoint_union_of_equal_sets_is_empty() {
        let mut result = vec![9];
        compute_disjoint_union(&[1, 2, 3], &[1, 2, 3], &mut result);
        assert!(result.is_empty());
    }

    #[test]
    fn test_prepare_asso_values_rounds_to_power_of_two() {
        for (list_len, expected) in [(1, 2), (3, 4), (4, 8), (20, 32)] {
            let keywords = (0..list_len).map(|i| Keyword::new(format!("k{i:03}"))).collect();
            let mut search = Search::new(keywords, Options::default());
            search.preprepare().unwrap();
            search.find_positions();
            search.find_alpha_inc();
            search.prepare().unwrap();
            search.prepare_asso_values();
            assert_eq!(search.asso_value_max, expected, "list_len = {list_len}");
        }
    }

    #[test]
    fn test_init_asso_values_masks_initial_value() {
        let keywords = vec![Keyword::new("a"), Keyword::new("b")];
        let mut search = Search::new(
            keywords,
            Options {
                initial_asso_value: 9,
                ..Options::default()
            },
        );
        search.preprepare().unwrap();
        search.find_positions();
        search.find_alpha_inc();
        search.prepare().unwrap();
        search.prepare_asso_values();
        search.init_asso_values();
        // asso_value_max is 4 here, so 9 is masked down to 1.
        assert!(search.asso_values.iter().all(|&v| v == 1));
    }

    #[test]
    fn test_find_asso_values_separates_all_hashes() {
        let keywords = ["cat", "dog", "cow", "ape", "owl"]
            .iter()
            .map(|w| Keyword::new(*w))
            .collect();
        let mut search = Search::new(keywords, Options::default());
        search.preprepare().unwrap();
        search.find_positions();
        search.find_alpha_inc();
        search.prepare().unwrap();
        search.prepare_asso_values();
        search.find_asso_values();

        let mut hashes: Vec<i32> = search
            .order
            .iter()
            .map(|&ki| search.keywords[ki].hash_value)
            .collect();
        hashes.sort_unstable();
        hashes.dedup();
        assert_eq!(hashes.len(), search.order.len());
    }
}
