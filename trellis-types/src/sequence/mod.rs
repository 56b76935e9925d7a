//! Ordered, position-keyed growable sequence.
//!
//! Elements are kept sorted ascending by key at all times. Storage is a
//! `VecDeque`, a ring buffer with a movable start offset, so a cyclic
//! rotation of keys only moves the shorter side of the ring instead of
//! re-sorting.
//!
//! Duplicate keys are tolerated by the container itself. Callers that need
//! strict ordering (notes, automation nodes) enforce it on top.

use std::collections::vec_deque::{self, VecDeque};
use std::ops::{Index, Range};

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::SequenceError;

#[cfg(test)]
mod tests;

/// An element addressed by an integer key (a position in ticks).
pub trait Keyed {
    fn key(&self) -> i32;
    fn set_key(&mut self, key: i32);
}

/// Which side of the search key an index lookup should land on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// Leftmost element whose key is `>=` the search key.
    GreaterOrEqual,
    /// Rightmost element whose key is `<` the search key.
    Less,
}

impl Comparison {
    fn offset(self) -> isize {
        match self {
            Comparison::GreaterOrEqual => 0,
            Comparison::Less => -1,
        }
    }
}

/// Depth of the fixed stack used by [`PositionIndexedSequence::search_multiple`].
/// Running out of records only costs speed, never correctness.
const MAX_SEARCH_RECORDS: usize = 64;

#[derive(Debug, Clone, Copy, Default)]
struct SearchRecord {
    /// Tightened upper bound of the element range
    default_range_end: usize,
    /// First search term for which the bound no longer holds
    lasts_until_term: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionIndexedSequence<T> {
    elements: VecDeque<T>,
}

impl<T> Default for PositionIndexedSequence<T> {
    fn default() -> Self {
        Self {
            elements: VecDeque::new(),
        }
    }
}

impl<T> PositionIndexedSequence<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.elements.capacity()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.elements.get(index)
    }

    /// Mutable access to one element. The caller must not move its key past
    /// either neighbour.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.elements.get_mut(index)
    }

    pub fn first(&self) -> Option<&T> {
        self.elements.front()
    }

    pub fn last(&self) -> Option<&T> {
        self.elements.back()
    }

    /// Iterate in key order.
    pub fn iter(&self) -> vec_deque::Iter<'_, T> {
        self.elements.iter()
    }

    /// Mutable iteration in key order. Keys must keep their relative order.
    pub fn iter_mut(&mut self) -> vec_deque::IterMut<'_, T> {
        self.elements.iter_mut()
    }

    pub fn try_reserve(&mut self, additional: usize) -> Result<(), SequenceError> {
        self.elements.try_reserve(additional)?;
        Ok(())
    }

    /// Remove `count` elements starting at `index`. Out-of-range parts of the
    /// run are ignored.
    pub fn delete_at_index(&mut self, index: usize, count: usize) {
        let end = index.saturating_add(count).min(self.elements.len());
        if index < end {
            self.elements.drain(index..end);
        }
    }

    /// Move a contiguous run of elements out of the sequence.
    pub fn drain_range(&mut self, range: Range<usize>) -> vec_deque::Drain<'_, T> {
        self.elements.drain(range)
    }

    pub fn truncate(&mut self, len: usize) {
        self.elements.truncate(len);
    }

    pub fn clear(&mut self) {
        self.elements.clear();
    }

    pub fn shrink_to_fit(&mut self) {
        self.elements.shrink_to_fit();
    }

    /// Exchange backing storage with `other`. No element is copied.
    pub fn swap_with(&mut self, other: &mut Self) {
        std::mem::swap(&mut self.elements, &mut other.elements);
    }

    /// Detach the backing storage, leaving this sequence empty.
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }
}

impl<T: Keyed> PositionIndexedSequence<T> {
    /// Build from elements already in non-decreasing key order.
    pub fn from_sorted(elements: Vec<T>) -> Result<Self, SequenceError> {
        let sequence = Self {
            elements: VecDeque::from(elements),
        };
        sequence.check_sequentiality(false)?;
        Ok(sequence)
    }

    pub fn key_at(&self, index: usize) -> i32 {
        self.elements[index].key()
    }

    /// Binary search over the whole sequence. `GreaterOrEqual` yields the
    /// leftmost index with key `>= key` (or `len`); `Less` yields that minus one.
    pub fn search(&self, key: i32, comparison: Comparison) -> isize {
        self.search_in_range(key, comparison, 0, self.elements.len())
    }

    /// Binary search restricted to `range_begin..range_end`.
    pub fn search_in_range(
        &self,
        key: i32,
        comparison: Comparison,
        mut range_begin: usize,
        mut range_end: usize,
    ) -> isize {
        debug_assert!(range_begin <= range_end && range_end <= self.elements.len());
        while range_begin != range_end {
            let proposed = range_begin + ((range_end - range_begin) >> 1);
            if self.key_at(proposed) < key {
                range_begin = proposed + 1;
            } else {
                range_end = proposed;
            }
        }
        range_begin as isize + comparison.offset()
    }

    /// Leftmost index whose key is `>= key`, or `len` if there is none.
    pub fn search_geq(&self, key: i32) -> usize {
        self.search_in_range(key, Comparison::GreaterOrEqual, 0, self.elements.len()) as usize
    }

    /// Rightmost index whose key is `< key`.
    pub fn search_less(&self, key: i32) -> Option<usize> {
        self.search_geq(key).checked_sub(1)
    }

    pub fn search_exact(&self, key: i32) -> Option<usize> {
        let i = self.search_geq(key);
        (i < self.elements.len() && self.key_at(i) == key).then_some(i)
    }

    /// Solve two `GreaterOrEqual` searches at once. While narrowing in on
    /// `key_low`, every probe that lands at or beyond `key_high` also bounds the
    /// second search.
    pub fn search_dual(&self, key_low: i32, key_high: i32) -> (usize, usize) {
        debug_assert!(key_low <= key_high);
        let mut range_begin = 0;
        let mut range_end = self.elements.len();
        let mut range_end_for_high = self.elements.len();

        while range_begin != range_end {
            let proposed = range_begin + ((range_end - range_begin) >> 1);
            let key_here = self.key_at(proposed);
            if key_here < key_low {
                range_begin = proposed + 1;
            } else {
                range_end = proposed;
                if key_here >= key_high {
                    range_end_for_high = proposed;
                }
            }
        }

        let high = self.search_in_range(
            key_high,
            Comparison::GreaterOrEqual,
            range_begin,
            range_end_for_high,
        ) as usize;
        (range_begin, high)
    }

    /// `GreaterOrEqual` search for many non-decreasing keys at once, writing
    /// one index per key into `results`.
    ///
    /// The lower bound carries over from term to term. Upper bounds found
    /// while solving one term are pushed onto a small fixed stack together
    /// with the last term they still hold for, so later terms start from an
    /// already tight range. `range_end` limits the search to a prefix.
    pub fn search_multiple(&self, keys: &[i32], results: &mut [usize], range_end: Option<usize>) {
        debug_assert_eq!(keys.len(), results.len());
        debug_assert!(keys.windows(2).all(|w| w[0] <= w[1]));

        let num_terms = keys.len();
        let mut records = [SearchRecord::default(); MAX_SEARCH_RECORDS];
        records[0] = SearchRecord {
            default_range_end: range_end.unwrap_or(self.elements.len()).min(self.elements.len()),
            lasts_until_term: num_terms,
        };
        let mut current = 0;
        let mut range_begin = 0;

        for t in 0..num_terms {
            if t >= records[current].lasts_until_term {
                current -= 1;
            }

            let mut range_end = records[current].default_range_end.max(range_begin);
            let mut terms_range_end = records[current].lasts_until_term;

            while range_begin != range_end {
                let proposed = range_begin + ((range_end - range_begin) >> 1);
                let key_here = self.key_at(proposed);

                if key_here >= keys[t] {
                    range_end = proposed;

                    // How many of the following terms are also left of this element?
                    let mut terms_range_begin = t + 1;
                    while terms_range_begin != terms_range_end {
                        let proposed_term =
                            terms_range_begin + ((terms_range_end - terms_range_begin) >> 1);
                        if keys[proposed_term] >= key_here {
                            terms_range_end = proposed_term;
                        } else {
                            terms_range_begin = proposed_term + 1;
                        }
                    }

                    if terms_range_end > t + 1 {
                        if terms_range_end < records[current].lasts_until_term {
                            if current == MAX_SEARCH_RECORDS - 1 {
                                continue;
                            }
                            current += 1;
                        }
                        records[current] = SearchRecord {
                            default_range_end: proposed,
                            lasts_until_term: terms_range_end,
                        };
                    }
                } else {
                    range_begin = proposed + 1;
                }
            }

            results[t] = range_end;
        }
    }

    /// Insert `element` before any existing element with an equal or greater
    /// key. Returns the new element's index.
    pub fn insert(&mut self, element: T) -> Result<usize, SequenceError> {
        let i = self.search_geq(element.key());
        self.elements.try_reserve(1)?;
        self.elements.insert(i, element);
        Ok(i)
    }

    /// Insert a default element at `key`. With `hint_is_last` the caller
    /// guarantees no existing key is greater, and the search is skipped.
    pub fn insert_at_key(&mut self, key: i32, hint_is_last: bool) -> Result<usize, SequenceError>
    where
        T: Default,
    {
        let i = if hint_is_last {
            debug_assert!(self.last().map_or(true, |e| e.key() <= key));
            self.elements.len()
        } else {
            self.search_geq(key)
        };
        self.elements.try_reserve(1)?;
        let mut element = T::default();
        element.set_key(key);
        self.elements.insert(i, element);
        Ok(i)
    }

    /// Insert at an explicit index. Fails with `InvariantViolation` if that
    /// would put the element out of key order.
    pub fn insert_at_index(&mut self, index: usize, element: T) -> Result<(), SequenceError> {
        let key = element.key();
        if index > self.elements.len() {
            return Err(SequenceError::InvariantViolation { index, key });
        }
        let fits_left = index == 0 || self.key_at(index - 1) <= key;
        let fits_right = index == self.elements.len() || self.key_at(index) >= key;
        if !fits_left || !fits_right {
            return Err(SequenceError::InvariantViolation { index, key });
        }
        self.elements.try_reserve(1)?;
        self.elements.insert(index, element);
        Ok(())
    }

    /// Append during bulk reconstruction (loading). Elements must arrive in
    /// non-decreasing key order.
    pub fn push_in_order(&mut self, element: T) -> Result<usize, SequenceError> {
        let key = element.key();
        if let Some(last) = self.elements.back() {
            if last.key() > key {
                return Err(SequenceError::InvariantViolation {
                    index: self.elements.len(),
                    key,
                });
            }
        }
        self.elements.try_reserve(1)?;
        self.elements.push_back(element);
        Ok(self.elements.len() - 1)
    }

    /// Remove the leftmost element with exactly `key`. Returns whether one was found.
    pub fn delete_at_key(&mut self, key: i32) -> bool {
        match self.search_exact(key) {
            Some(i) => {
                self.elements.remove(i);
                true
            }
            None => false,
        }
    }

    /// Drop every element with a key `>= key`.
    pub fn truncate_from_key(&mut self, key: i32) {
        let i = self.search_geq(key);
        self.elements.truncate(i);
    }

    /// Rotate every key by `amount` within a cyclic range of
    /// `effective_length` ticks.
    ///
    /// Keys left of the rotation point move by `amount`, keys right of it by
    /// `amount - effective_length`, and the ring's start offset moves to the
    /// new leftmost element. Only the shorter side of the ring is moved.
    pub fn shift_horizontal(&mut self, amount: i32, effective_length: i32) {
        if self.elements.is_empty() || effective_length <= 0 {
            return;
        }

        let mut amount = amount % effective_length;
        if amount == 0 {
            return;
        }

        let mut cutoff_pos = -amount;
        if cutoff_pos < 0 {
            cutoff_pos += effective_length;
        }
        if amount < 0 {
            amount += effective_length;
        }

        let cutoff_index = self.search_geq(cutoff_pos);

        for (i, element) in self.elements.iter_mut().enumerate() {
            let key = element.key();
            if i < cutoff_index {
                element.set_key(key + amount);
            } else {
                element.set_key(key + amount - effective_length);
            }
        }

        self.elements.rotate_left(cutoff_index);
    }

    /// Verify ordering. With `strict`, equal neighbouring keys are an error too.
    pub fn check_sequentiality(&self, strict: bool) -> Result<(), SequenceError> {
        let mut last_key: Option<i32> = None;
        for (index, element) in self.elements.iter().enumerate() {
            let key = element.key();
            if let Some(last) = last_key {
                if key < last || (strict && key == last) {
                    log::error!(target: "sequence", "ordering broken at index {}: {} after {}", index, key, last);
                    return Err(SequenceError::InvariantViolation { index, key });
                }
            }
            last_key = Some(key);
        }
        Ok(())
    }
}

impl<T: Keyed + Clone> PositionIndexedSequence<T> {
    /// Copy into freshly allocated storage, reporting allocation failure
    /// instead of aborting.
    pub fn try_clone(&self) -> Result<Self, SequenceError> {
        let mut elements = VecDeque::new();
        elements.try_reserve_exact(self.elements.len())?;
        elements.extend(self.elements.iter().cloned());
        Ok(Self { elements })
    }

    /// Tile the elements below `wrap_point` forward by multiples of
    /// `wrap_point` until `end_pos`. Elements at or past `wrap_point` are
    /// discarded first, and nothing at or past `end_pos` is produced. Storage
    /// is reserved once, for the exact final count.
    pub fn generate_repeats(&mut self, wrap_point: i32, end_pos: i32) -> Result<(), SequenceError> {
        if self.elements.is_empty() || wrap_point <= 0 || end_pos < 0 {
            return Ok(());
        }

        let num_complete_repeats = (end_pos / wrap_point) as usize;
        let end_pos_within_first_repeat = end_pos - num_complete_repeats as i32 * wrap_point;
        let i_end_within_first_repeat = self.search_geq(end_pos_within_first_repeat);
        let old_num = self.search_geq(wrap_point);

        if num_complete_repeats == 0 {
            self.elements.truncate(i_end_within_first_repeat);
            return Ok(());
        }

        let new_num = old_num * num_complete_repeats + i_end_within_first_repeat;
        if new_num > self.elements.len() {
            self.elements
                .try_reserve_exact(new_num - self.elements.len())?;
        }

        self.elements.truncate(old_num);
        for r in 1..=num_complete_repeats {
            let count = if r == num_complete_repeats {
                i_end_within_first_repeat
            } else {
                old_num
            };
            let offset = wrap_point * r as i32;
            for i in 0..count {
                let mut element = self.elements[i].clone();
                element.set_key(element.key() + offset);
                self.elements.push_back(element);
            }
        }

        debug_assert_eq!(self.elements.len(), new_num);
        Ok(())
    }
}

impl<T> Index<usize> for PositionIndexedSequence<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.elements[index]
    }
}

impl<'a, T> IntoIterator for &'a PositionIndexedSequence<T> {
    type Item = &'a T;
    type IntoIter = vec_deque::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

impl<T: Serialize> Serialize for PositionIndexedSequence<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.elements.iter())
    }
}

impl<'de, T: Deserialize<'de> + Keyed> Deserialize<'de> for PositionIndexedSequence<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let elements = Vec::<T>::deserialize(deserializer)?;
        Self::from_sorted(elements).map_err(D::Error::custom)
    }
}
