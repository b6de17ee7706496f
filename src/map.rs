//! Bitmap-indexed compact map for keys in `[0, 64)`.
//!
//! # Layout
//!
//! - `presence`: one bit per key; bit `k` set iff key `k` has a value.
//! - `values`: only the present values, sorted by key, no gaps.
//!
//! The value for key `k` lives at `popcount(presence & ((1 << k) - 1))`,
//! the rank of `k` among the present keys. No index is ever stored, so the
//! bitmap and the packed values cannot drift apart except through a length
//! mismatch, which every mutation re-establishes before returning.
//!
//! Lookups are one mask and one `popcnt`. Inserts and removals additionally
//! shift the values above the target slot, at most 63 words.
//!
//! `TinyMap` has no interior synchronization. Share it across threads behind
//! a lock.

use std::fmt;
use std::iter::FusedIterator;

use crate::error::Result;
use crate::key::Key;

/// A map from [`Key`] to `u64` storing one word per present key.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct TinyMap {
    presence: u64,
    values: Vec<u64>,
}

impl fmt::Debug for TinyMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl TinyMap {
    /// Create an empty map. Does not allocate.
    pub const fn new() -> Self {
        Self {
            presence: 0,
            values: Vec::new(),
        }
    }

    /// Slot of `key` in `values`: the number of present keys below it.
    #[inline]
    fn index_of(&self, key: Key) -> usize {
        (self.presence & key.below()).count_ones() as usize
    }

    /// Build a map from raw parts without checking that they agree.
    #[cfg(test)]
    pub(crate) fn from_raw_parts(presence: u64, values: Vec<u64>) -> Self {
        Self { presence, values }
    }

    #[inline]
    fn debug_check(&self) {
        debug_assert_eq!(self.presence.count_ones() as usize, self.values.len());
    }

    /// Insert `value` under `key`, returning the previous value if there was one.
    ///
    /// Overwrites happen in place. A new key opens a slot by shifting the
    /// larger keys' values up by one; the storage grows before the presence
    /// bit is set.
    pub fn insert(&mut self, key: Key, value: u64) -> Option<u64> {
        let idx = self.index_of(key);
        if self.presence & key.bit() != 0 {
            return Some(std::mem::replace(&mut self.values[idx], value));
        }

        self.values.insert(idx, value);
        self.presence |= key.bit();
        self.debug_check();
        None
    }

    /// Like [`insert`](Self::insert), but reports allocation failure instead
    /// of aborting.
    ///
    /// On [`Error::ResourceExhausted`](crate::Error::ResourceExhausted) the map
    /// is unchanged.
    pub fn try_insert(&mut self, key: Key, value: u64) -> Result<Option<u64>> {
        if self.presence & key.bit() == 0 {
            self.values.try_reserve(1)?;
        }
        Ok(self.insert(key, value))
    }

    /// Remove `key`, returning its value. Absent keys are a no-op.
    pub fn remove(&mut self, key: Key) -> Option<u64> {
        if self.presence & key.bit() == 0 {
            return None;
        }

        let idx = self.index_of(key);
        let old = self.values.remove(idx);
        self.presence &= !key.bit();
        self.debug_check();
        Some(old)
    }

    /// Return the value stored under `key`.
    #[inline]
    pub fn get(&self, key: Key) -> Option<u64> {
        if self.presence & key.bit() == 0 {
            return None;
        }
        Some(self.values[self.index_of(key)])
    }

    /// Return `(value, true)` if `key` is present, `(0, false)` otherwise.
    #[inline]
    pub fn lookup(&self, key: Key) -> (u64, bool) {
        match self.get(key) {
            Some(v) => (v, true),
            None => (0, false),
        }
    }

    /// Mutable access to the value under `key`.
    pub fn get_mut(&mut self, key: Key) -> Option<&mut u64> {
        if self.presence & key.bit() == 0 {
            return None;
        }
        let idx = self.index_of(key);
        Some(&mut self.values[idx])
    }

    /// Return true if `key` has a value.
    #[inline]
    pub fn contains_key(&self, key: Key) -> bool {
        self.presence & key.bit() != 0
    }

    /// Number of present keys.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Return true if no key is present.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.presence == 0
    }

    /// The presence bitmap: bit `k` is set iff key `k` is present.
    #[inline]
    pub fn presence(&self) -> u64 {
        self.presence
    }

    /// Remove every entry, keeping the allocated storage.
    pub fn clear(&mut self) {
        self.values.clear();
        self.presence = 0;
    }

    /// Heap memory used by the packed values, in bytes.
    pub fn heap_bytes(&self) -> usize {
        self.values.capacity() * std::mem::size_of::<u64>()
    }

    /// Entry with the smallest key.
    pub fn first_key_value(&self) -> Option<(Key, u64)> {
        let key = Key::lowest_in(self.presence)?;
        Some((key, self.values[0]))
    }

    /// Entry with the largest key.
    pub fn last_key_value(&self) -> Option<(Key, u64)> {
        let key = Key::highest_in(self.presence)?;
        Some((key, *self.values.last()?))
    }

    /// Keep only the entries for which `f` returns true.
    pub fn retain<F>(&mut self, mut f: F)
    where
        F: FnMut(Key, &mut u64) -> bool,
    {
        let mut keys = Keys {
            bits: self.presence,
        };
        let mut presence = 0u64;
        self.values.retain_mut(|v| {
            let Some(key) = keys.next() else {
                return false;
            };
            let keep = f(key, v);
            if keep {
                presence |= key.bit();
            }
            keep
        });
        self.presence = presence;
        self.debug_check();
    }

    /// Entries in ascending key order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            keys: self.keys(),
            values: self.values.iter(),
        }
    }

    /// Present keys in ascending order.
    pub fn keys(&self) -> Keys {
        Keys {
            bits: self.presence,
        }
    }

    /// Values in ascending key order.
    pub fn values(&self) -> impl DoubleEndedIterator<Item = u64> + ExactSizeIterator + '_ {
        self.values.iter().copied()
    }
}

/// Iterator over the set bits of a presence bitmap, as keys.
#[derive(Clone, Debug)]
pub struct Keys {
    bits: u64,
}

impl Iterator for Keys {
    type Item = Key;

    fn next(&mut self) -> Option<Key> {
        let key = Key::lowest_in(self.bits)?;
        self.bits &= self.bits - 1;
        Some(key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.bits.count_ones() as usize;
        (n, Some(n))
    }
}

impl DoubleEndedIterator for Keys {
    fn next_back(&mut self) -> Option<Key> {
        let key = Key::highest_in(self.bits)?;
        self.bits &= !key.bit();
        Some(key)
    }
}

impl ExactSizeIterator for Keys {}
impl FusedIterator for Keys {}

/// Borrowing iterator over `(key, value)` pairs.
#[derive(Clone, Debug)]
pub struct Iter<'a> {
    keys: Keys,
    values: std::slice::Iter<'a, u64>,
}

impl Iterator for Iter<'_> {
    type Item = (Key, u64);

    fn next(&mut self) -> Option<(Key, u64)> {
        Some((self.keys.next()?, *self.values.next()?))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.keys.size_hint()
    }
}

impl DoubleEndedIterator for Iter<'_> {
    fn next_back(&mut self) -> Option<(Key, u64)> {
        Some((self.keys.next_back()?, *self.values.next_back()?))
    }
}

impl ExactSizeIterator for Iter<'_> {}
impl FusedIterator for Iter<'_> {}

/// Owning iterator over `(key, value)` pairs.
#[derive(Debug)]
pub struct IntoIter {
    keys: Keys,
    values: std::vec::IntoIter<u64>,
}

impl Iterator for IntoIter {
    type Item = (Key, u64);

    fn next(&mut self) -> Option<(Key, u64)> {
        Some((self.keys.next()?, self.values.next()?))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.keys.size_hint()
    }
}

impl DoubleEndedIterator for IntoIter {
    fn next_back(&mut self) -> Option<(Key, u64)> {
        Some((self.keys.next_back()?, self.values.next_back()?))
    }
}

impl ExactSizeIterator for IntoIter {}
impl FusedIterator for IntoIter {}

impl<'a> IntoIterator for &'a TinyMap {
    type Item = (Key, u64);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

impl IntoIterator for TinyMap {
    type Item = (Key, u64);
    type IntoIter = IntoIter;

    fn into_iter(self) -> IntoIter {
        IntoIter {
            keys: Keys {
                bits: self.presence,
            },
            values: self.values.into_iter(),
        }
    }
}

impl Extend<(Key, u64)> for TinyMap {
    fn extend<I: IntoIterator<Item = (Key, u64)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl FromIterator<(Key, u64)> for TinyMap {
    fn from_iter<I: IntoIterator<Item = (Key, u64)>>(iter: I) -> Self {
        let mut map = TinyMap::new();
        map.extend(iter);
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn k(raw: u8) -> Key {
        Key::new(raw).unwrap()
    }

    #[test]
    fn test_insert_overwrite_remove() {
        let mut m = TinyMap::new();
        assert_eq!(m.insert(k(5), 100), None);
        assert_eq!(m.insert(k(2), 200), None);
        assert_eq!(m.insert(k(5), 300), Some(100));
        assert_eq!(m.len(), 2);

        assert_eq!(m.get(k(5)), Some(300));
        assert_eq!(m.get(k(2)), Some(200));
        assert_eq!(m.lookup(k(0)), (0, false));

        assert_eq!(m.remove(k(2)), Some(200));
        assert_eq!(m.lookup(k(2)), (0, false));
        assert_eq!(m.lookup(k(5)), (300, true));
    }

    #[test]
    fn test_boundary_keys() {
        let mut m = TinyMap::new();
        m.insert(Key::MAX, 1);
        m.insert(Key::MIN, 2);
        assert_eq!(m.get(Key::MAX), Some(1));
        assert_eq!(m.get(Key::MIN), Some(2));

        m.remove(Key::MAX);
        assert_eq!(m.get(Key::MIN), Some(2));
        assert_eq!(m.presence(), 1);
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut m = TinyMap::new();
        m.insert(k(10), 7);
        let before = m.clone();
        assert_eq!(m.remove(k(11)), None);
        assert_eq!(m.remove(k(11)), None);
        assert_eq!(m, before);
    }

    #[test]
    fn test_values_packed_in_key_order() {
        let mut m = TinyMap::new();
        for raw in [40u8, 3, 63, 17, 0] {
            m.insert(k(raw), raw as u64 * 10);
        }
        assert_eq!(m.values().collect::<Vec<_>>(), vec![0, 30, 170, 400, 630]);
        assert_eq!(
            m.keys().map(Key::get).collect::<Vec<_>>(),
            vec![0, 3, 17, 40, 63]
        );
        assert_eq!(m.presence().count_ones() as usize, m.len());
    }

    #[test]
    fn test_fill_and_drain_all_keys() {
        let mut m = TinyMap::new();
        for key in Key::all().rev() {
            m.insert(key, u64::from(key.get()) + 1);
        }
        assert_eq!(m.presence(), u64::MAX);
        assert_eq!(m.len(), 64);
        for key in Key::all() {
            assert_eq!(m.get(key), Some(u64::from(key.get()) + 1));
        }
        for key in Key::all().step_by(2) {
            m.remove(key);
        }
        assert_eq!(m.presence(), 0xAAAA_AAAA_AAAA_AAAA);
        assert_eq!(m.len(), 32);
        assert_eq!(m.first_key_value(), Some((k(1), 2)));
        assert_eq!(m.last_key_value(), Some((k(63), 64)));

        assert_eq!(TinyMap::new().first_key_value(), None);
        assert_eq!(TinyMap::new().last_key_value(), None);
    }

    #[test]
    fn test_iter_both_ends() {
        let m: TinyMap = [(k(9), 1), (k(1), 2), (k(33), 3)].into_iter().collect();
        let mut it = m.iter();
        assert_eq!(it.len(), 3);
        assert_eq!(it.next(), Some((k(1), 2)));
        assert_eq!(it.next_back(), Some((k(33), 3)));
        assert_eq!(it.next(), Some((k(9), 1)));
        assert_eq!(it.next(), None);

        let owned: Vec<_> = m.into_iter().rev().collect();
        assert_eq!(owned, vec![(k(33), 3), (k(9), 1), (k(1), 2)]);
    }

    #[test]
    fn test_retain_and_get_mut() {
        let mut m: TinyMap = Key::all().map(|key| (key, u64::from(key.get()))).collect();
        m.retain(|key, v| {
            *v += 1;
            key.get() % 3 == 0
        });
        assert_eq!(m.len(), 22);
        assert_eq!(m.get(k(3)), Some(4));
        assert_eq!(m.get(k(4)), None);

        *m.get_mut(k(6)).unwrap() = 99;
        assert_eq!(m.get(k(6)), Some(99));
        assert!(m.get_mut(k(7)).is_none());
    }

    #[test]
    fn test_try_insert_and_clear() {
        let mut m = TinyMap::new();
        assert_eq!(m.try_insert(k(12), 5).unwrap(), None);
        assert_eq!(m.try_insert(k(12), 6).unwrap(), Some(5));
        assert!(m.heap_bytes() >= 8);
        m.clear();
        assert!(m.is_empty());
        assert_eq!(m.get(k(12)), None);
    }

    #[test]
    fn test_debug_renders_as_map() {
        let m: TinyMap = [(k(2), 20), (k(1), 10)].into_iter().collect();
        assert_eq!(format!("{:?}", m), "{1: 10, 2: 20}");
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_inline_footprint() {
        assert_eq!(std::mem::size_of::<TinyMap>(), 32);
        assert_eq!(TinyMap::new().heap_bytes(), 0);
    }
}
