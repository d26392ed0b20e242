//! # Insertion-Ordered Map
//!
//! Keyed collection that iterates in first-insertion order. Used for the
//! parser's record collections and the loader's id maps, where load order
//! must follow source order.

use std::borrow::Borrow;
use std::collections::BTreeMap;

/// Map preserving first-insertion order.
///
/// Keys are held once in `order`; `index` maps each key to its slot.
/// Re-inserting an existing key replaces the value in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedMap<K: Ord + Clone, V> {
    order: Vec<(K, V)>,
    index: BTreeMap<K, usize>,
}

impl<K: Ord + Clone, V> Default for OrderedMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + Clone, V> OrderedMap<K, V> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            order: Vec::new(),
            index: BTreeMap::new(),
        }
    }

    /// Insert or replace. Returns the previous value for an existing key.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        if let Some(&slot) = self.index.get(&key) {
            return self
                .order
                .get_mut(slot)
                .map(|entry| std::mem::replace(&mut entry.1, value));
        }
        self.index.insert(key.clone(), self.order.len());
        self.order.push((key, value));
        None
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.index
            .get(key)
            .and_then(|&slot| self.order.get(slot))
            .map(|(_, value)| value)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.order.iter().map(|(key, value)| (key, value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.order.iter().map(|(key, _)| key)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.order.iter().map(|(_, value)| value)
    }
}

impl<K: Ord + Clone, V> FromIterator<(K, V)> for OrderedMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}
