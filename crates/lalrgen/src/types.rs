//! Shared collection types.

use crate::grammar::TerminalID;
use std::fmt;

type BuildHasher = std::hash::BuildHasherDefault<rustc_hash::FxHasher>;

pub type Map<K, V> = indexmap::IndexMap<K, V, BuildHasher>;
pub type Set<T> = indexmap::IndexSet<T, BuildHasher>;

/// A set of terminal symbols, ordered by their IDs.
#[derive(Default, Clone, PartialEq, Eq)]
pub struct TerminalSet {
    inner: bit_set::BitSet,
}

impl TerminalSet {
    pub fn contains(&self, id: TerminalID) -> bool {
        self.inner.contains(id.into_raw().into())
    }
    pub fn insert(&mut self, id: TerminalID) -> bool {
        self.inner.insert(id.into_raw().into())
    }
    pub fn union_with(&mut self, other: &Self) {
        self.inner.union_with(&other.inner)
    }
    /// Adds the elements of `other`, returning whether this set has grown.
    pub fn extend_from(&mut self, other: &Self) -> bool {
        let before = self.inner.len();
        self.inner.union_with(&other.inner);
        self.inner.len() != before
    }
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
    pub fn len(&self) -> usize {
        self.inner.len()
    }
    pub fn iter(&self) -> impl Iterator<Item = TerminalID> + '_ {
        self.inner.iter().map(|raw| {
            let raw = u16::try_from(raw).unwrap_or_else(|_| unreachable!("terminal id out of range"));
            TerminalID::from_raw(raw)
        })
    }
}

impl fmt::Debug for TerminalSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl FromIterator<TerminalID> for TerminalSet {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = TerminalID>,
    {
        Self {
            inner: iter.into_iter().map(|t| t.into_raw().into()).collect(),
        }
    }
}

impl Extend<TerminalID> for TerminalSet {
    fn extend<I: IntoIterator<Item = TerminalID>>(&mut self, iter: I) {
        for t in iter {
            self.insert(t);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_set_ops() {
        let t = TerminalID::from_raw;
        let mut set = TerminalSet::default();
        assert!(set.is_empty());

        assert!(set.insert(t(3)));
        assert!(!set.insert(t(3)));
        set.extend([t(1), t(5)]);
        assert_eq!(set.len(), 3);
        assert!(set.contains(t(5)));
        assert!(!set.contains(t(2)));
        assert_eq!(set.iter().collect::<Vec<_>>(), [t(1), t(3), t(5)]);

        let other: TerminalSet = [t(0), t(5)].into_iter().collect();
        assert!(set.extend_from(&other));
        assert!(!set.extend_from(&other));
        assert_eq!(set.len(), 4);
        let expected = std::collections::BTreeSet::from([t(0), t(1), t(3), t(5)]);
        assert_eq!(format!("{:?}", set), format!("{:?}", expected));
    }
}
