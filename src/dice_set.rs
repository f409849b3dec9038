use crate::error::{CpmError, CpmResult};
use crate::rng::Rng;

const ABSENT: usize = usize::MAX;

/// Set of lattice indices with O(1) insert, remove-by-value and uniform draw.
///
/// Elements live densely in `elements`; `positions[i]` records where index
/// `i` sits, or `ABSENT`. Removal swaps the last element into the hole.
#[derive(Clone, Debug, Default)]
pub struct DiceSet {
    elements: Vec<usize>,
    positions: Vec<usize>,
}

impl DiceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-size the position map for indices below `capacity`.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            elements: Vec::new(),
            positions: vec![ABSENT; capacity],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    #[inline]
    pub fn contains(&self, i: usize) -> bool {
        self.positions.get(i).is_some_and(|&p| p != ABSENT)
    }

    pub fn insert(&mut self, i: usize) {
        if self.contains(i) {
            return;
        }
        if i >= self.positions.len() {
            self.positions.resize(i + 1, ABSENT);
        }
        self.positions[i] = self.elements.len();
        self.elements.push(i);
    }

    pub fn remove(&mut self, i: usize) {
        if !self.contains(i) {
            return;
        }
        let pos = self.positions[i];
        self.positions[i] = ABSENT;
        let last = self.elements.len() - 1;
        if pos != last {
            let moved = self.elements[last];
            self.elements[pos] = moved;
            self.positions[moved] = pos;
        }
        self.elements.pop();
    }

    /// Draw a present element uniformly. None when empty.
    #[inline]
    pub fn sample(&self, rng: &mut Rng) -> Option<usize> {
        if self.elements.is_empty() {
            return None;
        }
        Some(self.elements[rng.range_usize(self.elements.len())])
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.elements.iter().copied()
    }

    /// Cross-check the position map against the element list.
    pub fn check_consistency(&self) -> CpmResult<()> {
        for (pos, &e) in self.elements.iter().enumerate() {
            if self.positions.get(e).copied() != Some(pos) {
                return Err(CpmError::invariant(format!(
                    "dice set element {} at slot {} has stale position",
                    e, pos
                )));
            }
        }
        let mapped = self.positions.iter().filter(|&&p| p != ABSENT).count();
        if mapped != self.elements.len() {
            return Err(CpmError::invariant(format!(
                "dice set maps {} positions but holds {} elements",
                mapped,
                self.elements.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::Rng;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    #[test]
    fn insert_is_idempotent() {
        let mut s = DiceSet::new();
        s.insert(5);
        s.insert(5);
        assert_eq!(s.len(), 1);
        assert!(s.contains(5));
        assert!(!s.contains(4));
        assert!(!s.contains(500));
    }

    #[test]
    fn remove_swaps_last_into_hole() {
        let mut s = DiceSet::with_capacity(10);
        for i in [1, 2, 3, 4] {
            s.insert(i);
        }
        s.remove(2);
        s.remove(2);
        assert_eq!(s.len(), 3);
        assert_eq!(s.iter().collect::<Vec<_>>(), vec![1, 4, 3]);
        s.check_consistency().unwrap();
    }

    #[test]
    fn sample_empty_is_none() {
        let s = DiceSet::new();
        assert_eq!(s.sample(&mut Rng::new(1)), None);
    }

    #[test]
    fn sample_is_roughly_uniform() {
        let mut s = DiceSet::new();
        for i in [3, 7, 11, 19] {
            s.insert(i);
        }
        let mut rng = Rng::new(99);
        let mut counts = [0usize; 20];
        for _ in 0..40_000 {
            counts[s.sample(&mut rng).unwrap()] += 1;
        }
        for i in [3, 7, 11, 19] {
            assert!((9_000..11_000).contains(&counts[i]), "count {}", counts[i]);
        }
    }

    proptest! {
        #[test]
        fn matches_reference_set(ops in prop::collection::vec((any::<bool>(), 0usize..64), 0..300), seed in any::<u64>()) {
            let mut s = DiceSet::with_capacity(16);
            let mut reference = BTreeSet::new();
            for (insert, i) in ops {
                if insert {
                    s.insert(i);
                    reference.insert(i);
                } else {
                    s.remove(i);
                    reference.remove(&i);
                }
            }
            prop_assert!(s.check_consistency().is_ok());
            prop_assert_eq!(s.len(), reference.len());
            let members: BTreeSet<usize> = s.iter().collect();
            prop_assert_eq!(members.len(), s.len());
            prop_assert_eq!(&members, &reference);
            let mut rng = Rng::new(seed);
            for _ in 0..20 {
                match s.sample(&mut rng) {
                    Some(i) => prop_assert!(reference.contains(&i)),
                    None => prop_assert!(reference.is_empty()),
                }
            }
        }
    }
}
