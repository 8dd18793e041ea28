// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Fixed-width bitset over variable indices.

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BitSet {
    bits: Vec<u64>,
    len: usize,
}

impl BitSet {
    #[must_use]
    pub fn new_empty(len: usize) -> Self {
        Self {
            bits: vec![0; len.div_ceil(64)],
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|w| *w == 0)
    }

    #[must_use]
    pub fn get(&self, idx: usize) -> bool {
        if idx >= self.len {
            return false;
        }
        (self.bits[idx / 64] >> (idx % 64)) & 1 == 1
    }

    pub fn set(&mut self, idx: usize) {
        if idx < self.len {
            self.bits[idx / 64] |= 1_u64 << (idx % 64);
        }
    }

    pub fn clear(&mut self, idx: usize) {
        if idx < self.len {
            self.bits[idx / 64] &= !(1_u64 << (idx % 64));
        }
    }

    pub fn union_with(&mut self, other: &Self) {
        for (a, b) in self.bits.iter_mut().zip(other.bits.iter()) {
            *a |= *b;
        }
    }

    pub fn intersect_with(&mut self, other: &Self) {
        for (a, b) in self.bits.iter_mut().zip(other.bits.iter()) {
            *a &= *b;
        }
    }

    /// Set indices in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(|i| self.get(*i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_clear_across_words() {
        let mut s = BitSet::new_empty(130);
        s.set(0);
        s.set(64);
        s.set(129);
        s.set(500);
        assert!(s.get(64) && s.get(129));
        assert!(!s.get(500));
        s.clear(64);
        assert_eq!(s.iter().collect::<Vec<_>>(), vec![0, 129]);
    }

    #[test]
    fn union_and_intersect() {
        let mut a = BitSet::new_empty(8);
        let mut b = BitSet::new_empty(8);
        a.set(1);
        b.set(1);
        b.set(3);
        let mut u = a.clone();
        u.union_with(&b);
        assert_eq!(u.iter().collect::<Vec<_>>(), vec![1, 3]);
        b.intersect_with(&a);
        assert_eq!(b, a);
        assert!(BitSet::new_empty(8).is_empty());
    }
}
