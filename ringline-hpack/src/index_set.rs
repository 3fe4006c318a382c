use bit_vec::BitVec;

/// Set of header table indices, one bit per index.
///
/// Table mutations renumber every member in a single pass: an insert at the
/// front shifts all members up, an eviction drops a range and shifts the
/// members above it down.
#[derive(Debug, Clone, Default)]
pub(crate) struct IndexSet {
    bits: BitVec,
}

impl IndexSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn contains(&self, index: usize) -> bool {
        self.bits.get(index).unwrap_or(false)
    }

    /// Returns `true` if `index` was not already present.
    pub(crate) fn insert(&mut self, index: usize) -> bool {
        if index >= self.bits.len() {
            self.bits.grow(index + 1 - self.bits.len(), false);
        }
        let added = !self.bits[index];
        self.bits.set(index, true);
        added
    }

    /// Returns `true` if `index` was present.
    pub(crate) fn remove(&mut self, index: usize) -> bool {
        if !self.contains(index) {
            return false;
        }
        self.bits.set(index, false);
        true
    }

    pub(crate) fn clear(&mut self) {
        self.bits = BitVec::new();
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.bits.none()
    }

    pub(crate) fn len(&self) -> usize {
        self.bits.iter().filter(|&bit| bit).count()
    }

    /// Members in ascending order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits
            .iter()
            .enumerate()
            .filter_map(|(index, bit)| bit.then_some(index))
    }

    /// Renumber for `count` entries inserted at index 0.
    pub(crate) fn shift_up(&mut self, count: usize) {
        if self.is_empty() {
            return;
        }
        let mut shifted = BitVec::from_elem(count, false);
        shifted.extend(self.bits.iter());
        self.bits = shifted;
    }

    /// Renumber for the entries at `start..start + count` being removed.
    /// Members in that range are dropped, members above it move down.
    pub(crate) fn remove_range(&mut self, start: usize, count: usize) {
        if count == 0 || self.is_empty() {
            return;
        }
        let end = start + count;
        self.bits = self
            .bits
            .iter()
            .enumerate()
            .filter(|(index, _)| !(start..end).contains(index))
            .map(|(_, bit)| bit)
            .collect();
    }

    /// Replace the contents with those of `other`, leaving `other` empty.
    pub(crate) fn take_from(&mut self, other: &mut IndexSet) {
        self.bits = std::mem::take(&mut other.bits);
    }
}

impl PartialEq for IndexSet {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}

impl Eq for IndexSet {}

impl FromIterator<usize> for IndexSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut set = IndexSet::new();
        for index in iter {
            set.insert(index);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn members(set: &IndexSet) -> Vec<usize> {
        set.iter().collect()
    }

    #[test]
    fn insert_remove_contains() {
        let mut set = IndexSet::new();
        assert!(set.is_empty());
        assert!(set.insert(5));
        assert!(!set.insert(5));
        assert!(set.insert(0));
        assert!(set.contains(5));
        assert!(!set.contains(4));
        assert!(!set.contains(500));
        assert_eq!(set.len(), 2);
        assert!(set.remove(5));
        assert!(!set.remove(5));
        assert_eq!(members(&set), vec![0]);
    }

    #[test]
    fn shift_up_renumbers_all() {
        let mut set: IndexSet = [0, 2, 7].into_iter().collect();
        set.shift_up(1);
        assert_eq!(members(&set), vec![1, 3, 8]);
        set.shift_up(3);
        assert_eq!(members(&set), vec![4, 6, 11]);
    }

    #[test]
    fn remove_range_drops_and_shifts_down() {
        let mut set: IndexSet = [0, 3, 4, 5, 9].into_iter().collect();
        set.remove_range(3, 2);
        assert_eq!(members(&set), vec![0, 3, 7]);
    }

    #[test]
    fn equality_ignores_trailing_capacity() {
        let mut a: IndexSet = [1, 2].into_iter().collect();
        let b: IndexSet = [1, 2].into_iter().collect();
        a.insert(40);
        a.remove(40);
        assert_eq!(a, b);
    }

    #[test]
    fn take_from_moves_members() {
        let mut active: IndexSet = [3].into_iter().collect();
        let mut alternate: IndexSet = [0, 1].into_iter().collect();
        active.take_from(&mut alternate);
        assert_eq!(members(&active), vec![0, 1]);
        assert!(alternate.is_empty());
    }
}
