use super::word_mask_64;
use num_integer::div_ceil;

/// Fixed size (at runtime) set of small integers stored as an array of bits.
///
/// The scheduler uses it to remember which nodes are already waiting for the next
/// micro step, so a node notified by several inputs is only evaluated once.
///
/// [NodeSet] allocates bits in multiples of 64.
/// # Example
/// ```
/// # use digisim::data_structures::NodeSet;
/// let mut s = NodeSet::new(2);
///
/// assert_eq!(s.capacity(), 64);
///
/// assert_eq!(s.insert(1), true);
/// assert_eq!(s.insert(1), false);
/// assert_eq!(s.contains(1), true);
///
/// s.remove(1);
/// assert_eq!(s.contains(1), false);
/// ```
///
/// # Panics
///
/// Panics if you try to read or write an index >= [NodeSet::capacity()]
///
/// ```should_panic
/// # use digisim::data_structures::NodeSet;
/// let s = NodeSet::new(2);
///
/// s.contains(64);
/// ```
#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Default)]
pub struct NodeSet {
    words: Vec<u64>,
}
impl NodeSet {
    /// Returns a new empty [NodeSet] able to hold indexes `0..n`.
    pub fn new(n: usize) -> NodeSet {
        NodeSet {
            words: vec![0; div_ceil(n, 64)],
        }
    }

    /// Returns true if `index` is in the set.
    ///
    /// # Panics
    ///
    /// Panics if `index` >= [NodeSet::capacity()]
    pub fn contains(&self, index: usize) -> bool {
        let (word_index, mask) = word_mask_64(index);
        let word = match self.words.get(word_index) {
            Some(word) => word,
            None => panic!(
                "Tried to access index out of bounds:{}, size:{}",
                index,
                self.capacity()
            ),
        };
        word & mask != 0
    }

    /// Adds `index` to the set, returns true if it wasn't there before.
    ///
    /// # Panics
    ///
    /// Panics if `index` >= [NodeSet::capacity()]
    pub fn insert(&mut self, index: usize) -> bool {
        let (word_index, mask) = word_mask_64(index);
        let word = &mut self.words[word_index];
        let absent = *word & mask == 0;
        *word |= mask;
        absent
    }

    /// Removes `index` from the set.
    ///
    /// # Panics
    ///
    /// Panics if `index` >= [NodeSet::capacity()]
    pub fn remove(&mut self, index: usize) {
        let (word_index, mask) = word_mask_64(index);
        self.words[word_index] &= !mask;
    }

    /// Empties the set.
    pub fn clear(&mut self) {
        for word in &mut self.words {
            *word = 0
        }
    }

    /// Returns the number of indexes in the set.
    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Returns true if no index is in the set.
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    /// Returns the number of indexes the set can hold.
    pub fn capacity(&self) -> usize {
        self.words.len() * 64
    }
}
