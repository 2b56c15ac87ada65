use std::fmt::{self, Display, Formatter};

/// Transparent type that represents an index into a [Slab].
///
/// used to discourage accessing the [Slab] at arbitrary indexes.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct SlabIndex(pub(super) usize);
impl SlabIndex {
    /// Returns the inner [usize].
    ///
    /// Annoyingly long names discourage use and make you really think about what you are doing.
    pub fn i_actually_really_know_what_i_am_doing_and_i_want_the_inner_usize(&self) -> usize {
        self.0
    }
    /// Returns a new [SlabIndex] created from the provided [usize].
    ///
    /// Annoyingly long names discourage use and make you really think about what you are doing.
    pub fn i_actually_really_know_what_i_am_doing_and_i_want_to_construct_from_usize(
        i: usize,
    ) -> Self {
        Self(i)
    }
}
impl Display for SlabIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Arena that stores items of the same type and reuses the slots of removed items.
///
/// Nodes live here while a circuit is being wired, which lets analysis passes remove
/// and replace nodes without shifting the indexes other nodes refer to.
///
/// # Example
///
/// ```
/// # use digisim::data_structures::Slab;
/// let mut s = Slab::new();
///
/// let index = s.insert("and");
/// assert_eq!(s.get(index), Some(&"and"));
///
/// assert_eq!(s.remove(index), Some("and"));
/// assert_eq!(s.get(index), None);
///
/// // The freed slot is handed out again.
/// assert_eq!(s.insert("or"), index);
/// ```
#[derive(Debug, Clone)]
pub struct Slab<T> {
    data: Vec<Option<T>>,
    removed_indexes: Vec<SlabIndex>,
}

impl<T> Slab<T> {
    /// Returns an empty [Slab].
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            removed_indexes: Vec::new(),
        }
    }

    /// Inserts an item and returns its index, reusing a free slot if one is available.
    pub fn insert(&mut self, item: T) -> SlabIndex {
        if let Some(index) = self.removed_indexes.pop() {
            self.data[index.0] = Some(item);
            index
        } else {
            let index = SlabIndex(self.data.len());
            self.data.push(Some(item));
            index
        }
    }

    /// Returns a reference to the item at `index`, [None] if it has been removed.
    pub fn get(&self, index: SlabIndex) -> Option<&T> {
        self.data.get(index.0).and_then(Option::as_ref)
    }

    /// Returns a mutable reference to the item at `index`, [None] if it has been removed.
    pub fn get_mut(&mut self, index: SlabIndex) -> Option<&mut T> {
        self.data.get_mut(index.0).and_then(Option::as_mut)
    }

    /// Returns true if there is an item at `index`.
    pub fn contains(&self, index: SlabIndex) -> bool {
        self.get(index).is_some()
    }

    /// Removes an item from the Slab and returns it.
    ///
    /// `index` will be reused on the next call to [Slab::insert].
    pub fn remove(&mut self, index: SlabIndex) -> Option<T> {
        let item = self.data.get_mut(index.0)?.take()?;
        self.removed_indexes.push(index);
        Some(item)
    }

    /// Returns the number of items in the slab.
    ///
    /// This is different from the number of allocated slots, see [Slab::total_len].
    pub fn len(&self) -> usize {
        self.data.len() - self.removed_indexes.len()
    }

    /// Returns true if the slab holds no items.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of allocated slots in the slab, some of them could be empty.
    pub fn total_len(&self) -> usize {
        self.data.len()
    }

    /// Returns an iterator over pairs of `(SlabIndex, &T)` in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (SlabIndex, &T)> {
        self.data
            .iter()
            .enumerate()
            .filter_map(|(i, item)| Some((SlabIndex(i), item.as_ref()?)))
    }

    /// Returns an iterator over pairs of `(SlabIndex, &mut T)` in slot order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (SlabIndex, &mut T)> {
        self.data
            .iter_mut()
            .enumerate()
            .filter_map(|(i, item)| Some((SlabIndex(i), item.as_mut()?)))
    }
}

impl<T> IntoIterator for Slab<T> {
    type IntoIter = IntoIter<T>;
    type Item = (SlabIndex, T);
    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            inner: self.data.into_iter().enumerate(),
        }
    }
}

/// [IntoIterator] for [Slab], skips empty slots.
pub struct IntoIter<T> {
    inner: std::iter::Enumerate<std::vec::IntoIter<Option<T>>>,
}
impl<T> Iterator for IntoIter<T> {
    type Item = (SlabIndex, T);
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (i, item) = self.inner.next()?;
            if let Some(item) = item {
                return Some((SlabIndex(i), item));
            }
        }
    }
}

impl<T> Default for Slab<T> {
    fn default() -> Self {
        Self::new()
    }
}
