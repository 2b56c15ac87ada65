use std::iter::FromIterator;

/// Work list made of two buffers: writes go to the `next` buffer, a call to
/// [DoubleBuffer::take] hands the `next` buffer out and starts an empty one.
///
/// Items come out in the order they were pushed. Once the taken buffer has been
/// consumed it can be handed back with [DoubleBuffer::recycle] so its allocation
/// is reused by the following step.
///
/// # Example
/// ```
/// # use digisim::data_structures::DoubleBuffer;
/// let mut buffer = DoubleBuffer::new();
///
/// buffer.push(1);
/// buffer.push(2);
///
/// let act = buffer.take();
/// assert_eq!(act, vec![1, 2]);
/// assert!(buffer.is_empty());
///
/// buffer.push(3);
/// buffer.recycle(act);
/// assert_eq!(buffer.take(), vec![3]);
/// ```
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct DoubleBuffer<T> {
    spare: Vec<T>,
    next: Vec<T>,
}

impl<T> DoubleBuffer<T> {
    /// Returns an empty [DoubleBuffer].
    pub fn new() -> Self {
        Self {
            spare: Vec::new(),
            next: Vec::new(),
        }
    }

    /// Pushes an item to the end of the `next` buffer.
    #[inline(always)]
    pub fn push(&mut self, v: T) {
        self.next.push(v);
    }

    /// Returns everything pushed since the last call and starts a new `next` buffer.
    pub fn take(&mut self) -> Vec<T> {
        let spare = std::mem::take(&mut self.spare);
        std::mem::replace(&mut self.next, spare)
    }

    /// Gives back a buffer returned by [DoubleBuffer::take] so its allocation can be reused.
    pub fn recycle(&mut self, mut buffer: Vec<T>) {
        buffer.clear();
        if buffer.capacity() > self.spare.capacity() {
            self.spare = buffer;
        }
    }

    /// Returns the number of items waiting in the `next` buffer.
    pub fn len(&self) -> usize {
        self.next.len()
    }

    /// Returns true if nothing is waiting in the `next` buffer.
    pub fn is_empty(&self) -> bool {
        self.next.is_empty()
    }
}

impl<T> Default for DoubleBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<T> for DoubleBuffer<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            spare: Vec::new(),
            next: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_take_keeps_order() {
        let mut b: DoubleBuffer<u8> = Default::default();
        assert!(b.take().is_empty());

        for i in 0..10 {
            b.push(i);
        }
        assert_eq!(b.len(), 10);

        let act = b.take();
        assert_eq!(act, (0..10).collect::<Vec<_>>());
        assert!(b.is_empty());
    }

    #[test]
    fn test_recycle_reuses_allocation() {
        let mut b: DoubleBuffer<u32> = (0..100).collect();
        let act = b.take();
        let capacity = act.capacity();
        b.recycle(act);

        b.push(1);
        let act = b.take();
        assert_eq!(act, vec![1]);

        // The recycled buffer became the new `next` buffer.
        b.push(2);
        assert_eq!(b.len(), 1);
        let act = b.take();
        assert!(act.capacity() >= capacity);
    }
}
