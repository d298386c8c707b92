//! Dimension-keyed recycle pool for retired GPU textures
//!
//! Small, single-level, uncompressed textures are created and evicted all the
//! time (render targets, procedural surfaces). Instead of freeing them we keep
//! them on a LIFO stack per `(log2 width, log2 height)` and hand them back out
//! to the next entry with the same stored shape.

use hashbrown::HashMap;

use crate::format::EntryKind;

/// Pool key: stored log2 dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolShape {
    pub u_bits: u8,
    pub v_bits: u8,
}

impl PoolShape {
    pub fn new(u_bits: u8, v_bits: u8) -> Self {
        Self { u_bits, v_bits }
    }
}

/// Whether an entry of this kind and mip count may be pooled
///
/// Compressed, paletted and mipmapped storage varies with content, so only
/// plain single-level textures are interchangeable by shape alone.
#[inline]
pub fn is_poolable(kind: EntryKind, mip_count: u32) -> bool {
    kind == EntryKind::Plain && mip_count == 1
}

/// LIFO stacks of retired objects keyed by [`PoolShape`]
pub struct RecyclePool<R> {
    stacks: HashMap<PoolShape, Vec<R>>,
    max_per_shape: usize,
    len: usize,
}

impl<R> std::fmt::Debug for RecyclePool<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecyclePool")
            .field("shapes", &self.stacks.len())
            .field("len", &self.len)
            .field("max_per_shape", &self.max_per_shape)
            .finish()
    }
}

impl<R> RecyclePool<R> {
    pub fn new(max_per_shape: usize) -> Self {
        Self {
            stacks: HashMap::new(),
            max_per_shape,
            len: 0,
        }
    }

    /// Take the most recently retired object of this shape
    pub fn try_take(&mut self, shape: PoolShape) -> Option<R> {
        let retired = self.stacks.get_mut(&shape)?.pop()?;
        self.len -= 1;
        Some(retired)
    }

    /// Take the most recently retired object of this shape accepted by `accept`
    ///
    /// Objects above the match stay in place, so the stack keeps its order.
    pub fn take_where(&mut self, shape: PoolShape, accept: impl Fn(&R) -> bool) -> Option<R> {
        let stack = self.stacks.get_mut(&shape)?;
        let index = stack.iter().rposition(accept)?;
        self.len -= 1;
        Some(stack.remove(index))
    }

    /// Retire an object into the pool
    ///
    /// Returns the object back if the stack for this shape is full; the
    /// caller drops it, which releases the GPU object.
    pub fn give(&mut self, shape: PoolShape, retired: R) -> Option<R> {
        let stack = self.stacks.entry(shape).or_default();
        if stack.len() >= self.max_per_shape {
            return Some(retired);
        }
        stack.push(retired);
        self.len += 1;
        None
    }

    /// Number of pooled objects of one shape
    pub fn count(&self, shape: PoolShape) -> usize {
        self.stacks.get(&shape).map_or(0, Vec::len)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn set_max_per_shape(&mut self, max_per_shape: usize) {
        self.max_per_shape = max_per_shape;
    }

    /// Remove every pooled object
    pub fn drain(&mut self) -> Vec<R> {
        let out: Vec<R> = self.stacks.drain().flat_map(|(_, stack)| stack).collect();
        self.len = 0;
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poolable_only_plain_single_level() {
        assert!(is_poolable(EntryKind::Plain, 1));
        assert!(!is_poolable(EntryKind::Plain, 2));
        assert!(!is_poolable(EntryKind::Paletted, 1));
        assert!(!is_poolable(EntryKind::Compressed, 1));
        assert!(!is_poolable(EntryKind::Synthetic, 1));
    }

    #[test]
    fn test_take_from_empty() {
        let mut pool: RecyclePool<u32> = RecyclePool::new(4);
        assert_eq!(pool.try_take(PoolShape::new(6, 6)), None);
    }

    #[test]
    fn test_give_take_is_lifo() {
        let mut pool = RecyclePool::new(4);
        let shape = PoolShape::new(6, 6);
        assert!(pool.give(shape, 1).is_none());
        assert!(pool.give(shape, 2).is_none());
        assert_eq!(pool.len(), 2);

        assert_eq!(pool.try_take(shape), Some(2));
        assert_eq!(pool.try_take(shape), Some(1));
        assert_eq!(pool.try_take(shape), None);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_take_where_searches_below_top() {
        let mut pool = RecyclePool::new(4);
        let shape = PoolShape::new(2, 2);
        for value in [1, 2, 3] {
            pool.give(shape, value);
        }

        assert_eq!(pool.take_where(shape, |&v| v == 1), Some(1));
        assert_eq!(pool.take_where(shape, |&v| v == 1), None);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.try_take(shape), Some(3));
        assert_eq!(pool.try_take(shape), Some(2));
    }

    #[test]
    fn test_shapes_are_independent() {
        let mut pool = RecyclePool::new(4);
        pool.give(PoolShape::new(6, 5), 'a');
        pool.give(PoolShape::new(5, 6), 'b');

        assert_eq!(pool.try_take(PoolShape::new(6, 6)), None);
        assert_eq!(pool.try_take(PoolShape::new(5, 6)), Some('b'));
        assert_eq!(pool.count(PoolShape::new(6, 5)), 1);
    }

    #[test]
    fn test_full_stack_rejects() {
        let mut pool = RecyclePool::new(1);
        let shape = PoolShape::new(3, 3);
        assert!(pool.give(shape, 10).is_none());
        assert_eq!(pool.give(shape, 11), Some(11));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_drain() {
        let mut pool = RecyclePool::new(8);
        pool.give(PoolShape::new(1, 1), 1);
        pool.give(PoolShape::new(2, 2), 2);
        pool.give(PoolShape::new(2, 2), 3);

        let mut drained = pool.drain();
        drained.sort();
        assert_eq!(drained, vec![1, 2, 3]);
        assert!(pool.is_empty());
        assert_eq!(pool.count(PoolShape::new(2, 2)), 0);
    }
}
