/*!
 * Pool Chain
 *
 * Double-ended free list backing each shard's shared cache. The owning
 * shard pushes and pops at the head for temporal locality; other shards
 * steal from the tail so they touch the opposite end from the owner.
 */

use crate::core::limits::POOL_CHAIN_INITIAL;
use std::collections::VecDeque;

#[derive(Debug)]
pub(super) struct PoolChain<T> {
    items: VecDeque<T>,
}

impl<T> PoolChain<T> {
    pub(super) fn new() -> Self {
        Self {
            items: VecDeque::with_capacity(POOL_CHAIN_INITIAL),
        }
    }

    #[inline]
    pub(super) fn push_head(&mut self, value: T) {
        self.items.push_front(value);
    }

    #[inline]
    pub(super) fn pop_head(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    #[inline]
    pub(super) fn pop_tail(&mut self) -> Option<T> {
        self.items.pop_back()
    }

    #[inline]
    pub(super) fn len(&self) -> usize {
        self.items.len()
    }
}

impl<T> Default for PoolChain<T> {
    fn default() -> Self {
        Self::new()
    }
}
