// SPDX-License-Identifier: GPL-3.0-only

//! Fixed-size buffer accounting for produced frames
//!
//! A real camera pipeline hands out frames from a small buffer pool and
//! stalls when every buffer is still held downstream. `FramePool` models
//! that: a lease is taken per produced frame and returned when the frame
//! is released.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

struct PoolInner {
    capacity: usize,
    outstanding: AtomicUsize,
}

/// Shared counter of frame buffers currently held by consumers
#[derive(Clone)]
pub struct FramePool {
    inner: Arc<PoolInner>,
}

/// One buffer taken from the pool; returned on drop
pub struct PoolLease {
    pool: Arc<PoolInner>,
}

impl FramePool {
    /// Create a pool with `capacity` buffers (at least one)
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                capacity: capacity.max(1),
                outstanding: AtomicUsize::new(0),
            }),
        }
    }

    /// Take a buffer, or `None` when all are held
    pub fn try_acquire(&self) -> Option<PoolLease> {
        self.inner
            .outstanding
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |held| {
                (held < self.inner.capacity).then_some(held + 1)
            })
            .ok()
            .map(|_| PoolLease {
                pool: Arc::clone(&self.inner),
            })
    }

    /// Buffers currently leased
    pub fn outstanding(&self) -> usize {
        self.inner.outstanding.load(Ordering::Acquire)
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }
}

impl Drop for PoolLease {
    fn drop(&mut self) {
        self.pool.outstanding.fetch_sub(1, Ordering::AcqRel);
    }
}

impl std::fmt::Debug for FramePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FramePool")
            .field("capacity", &self.capacity())
            .field("outstanding", &self.outstanding())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_exhaustion_and_return() {
        let pool = FramePool::new(2);
        let a = pool.try_acquire().unwrap();
        let _b = pool.try_acquire().unwrap();
        assert!(pool.try_acquire().is_none());
        assert_eq!(pool.outstanding(), 2);

        drop(a);
        assert_eq!(pool.outstanding(), 1);
        assert!(pool.try_acquire().is_some());
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let pool = FramePool::new(0);
        assert_eq!(pool.capacity(), 1);
        assert!(pool.try_acquire().is_some());
    }
}
