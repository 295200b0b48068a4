//! Shared pool handle

use core::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use super::Pool;

/// Reference-counted handle to a [`Pool`]
///
/// Clones refer to the same physical pool, which is dropped (and its
/// buckets' storage returned to the source) with the last handle.
#[derive(Clone)]
pub struct SharedPool {
    inner: Arc<Mutex<Pool>>,
}

impl SharedPool {
    pub fn new(pool: Pool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(pool)),
        }
    }

    /// Locks the pool for exclusive access
    #[inline]
    pub fn lock(&self) -> MutexGuard<'_, Pool> {
        self.inner.lock()
    }

    /// Runs `f` with the pool locked
    #[inline]
    pub fn with<R>(&self, f: impl FnOnce(&mut Pool) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Returns `true` if both handles refer to the same pool
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Number of handles currently sharing the pool
    pub fn holders(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl From<Pool> for SharedPool {
    fn from(pool: Pool) -> Self {
        Self::new(pool)
    }
}

impl fmt::Debug for SharedPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("SharedPool");
        match self.inner.try_lock() {
            Some(pool) => s.field("pool", &pool.name()),
            None => s.field("pool", &format_args!("<locked>")),
        };
        s.field("holders", &self.holders()).finish()
    }
}
