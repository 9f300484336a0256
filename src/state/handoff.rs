//! Exclusive hand-off of the Matrix.
//!
//! There is exactly one [`Matrix`] per server and at most one owner of it at
//! any instant. Ownership is taken with [`MatrixHandle::acquire`] and given
//! back when the returned [`MatrixGuard`] drops, on every exit path.

use super::Matrix;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Default)]
struct Counters {
    acquired: AtomicU64,
    released: AtomicU64,
}

/// Acquire/release totals since startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandoffStats {
    pub acquired: u64,
    pub released: u64,
}

impl HandoffStats {
    /// Number of guards currently alive.
    pub fn outstanding(&self) -> u64 {
        self.acquired - self.released
    }
}

/// Cloneable handle through which sessions take turns owning the Matrix.
#[derive(Clone)]
pub struct MatrixHandle {
    matrix: Arc<Mutex<Matrix>>,
    counters: Arc<Counters>,
}

impl MatrixHandle {
    pub fn new(matrix: Matrix) -> Self {
        Self {
            matrix: Arc::new(Mutex::new(matrix)),
            counters: Arc::default(),
        }
    }

    /// Wait for exclusive ownership of the Matrix.
    pub async fn acquire(&self) -> MatrixGuard {
        let guard = Arc::clone(&self.matrix).lock_owned().await;
        self.counters.acquired.fetch_add(1, Ordering::Relaxed);
        MatrixGuard {
            guard,
            _release: Release(Arc::clone(&self.counters)),
        }
    }

    pub fn stats(&self) -> HandoffStats {
        // Read released first so a concurrent release never shows a
        // negative outstanding count.
        let released = self.counters.released.load(Ordering::Acquire);
        let acquired = self.counters.acquired.load(Ordering::Acquire);
        HandoffStats { acquired, released }
    }
}

/// Exclusive ownership of the Matrix. Dropping it hands the Matrix back.
pub struct MatrixGuard {
    // Fields drop in order: the lock is released before it is counted.
    guard: OwnedMutexGuard<Matrix>,
    _release: Release,
}

struct Release(Arc<Counters>);

impl Drop for Release {
    fn drop(&mut self) {
        self.0.released.fetch_add(1, Ordering::Release);
    }
}

impl Deref for MatrixGuard {
    type Target = Matrix;

    fn deref(&self) -> &Matrix {
        &self.guard
    }
}

impl DerefMut for MatrixGuard {
    fn deref_mut(&mut self) -> &mut Matrix {
        &mut self.guard
    }
}
