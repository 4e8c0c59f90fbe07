// Size-aware lock
//
// Edits that only rewrite samples in place share the lock with readers such as
// playback. Edits that may change the length take it exclusively, because a
// reader caching absolute offsets must not observe a resize.

use parking_lot::lock_api::{ArcRwLockReadGuard, ArcRwLockWriteGuard};
use parking_lot::{RawRwLock, RwLock};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockKind {
    /// Read/write samples without changing the length
    InPlace,
    /// May add or remove space or channels
    Resize,
}

enum Guard {
    Shared(#[allow(dead_code)] ArcRwLockReadGuard<RawRwLock, ()>),
    Exclusive(#[allow(dead_code)] ArcRwLockWriteGuard<RawRwLock, ()>),
}

/// Held for the duration of a forward or backward pass
pub struct SizeLock {
    guard: Guard,
}

impl SizeLock {
    pub fn acquire(lock: &Arc<RwLock<()>>, kind: LockKind) -> Self {
        let guard = match kind {
            LockKind::InPlace => Guard::Shared(lock.read_arc()),
            LockKind::Resize => Guard::Exclusive(lock.write_arc()),
        };
        Self { guard }
    }

    pub fn kind(&self) -> LockKind {
        match self.guard {
            Guard::Shared(_) => LockKind::InPlace,
            Guard::Exclusive(_) => LockKind::Resize,
        }
    }

    /// Release before the end of scope
    pub fn unlock(self) {}
}
