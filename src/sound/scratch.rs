// Scratch Pool - Key-addressed backup storage for undo data
//
// Actions back up the samples they overwrite or remove into the pool and get
// a ScratchHandle back. The handle owns its key: dropping it releases the
// region, and releasing a key that is already gone is a no-op.

use crate::sound::{ChannelMask, Sample};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Pool shared between a sound and every handle it has handed out
pub type SharedScratchPool = Arc<Mutex<ScratchPool>>;

/// Small integer key of a scratch region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScratchKey(u32);

impl ScratchKey {
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ScratchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scratch#{}", self.0)
    }
}

struct ScratchRegion {
    /// (sound channel index, samples)
    channels: Vec<(usize, Vec<Sample>)>,
}

/// Backing store for scratch regions
#[derive(Default)]
pub struct ScratchPool {
    next_key: u32,
    regions: HashMap<ScratchKey, ScratchRegion>,
}

impl ScratchPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty pool ready to be shared
    pub fn shared() -> SharedScratchPool {
        Arc::new(Mutex::new(Self::new()))
    }

    fn insert(&mut self, channels: Vec<(usize, Vec<Sample>)>) -> ScratchKey {
        let key = ScratchKey(self.next_key);
        self.next_key = self.next_key.wrapping_add(1);
        self.regions.insert(key, ScratchRegion { channels });
        key
    }

    /// Release a region; returns false if the key was not allocated
    pub fn release(&mut self, key: ScratchKey) -> bool {
        self.regions.remove(&key).is_some()
    }

    pub fn contains(&self, key: ScratchKey) -> bool {
        self.regions.contains_key(&key)
    }

    /// Number of live regions
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Total number of samples held across all regions and channels
    pub fn total_samples(&self) -> usize {
        self.regions
            .values()
            .flat_map(|region| region.channels.iter())
            .map(|(_, data)| data.len())
            .sum()
    }

    fn read(&self, key: ScratchKey, channel: usize, offset: usize, out: &mut [Sample]) -> usize {
        let Some(region) = self.regions.get(&key) else {
            return 0;
        };
        let Some((_, data)) = region.channels.iter().find(|(index, _)| *index == channel) else {
            return 0;
        };
        if offset >= data.len() {
            return 0;
        }
        let available = (data.len() - offset).min(out.len());
        out[..available].copy_from_slice(&data[offset..offset + available]);
        available
    }
}

/// Owned reference to a scratch region, released on drop
pub struct ScratchHandle {
    key: ScratchKey,
    pool: SharedScratchPool,
    channels: ChannelMask,
    length: usize,
}

impl ScratchHandle {
    /// Store per-channel data in the pool and take ownership of the new key
    pub fn store(
        pool: &SharedScratchPool,
        channels: ChannelMask,
        length: usize,
        data: Vec<(usize, Vec<Sample>)>,
    ) -> Self {
        let key = pool.lock().insert(data);
        log::trace!("stored {} samples x {} channels in {}", length, channels.count(), key);
        Self {
            key,
            pool: Arc::clone(pool),
            channels,
            length,
        }
    }

    pub fn key(&self) -> ScratchKey {
        self.key
    }

    /// Channels held by this region
    pub fn channels(&self) -> ChannelMask {
        self.channels
    }

    /// Length in samples of every channel of this region
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Read samples of one channel, returning how many were available
    pub fn read(&self, channel: usize, offset: usize, out: &mut [Sample]) -> usize {
        self.pool.lock().read(self.key, channel, offset, out)
    }

    /// Read a single sample, silence if out of range
    pub fn sample(&self, channel: usize, offset: usize) -> Sample {
        let mut value = [0.0];
        self.read(channel, offset, &mut value);
        value[0]
    }

    /// Release the region now instead of at drop
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for ScratchHandle {
    fn drop(&mut self) {
        if !self.pool.lock().release(self.key) {
            log::debug!("{} was already released", self.key);
        }
    }
}

impl fmt::Debug for ScratchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScratchHandle")
            .field("key", &self.key)
            .field("channels", &self.channels)
            .field("length", &self.length)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_and_read() {
        let pool = ScratchPool::shared();
        let handle = ScratchHandle::store(
            &pool,
            ChannelMask::single(1),
            3,
            vec![(1, vec![0.1, 0.2, 0.3])],
        );

        let mut out = [0.0; 4];
        assert_eq!(handle.read(1, 1, &mut out), 2);
        assert_eq!(&out[..2], &[0.2, 0.3]);
        assert_eq!(handle.read(0, 0, &mut out), 0);
        assert_eq!(handle.read(1, 3, &mut out), 0);
        assert_eq!(handle.read(1, 10, &mut out), 0);
        assert_eq!(handle.sample(1, 2), 0.3);
        assert_eq!(handle.sample(1, 10), 0.0);
        assert_eq!(pool.lock().total_samples(), 3);
    }

    #[test]
    fn test_drop_releases_key() {
        let pool = ScratchPool::shared();
        let handle = ScratchHandle::store(&pool, ChannelMask::single(0), 1, vec![(0, vec![1.0])]);
        let key = handle.key();
        assert!(pool.lock().contains(key));

        drop(handle);
        assert!(!pool.lock().contains(key));
        assert!(pool.lock().is_empty());
    }

    #[test]
    fn test_double_release_is_noop() {
        let pool = ScratchPool::shared();
        let handle = ScratchHandle::store(&pool, ChannelMask::single(0), 1, vec![(0, vec![1.0])]);
        let key = handle.key();

        assert!(pool.lock().release(key));
        assert!(!pool.lock().release(key));
        // Drop after an external release must not panic
        handle.release();
        assert!(pool.lock().is_empty());
    }

    #[test]
    fn test_keys_are_unique() {
        let pool = ScratchPool::shared();
        let a = ScratchHandle::store(&pool, ChannelMask::none(), 0, Vec::new());
        let b = ScratchHandle::store(&pool, ChannelMask::none(), 0, Vec::new());
        assert_ne!(a.key(), b.key());
        assert_eq!(pool.lock().len(), 2);
    }
}
