//! A [SharedImageCache] wraps an [ImageCache] for use from several threads.
//!
//! Every mutation, including the purge an insert may trigger, runs under one write lock.  Lookups take the read lock
//! and copy out `Arc`s of the images, so nothing borrowed from the cache outlives the lock.
//!
//! Groups registered here come back as a [GroupLease], which releases the group when dropped.  The lease only holds a
//! weak reference to the cache, so leases outliving the cache are fine.
use std::hash::Hash;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use crate::*;

type Inner<I, Img> = RwLock<ImageCache<I, Img>>;

/// One cached tile, copied out of the cache.
#[derive(Debug)]
pub struct TileImage<Img> {
    pub tile: Tile,
    pub image: Arc<Img>,
    pub stale: bool,
}

impl<Img> Clone for TileImage<Img> {
    fn clone(&self) -> Self {
        TileImage {
            tile: self.tile,
            image: self.image.clone(),
            stale: self.stale,
        }
    }
}

/// Owned counterpart of [Closest].
#[derive(Debug)]
pub struct ClosestImages<Img> {
    pub width: u32,
    pub height: u32,
    pub distance: f64,
    pub tiles: Vec<TileImage<Img>>,
}

fn snapshot<Img>(tiles: TileSet<'_, Img>) -> Vec<TileImage<Img>> {
    tiles
        .iter()
        .map(|(tile, entry)| TileImage {
            tile: *tile,
            image: entry.image().clone(),
            stale: entry.is_stale(),
        })
        .collect()
}

// Cache mutations can't panic halfway through, so a poisoned lock still guards a consistent cache.
fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

pub struct SharedImageCache<I, Img> {
    inner: Arc<Inner<I, Img>>,
}

impl<I, Img> Clone for SharedImageCache<I, Img> {
    fn clone(&self) -> Self {
        SharedImageCache {
            inner: self.inner.clone(),
        }
    }
}

/// Keeps a group registered.  Dropping it releases the group and everything cached for it.
pub struct GroupLease<I: Clone + Eq + Hash, Img: CachedImage> {
    group: GroupId,
    cache: Weak<Inner<I, Img>>,
}

impl<I: Clone + Eq + Hash, Img: CachedImage> GroupLease<I, Img> {
    pub fn group(&self) -> GroupId {
        self.group
    }
}

impl<I: Clone + Eq + Hash, Img: CachedImage> Drop for GroupLease<I, Img> {
    fn drop(&mut self) {
        if let Some(cache) = self.cache.upgrade() {
            write_lock(&*cache).release_group(self.group);
        }
    }
}

impl<I: Clone + Eq + Hash, Img: CachedImage> Default for SharedImageCache<I, Img> {
    fn default() -> Self {
        SharedImageCache::new()
    }
}

impl<I: Clone + Eq + Hash, Img: CachedImage> SharedImageCache<I, Img> {
    pub fn new() -> SharedImageCache<I, Img> {
        SharedImageCache::with_config(Default::default())
    }

    pub fn with_config(config: ImageCacheConfig) -> SharedImageCache<I, Img> {
        SharedImageCache {
            inner: Arc::new(RwLock::new(ImageCache::with_config(config))),
        }
    }

    /// Run a closure against the cache under the read lock.
    pub fn read<R>(&self, f: impl FnOnce(&ImageCache<I, Img>) -> R) -> R {
        f(&read_lock(&*self.inner))
    }

    /// Run a closure against the cache under the write lock.
    pub fn write<R>(&self, f: impl FnOnce(&mut ImageCache<I, Img>) -> R) -> R {
        f(&mut write_lock(&*self.inner))
    }

    pub fn register_group(&self) -> GroupLease<I, Img> {
        let group = self.write(|c| c.register_group());
        GroupLease {
            group,
            cache: Arc::downgrade(&self.inner),
        }
    }

    pub fn clear(&self) {
        self.write(|c| c.clear())
    }

    pub fn invalidate_all(&self) {
        self.write(|c| c.invalidate_all())
    }

    pub fn invalidate_page<P: Page<Ident = I> + ?Sized>(&self, page: &P) {
        self.write(|c| c.invalidate_page(page))
    }

    pub fn tileset(&self, key: &CacheKey<I>) -> Vec<TileImage<Img>> {
        self.read(|c| snapshot(c.tileset(key)))
    }

    pub fn closest(&self, key: &CacheKey<I>) -> Vec<ClosestImages<Img>> {
        self.read(|c| {
            c.closest(key)
                .into_iter()
                .map(|found| ClosestImages {
                    width: found.width,
                    height: found.height,
                    distance: found.distance,
                    tiles: snapshot(found.tiles),
                })
                .collect()
        })
    }

    pub fn addtile(&self, key: &CacheKey<I>, tile: Tile, image: Img) -> AddOutcome {
        self.write(|c| c.addtile(key, tile, image))
    }

    pub fn remove(&self, key: &CacheKey<I>, tile: &Tile) -> Option<Arc<Img>> {
        self.write(|c| c.remove(key, tile))
    }

    pub fn purge(&self) -> usize {
        self.write(|c| c.purge())
    }

    pub fn set_max_size(&self, max_size: u64) {
        self.write(|c| c.set_max_size(max_size))
    }

    pub fn current_size(&self) -> u64 {
        self.read(|c| c.current_size())
    }

    pub fn stats(&self) -> CacheStats {
        self.read(|c| c.stats())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_cache(max_size: u64) -> SharedImageCache<u32, Vec<u8>> {
        let cfg = ImageCacheConfigBuilder::default()
            .max_size(max_size)
            .build()
            .expect("Should build");
        SharedImageCache::with_config(cfg)
    }

    fn key(group: GroupId, ident: u32, width: u32) -> CacheKey<u32> {
        CacheKey::new(group, ident, Rotation::Rotate0, width, width)
    }

    #[test]
    fn test_lease_releases_on_drop() {
        let cache = build_cache(1000);
        let lease = cache.register_group();
        let group = lease.group();
        let k = key(group, 1, 10);
        assert!(cache.addtile(&k, k.whole_tile(), vec![0; 10]).stored);
        assert_eq!(cache.tileset(&k).len(), 1);

        std::mem::drop(lease);
        assert!(cache.tileset(&k).is_empty());
        assert_eq!(cache.current_size(), 0);
        assert!(!cache.read(|c| c.is_live_group(group)));
        assert!(!cache.addtile(&k, k.whole_tile(), vec![0; 10]).stored);
    }

    // A lease must not keep the cache alive, and dropping it afterward must be harmless.
    #[test]
    fn test_lease_outlives_cache() {
        let cache = build_cache(1000);
        let lease = cache.register_group();
        let weak = Arc::downgrade(&cache.inner);
        std::mem::drop(cache);
        assert!(weak.upgrade().is_none());
        std::mem::drop(lease);
    }

    #[test]
    fn test_snapshots() {
        let cache = build_cache(1000);
        let lease = cache.register_group();
        let wanted = key(lease.group(), 1, 100);
        let near = key(lease.group(), 1, 90);
        cache.addtile(&near, Tile::new(0, 0, 45, 90), vec![1; 4]);
        cache.addtile(&near, Tile::new(45, 0, 45, 90), vec![2; 4]);

        let found = cache.closest(&wanted);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].width, 90);
        assert_eq!(found[0].tiles.len(), 2);

        // The copied-out image stays valid after eviction.
        let tiles = cache.tileset(&near);
        cache.clear();
        assert!(tiles.iter().all(|t| t.image.len() == 4 && !t.stale));

        cache.addtile(&near, near.whole_tile(), vec![0; 4]);
        cache.invalidate_page(&near);
        assert!(cache.tileset(&near)[0].stale);
        assert!(cache.closest(&wanted).is_empty());
    }

    #[test]
    fn test_concurrent_inserts() {
        let cache = build_cache(5000);
        let leases = (0..4).map(|_| cache.register_group()).collect::<Vec<_>>();

        std::thread::scope(|s| {
            for lease in leases.iter() {
                let cache = cache.clone();
                let group = lease.group();
                s.spawn(move || {
                    for ident in 0..20 {
                        for width in 1..5 {
                            let k = key(group, ident, width * 10);
                            cache.addtile(&k, k.whole_tile(), vec![0; 100]);
                        }
                    }
                });
            }
        });

        let stats = cache.stats();
        let total = cache.read(|c| {
            leases
                .iter()
                .flat_map(|l| (0..20).map(move |ident| (l.group(), ident)))
                .flat_map(|(g, ident)| (1..5).map(move |w| key(g, ident, w * 10)))
                .map(|k| c.tileset(&k).total_bytes())
                .sum::<u64>()
        });
        assert_eq!(stats.bytes, total);
        assert_eq!(stats.entries as u64 * 100, total);
        // The last insert can only go over budget by its own size.
        assert!(stats.bytes <= 5000 + 100);
    }
}
