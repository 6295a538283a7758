//! The [ImageCache] stores rendered page images, bounded by their total size in bytes.
//!
//! Images live in a four-level hierarchy: group, then page identity, then [SizeKey], then [Tile].  None of these levels
//! is ever left empty; removing the last child of a level removes the level too.
//!
//! When an image is added while the cache is already over budget, the whole cache is purged, not only the page being
//! added to.  The smallest rendering of each page is kept over every larger one; past that, newer images are kept over
//! older ones.
//!
//! Groups are registered with [ImageCache::register_group] and should be released with [ImageCache::release_group]
//! when the document they stand for goes away.  A released handle reads as empty, and writes through it are dropped.
use std::hash::Hash;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::group_registry::GroupRegistry;
use crate::purge::{self, Candidate};
use crate::tileset::{CacheHashMap, TileMap};
use crate::*;

/// 200 MiB.
pub const DEFAULT_MAX_SIZE: u64 = 200 * 1024 * 1024;

type SizeMap<Img> = CacheHashMap<SizeKey, TileMap<Img>>;
type PageMap<I, Img> = CacheHashMap<I, SizeMap<Img>>;

/// What happened when adding a tile.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct AddOutcome {
    /// The image was taken into the cache.  This is only false if the group was already released.  An image which
    /// is stored can still be evicted by the purge that follows it.
    pub stored: bool,
    /// An image for the same tile was already cached and got replaced.
    pub replaced: bool,
    /// A purge ran after inserting.
    pub purged: bool,
    /// Number of images the purge removed.
    pub evicted: usize,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct CacheStats {
    pub groups: usize,
    pub pages: usize,
    pub size_keys: usize,
    pub entries: usize,
    pub bytes: u64,
    pub max_size: u64,
}

/// A cached rendering of the requested page at a different size, usable until the right one is rendered.
#[derive(Debug)]
pub struct Closest<'a, Img> {
    pub width: u32,
    pub height: u32,
    /// `|1 - width / requested_width|`.
    pub distance: f64,
    pub tiles: TileSet<'a, Img>,
}

pub struct ImageCache<I, Img> {
    store: CacheHashMap<GroupId, PageMap<I, Img>>,
    groups: GroupRegistry,
    max_size: u64,
    /// Sum of the bytes of every stored entry.
    current_size: u64,
    next_stamp: u64,
}

impl<I: Clone + Eq + Hash, Img: CachedImage> Default for ImageCache<I, Img> {
    fn default() -> Self {
        ImageCache::new()
    }
}

impl<I: Clone + Eq + Hash, Img: CachedImage> ImageCache<I, Img> {
    pub fn new() -> ImageCache<I, Img> {
        ImageCache::with_config(Default::default())
    }

    pub fn with_config(config: ImageCacheConfig) -> ImageCache<I, Img> {
        ImageCache {
            store: Default::default(),
            groups: GroupRegistry::new(),
            max_size: config.max_size,
            current_size: 0,
            next_stamp: 0,
        }
    }

    pub fn register_group(&mut self) -> GroupId {
        let group = self.groups.register();
        trace!(?group, "registered group");
        group
    }

    pub fn is_live_group(&self, group: GroupId) -> bool {
        self.groups.is_live(group)
    }

    /// Drop everything cached for a group and invalidate its handle.
    ///
    /// Returns `false` if the group was already released.
    pub fn release_group(&mut self, group: GroupId) -> bool {
        if !self.groups.release(group) {
            return false;
        }

        let mut freed_bytes = 0;
        let mut freed = 0;
        if let Some(pages) = self.store.remove(&group) {
            for tiles in pages.values().flat_map(|sizes| sizes.values()) {
                freed += tiles.len();
                freed_bytes += tiles.values().map(|e| e.bytes()).sum::<u64>();
            }
        }
        self.current_size -= freed_bytes;

        debug!(?group, freed, freed_bytes, "released group");
        true
    }

    /// Remove all cached images.  Registered groups stay registered.
    pub fn clear(&mut self) {
        self.store.clear();
        self.current_size = 0;
        debug!("cleared image cache");
    }

    /// Mark cached images stale, either all of them or only those of one page.
    ///
    /// Stale images are still returned, so the old image can be painted until the renderer replaces it.
    pub fn invalidate<P: Page<Ident = I> + ?Sized>(&mut self, page: Option<&P>) {
        match page {
            Some(p) => self.invalidate_page(p),
            None => self.invalidate_all(),
        }
    }

    pub fn invalidate_all(&mut self) {
        self.store
            .values_mut()
            .flat_map(|pages| pages.values_mut())
            .flat_map(|sizes| sizes.values_mut())
            .flat_map(|tiles| tiles.values_mut())
            .for_each(|e| e.mark_stale());
    }

    pub fn invalidate_page<P: Page<Ident = I> + ?Sized>(&mut self, page: &P) {
        let sizes = match self
            .store
            .get_mut(&page.group())
            .and_then(|pages| pages.get_mut(page.ident()))
        {
            Some(s) => s,
            None => return,
        };

        sizes
            .values_mut()
            .flat_map(|tiles| tiles.values_mut())
            .for_each(|e| e.mark_stale());
    }

    /// Get all tiles cached for exactly this key.
    pub fn tileset(&self, key: &CacheKey<I>) -> TileSet<'_, Img> {
        TileSet::new(self.sizes(key.group, &key.ident).and_then(|s| s.get(&key.size_key())))
    }

    pub fn entry(&self, key: &CacheKey<I>, tile: &Tile) -> Option<&ImageEntry<Img>> {
        self.tileset(key).get(tile)
    }

    fn sizes(&self, group: GroupId, ident: &I) -> Option<&SizeMap<Img>> {
        self.store.get(&group)?.get(ident)
    }

    /// Add an image for a tile of the given key, replacing whatever was cached for that tile.
    ///
    /// If the cache was over budget before this image was added, the whole cache is purged afterward.
    pub fn addtile(&mut self, key: &CacheKey<I>, tile: Tile, image: Img) -> AddOutcome {
        if !self.groups.is_live(key.group) {
            trace!(group = ?key.group, "dropping image for released group");
            return AddOutcome::default();
        }

        let entry = ImageEntry::new(image, self.next_stamp);
        self.next_stamp += 1;
        let bytes = entry.bytes();

        let old = self
            .store
            .entry(key.group)
            .or_default()
            .entry(key.ident.clone())
            .or_default()
            .entry(key.size_key())
            .or_default()
            .insert(tile, entry);

        let replaced = old.is_some();
        if let Some(old) = old {
            trace!(?tile, old_bytes = old.bytes(), bytes, "replaced tile");
            self.current_size -= old.bytes();
        }

        let purge_needed = self.current_size > self.max_size;
        self.current_size += bytes;

        let evicted = if purge_needed { self.purge() } else { 0 };
        AddOutcome {
            stored: true,
            replaced,
            purged: purge_needed,
            evicted,
        }
    }

    /// Remove a single tile.
    pub fn remove(&mut self, key: &CacheKey<I>, tile: &Tile) -> Option<Arc<Img>> {
        self.remove_entry(key.group, &key.ident, key.size_key(), tile)
            .map(|e| e.image().clone())
    }

    /// Remove an entry and any level of the store it leaves empty.
    fn remove_entry(
        &mut self,
        group: GroupId,
        ident: &I,
        size: SizeKey,
        tile: &Tile,
    ) -> Option<ImageEntry<Img>> {
        let pages = self.store.get_mut(&group)?;
        let sizes = pages.get_mut(ident)?;
        let tiles = sizes.get_mut(&size)?;
        let removed = tiles.remove(tile)?;

        if tiles.is_empty() {
            sizes.remove(&size);
            if sizes.is_empty() {
                pages.remove(ident);
                if pages.is_empty() {
                    self.store.remove(&group);
                }
            }
        }

        self.current_size -= removed.bytes();
        Some(removed)
    }

    /// Trim the whole cache down to the maximum size.  Returns how many images were evicted.
    pub fn purge(&mut self) -> usize {
        let mut candidates = vec![];
        for (group, pages) in self.store.iter() {
            for (ident, sizes) in pages.iter() {
                let smallest = purge::smallest_size(sizes.keys());
                for (size, tiles) in sizes.iter() {
                    let tier = purge::tier_of(size, smallest);
                    for (tile, entry) in tiles.iter() {
                        candidates.push(Candidate {
                            tier,
                            stamp: entry.stamp(),
                            bytes: entry.bytes(),
                            location: (*group, ident.clone(), *size, *tile),
                        });
                    }
                }
            }
        }

        let plan = purge::plan(candidates, self.max_size);
        let mut freed_bytes = 0;
        for (group, ident, size, tile) in plan.victims.iter() {
            if let Some(e) = self.remove_entry(*group, ident, *size, tile) {
                trace!(?group, ?size, ?tile, bytes = e.bytes(), "evicted tile");
                freed_bytes += e.bytes();
            }
        }

        debug_assert_eq!(self.current_size, plan.kept_bytes);
        self.current_size = plan.kept_bytes;

        debug!(
            evicted = plan.victims.len(),
            kept = plan.kept,
            freed_bytes,
            current_size = self.current_size,
            max_size = self.max_size,
            "purged image cache"
        );
        plan.victims.len()
    }

    /// Find renderings of the same page at the same rotation but a different width, closest width first.
    ///
    /// Renderings with any stale tile are skipped.  Equally close renderings are ordered by width, then height.
    pub fn closest(&self, key: &CacheKey<I>) -> Vec<Closest<'_, Img>> {
        let sizes = match self.sizes(key.group, &key.ident) {
            Some(s) => s,
            None => return vec![],
        };

        let mut suitable = sizes
            .iter()
            .filter(|(size, tiles)| {
                size.rotation == key.rotation
                    && size.width != key.width
                    && !tiles.values().any(|e| e.is_stale())
            })
            .map(|(size, tiles)| Closest {
                width: size.width,
                height: size.height,
                distance: size.width.abs_diff(key.width) as f64 / key.width as f64,
                tiles: TileSet::new(Some(tiles)),
            })
            .collect::<Vec<_>>();

        // |1 - w / r| is |w - r| / r, and r is the same for every candidate, so compare exactly in integers.
        suitable.sort_by_key(|c| (c.width.abs_diff(key.width), c.width, c.height));
        suitable
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    /// Change the budget.  This doesn't purge; the next insert into an over-budget cache will.
    pub fn set_max_size(&mut self, max_size: u64) {
        self.max_size = max_size;
    }

    pub fn current_size(&self) -> u64 {
        self.current_size
    }

    /// Number of cached images.
    pub fn len(&self) -> usize {
        self.store
            .values()
            .flat_map(|pages| pages.values())
            .flat_map(|sizes| sizes.values())
            .map(|tiles| tiles.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = CacheStats {
            groups: self.store.len(),
            bytes: self.current_size,
            max_size: self.max_size,
            ..Default::default()
        };

        for sizes in self.store.values().flat_map(|pages| pages.values()) {
            stats.pages += 1;
            stats.size_keys += sizes.len();
            stats.entries += sizes.values().map(|t| t.len()).sum::<usize>();
        }
        stats
    }
}
