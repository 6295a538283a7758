//! A size-bounded cache for rendered document pages.
//!
//! Rendering a page is expensive, and a viewer rendering at arbitrary zoom levels and rotations ends up with many
//! renderings of the same page, some of them split into tiles.  Keeping all of them around grows forever; keeping only
//! the latest makes zooming back and forth slow and paints blank pages while the renderer catches up.  This crate
//! keeps as many renderings as fit in a configurable number of bytes, and when it must evict, it gives up every larger
//! rendering of every page before any page loses its smallest one.
//!
//! [ImageCache] is the cache itself.  It is keyed by a [CacheKey] (group, page identity, rotation and size) plus a
//! [Tile], and holds anything implementing [CachedImage].  Besides exact lookups with [ImageCache::tileset], it can
//! offer renderings of the same page at a nearby size with [ImageCache::closest], to paint while the right one renders.
//! Cached images can be marked stale with [ImageCache::invalidate], at which point they are still returned but
//! should be rendered again.
//!
//! Groups, typically one per open document, are registered with the cache, which hands out generation-checked
//! [GroupId]s.  Releasing a group drops its images, and its handle then reads as empty.
//!
//! [SharedImageCache] wraps the cache in a lock for hosts which render on several threads, and hands out
//! [GroupLease]s which release their group when dropped.
mod config;
mod group_registry;
mod image_cache;
mod image_entry;
mod key;
mod purge;
mod shared_cache;
mod tileset;
mod traits;

pub use config::*;
pub use image_cache::*;
pub use image_entry::*;
pub use key::*;
pub use shared_cache::*;
pub use tileset::TileSet;
pub use traits::*;
