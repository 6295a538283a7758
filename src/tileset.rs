//! A read-only view over the tiles cached for one rendering of a page.
use crate::{ImageEntry, Tile};

pub(crate) type CacheHashMap<K, V> = std::collections::HashMap<K, V, ahash::RandomState>;

pub(crate) type TileMap<Img> = CacheHashMap<Tile, ImageEntry<Img>>;

/// The tiles of one `(group, ident, size)` triple.  Empty if nothing is cached there.
pub struct TileSet<'a, Img> {
    tiles: Option<&'a TileMap<Img>>,
}

impl<'a, Img> Clone for TileSet<'a, Img> {
    fn clone(&self) -> Self {
        TileSet { tiles: self.tiles }
    }
}

impl<'a, Img> Copy for TileSet<'a, Img> {}

impl<'a, Img: 'a> TileSet<'a, Img> {
    pub(crate) fn new(tiles: Option<&'a TileMap<Img>>) -> TileSet<'a, Img> {
        TileSet { tiles }
    }

    pub fn len(&self) -> usize {
        self.tiles.map_or(0, |t| t.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, tile: &Tile) -> Option<&'a ImageEntry<Img>> {
        self.tiles?.get(tile)
    }

    pub fn contains(&self, tile: &Tile) -> bool {
        self.get(tile).is_some()
    }

    /// Iterate over the tiles, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a Tile, &'a ImageEntry<Img>)> + 'a {
        self.tiles.into_iter().flat_map(|t| t.iter())
    }

    pub fn tiles(&self) -> impl Iterator<Item = &'a Tile> + 'a {
        self.iter().map(|(t, _)| t)
    }

    /// Whether any tile is waiting to be re-rendered.
    pub fn has_stale(&self) -> bool {
        self.iter().any(|(_, e)| e.is_stale())
    }

    pub fn total_bytes(&self) -> u64 {
        self.iter().map(|(_, e)| e.bytes()).sum()
    }
}

impl<'a, Img> std::fmt::Debug for TileSet<'a, Img> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileSet")
            .field("tiles", &self.len())
            .field("bytes", &self.total_bytes())
            .finish()
    }
}
