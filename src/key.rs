//! Keys under which rendered images are stored.
//!
//! A rendering is identified by the group (document, or other rendering context) it belongs to, the page within that
//! group, and the [SizeKey] it was rendered at.  Large renderings are split into [Tile]s, so one [SizeKey] may hold
//! many images.

/// Handle to a group of pages.
///
/// These are handed out by the cache itself (see [crate::ImageCache::register_group]) and carry a generation, so that
/// a handle to a group which has since been released can never be confused with a group which reuses its slot.  Lookups
/// with a released handle behave as if nothing was ever cached for it.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct GroupId {
    pub(crate) slot: u32,
    pub(crate) generation: u32,
}

impl GroupId {
    pub fn slot(&self) -> u32 {
        self.slot
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// Rotation of a rendered page, clockwise.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Rotation {
    Rotate0,
    Rotate90,
    Rotate180,
    Rotate270,
}

impl Rotation {
    /// Convert from degrees.  Any multiple of 90, including negative ones, is accepted.
    pub fn from_degrees(degrees: i32) -> Option<Rotation> {
        if degrees % 90 != 0 {
            return None;
        }

        Some(match degrees.rem_euclid(360) {
            0 => Rotation::Rotate0,
            90 => Rotation::Rotate90,
            180 => Rotation::Rotate180,
            _ => Rotation::Rotate270,
        })
    }

    pub fn degrees(&self) -> u32 {
        match self {
            Rotation::Rotate0 => 0,
            Rotation::Rotate90 => 90,
            Rotation::Rotate180 => 180,
            Rotation::Rotate270 => 270,
        }
    }
}

impl Default for Rotation {
    fn default() -> Rotation {
        Rotation::Rotate0
    }
}

/// The part of a key which varies with the render parameters but not with the tile position.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SizeKey {
    pub rotation: Rotation,
    pub width: u32,
    pub height: u32,
}

impl SizeKey {
    pub fn new(rotation: Rotation, width: u32, height: u32) -> SizeKey {
        SizeKey {
            rotation,
            width,
            height,
        }
    }

    /// Order used to pick the smallest rendering of a page: height first, then width and rotation so that the choice
    /// never depends on map iteration order.
    pub(crate) fn smallness(&self) -> (u32, u32, Rotation) {
        (self.height, self.width, self.rotation)
    }
}

/// A rectangle of a rendering, in pixels of that rendering.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Tile {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Tile {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Tile {
        Tile {
            x,
            y,
            width,
            height,
        }
    }

    /// The tile covering a whole rendering of the given size.
    pub fn whole(width: u32, height: u32) -> Tile {
        Tile::new(0, 0, width, height)
    }
}

/// Full key of a page rendering, without the tile.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct CacheKey<I> {
    pub group: GroupId,
    pub ident: I,
    pub rotation: Rotation,
    pub width: u32,
    pub height: u32,
}

impl<I> CacheKey<I> {
    pub fn new(group: GroupId, ident: I, rotation: Rotation, width: u32, height: u32) -> CacheKey<I> {
        CacheKey {
            group,
            ident,
            rotation,
            width,
            height,
        }
    }

    pub fn size_key(&self) -> SizeKey {
        SizeKey::new(self.rotation, self.width, self.height)
    }

    /// The tile covering the whole rendering this key describes.
    pub fn whole_tile(&self) -> Tile {
        Tile::whole(self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_from_degrees() {
        assert_eq!(Rotation::from_degrees(0), Some(Rotation::Rotate0));
        assert_eq!(Rotation::from_degrees(450), Some(Rotation::Rotate90));
        assert_eq!(Rotation::from_degrees(-90), Some(Rotation::Rotate270));
        assert_eq!(Rotation::from_degrees(-180), Some(Rotation::Rotate180));
        assert_eq!(Rotation::from_degrees(45), None);
        assert_eq!(Rotation::Rotate270.degrees(), 270);
    }

    #[test]
    fn test_smallness_orders_by_height_first() {
        let tall_narrow = SizeKey::new(Rotation::Rotate0, 10, 200);
        let short_wide = SizeKey::new(Rotation::Rotate0, 300, 100);
        assert!(short_wide.smallness() < tall_narrow.smallness());
    }
}
