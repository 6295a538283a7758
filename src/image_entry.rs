//! A cell holding one rendered image, and records of when it was made and whether it should be replaced.
use std::sync::Arc;
use std::time::Instant;

use crate::CachedImage;

#[derive(Debug)]
pub struct ImageEntry<Img> {
    image: Arc<Img>,
    bytes: u64,
    created_at: Instant,
    /// Strictly increasing across the whole cache; orders entries by age without ties.
    stamp: u64,
    stale: bool,
}

impl<Img: CachedImage> ImageEntry<Img> {
    pub(crate) fn new(image: Img, stamp: u64) -> ImageEntry<Img> {
        ImageEntry {
            bytes: image.byte_count(),
            image: Arc::new(image),
            created_at: Instant::now(),
            stamp,
            stale: false,
        }
    }
}

impl<Img> ImageEntry<Img> {
    /// Get the image.  The `Arc` keeps it alive even if the cache evicts it afterward.
    pub fn image(&self) -> &Arc<Img> {
        &self.image
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn stamp(&self) -> u64 {
        self.stamp
    }

    /// A stale image may still be painted, but the renderer should schedule a new one.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub(crate) fn mark_stale(&mut self) {
        self.stale = true;
    }
}
