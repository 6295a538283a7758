//! What the cache needs from its collaborators.
//!
//! The renderer hands the cache images implementing [CachedImage], and identifies pages with anything implementing
//! [Page].
use std::sync::Arc;

use crate::GroupId;

/// An image which knows how much memory it occupies.
///
/// The cache will hold up to a configured total of these bytes, then begin evicting.
pub trait CachedImage {
    fn byte_count(&self) -> u64;
}

impl CachedImage for Vec<u8> {
    fn byte_count(&self) -> u64 {
        self.len() as u64
    }
}

impl CachedImage for Box<[u8]> {
    fn byte_count(&self) -> u64 {
        self.len() as u64
    }
}

impl<T: CachedImage + ?Sized> CachedImage for Arc<T> {
    fn byte_count(&self) -> u64 {
        (**self).byte_count()
    }
}

/// Something which names a single page: the group it lives in, and its identity within that group.
pub trait Page {
    type Ident;

    fn group(&self) -> GroupId;

    fn ident(&self) -> &Self::Ident;
}

impl<I> Page for crate::CacheKey<I> {
    type Ident = I;

    fn group(&self) -> GroupId {
        self.group
    }

    fn ident(&self) -> &I {
        &self.ident
    }
}

impl<I> Page for (GroupId, I) {
    type Ident = I;

    fn group(&self) -> GroupId {
        self.0
    }

    fn ident(&self) -> &I {
        &self.1
    }
}
