//! Deciding what survives a purge.
//!
//! Every entry in the cache is a candidate.  The smallest rendering of each page is [Tier::Protected], everything
//! else is [Tier::Evictable].  Candidates are ranked protected first, then newest first within a tier, and kept in
//! that order until the next one would no longer fit.  So a page only loses its smallest rendering once every larger
//! rendering of every page is gone, and if even the protected renderings don't fit, the oldest of those go as well.
use crate::SizeKey;

/// Survival tier of a candidate.  Ordered so that tiers which are kept first sort first.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub(crate) enum Tier {
    Protected,
    Evictable,
}

#[derive(Debug)]
pub(crate) struct Candidate<L> {
    pub(crate) tier: Tier,
    pub(crate) stamp: u64,
    pub(crate) bytes: u64,
    pub(crate) location: L,
}

#[derive(Debug)]
pub(crate) struct PurgePlan<L> {
    pub(crate) victims: Vec<L>,
    pub(crate) kept: usize,
    pub(crate) kept_bytes: u64,
}

/// Pick the rendering of a page which survives longest: the one with the smallest height.
pub(crate) fn smallest_size<'a>(sizes: impl Iterator<Item = &'a SizeKey>) -> Option<SizeKey> {
    sizes.min_by_key(|s| s.smallness()).copied()
}

pub(crate) fn tier_of(size: &SizeKey, smallest: Option<SizeKey>) -> Tier {
    if Some(*size) == smallest {
        Tier::Protected
    } else {
        Tier::Evictable
    }
}

/// Rank the candidates and split them into those which fit in `max_size` and those which don't.
pub(crate) fn plan<L>(mut candidates: Vec<Candidate<L>>, max_size: u64) -> PurgePlan<L> {
    candidates.sort_unstable_by(|a, b| a.tier.cmp(&b.tier).then(b.stamp.cmp(&a.stamp)));

    let mut kept_bytes = 0u64;
    let mut kept = candidates.len();
    for (i, c) in candidates.iter().enumerate() {
        match kept_bytes.checked_add(c.bytes) {
            Some(total) if total <= max_size => kept_bytes = total,
            _ => {
                kept = i;
                break;
            }
        }
    }

    let victims = candidates
        .split_off(kept)
        .into_iter()
        .map(|c| c.location)
        .collect();
    PurgePlan {
        victims,
        kept,
        kept_bytes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Rotation;

    fn cand(tier: Tier, stamp: u64, bytes: u64) -> Candidate<u64> {
        Candidate {
            tier,
            stamp,
            bytes,
            location: stamp,
        }
    }

    #[test]
    fn test_smallest_size() {
        let sizes = [
            SizeKey::new(Rotation::Rotate0, 100, 140),
            SizeKey::new(Rotation::Rotate0, 50, 70),
            SizeKey::new(Rotation::Rotate90, 70, 50),
        ];
        assert_eq!(smallest_size(sizes.iter()), Some(sizes[2]));
        assert_eq!(tier_of(&sizes[2], Some(sizes[2])), Tier::Protected);
        assert_eq!(tier_of(&sizes[0], Some(sizes[2])), Tier::Evictable);
        assert_eq!(smallest_size(std::iter::empty()), None);
    }

    #[test]
    fn test_protected_kept_before_newer_evictable() {
        let candidates = vec![
            cand(Tier::Evictable, 5, 100),
            cand(Tier::Protected, 1, 100),
            cand(Tier::Evictable, 4, 100),
            cand(Tier::Protected, 2, 100),
        ];
        let plan = plan(candidates, 300);
        assert_eq!(plan.kept, 3);
        assert_eq!(plan.kept_bytes, 300);
        assert_eq!(plan.victims, vec![4]);
    }

    // Once something doesn't fit, nothing ranked lower is kept either, even if it would fit.
    #[test]
    fn test_stops_at_first_misfit() {
        let candidates = vec![
            cand(Tier::Protected, 3, 60),
            cand(Tier::Evictable, 2, 50),
            cand(Tier::Evictable, 1, 10),
        ];
        let mut plan = plan(candidates, 100);
        plan.victims.sort_unstable();
        assert_eq!(plan.victims, vec![1, 2]);
        assert_eq!(plan.kept_bytes, 60);
    }

    #[test]
    fn test_protected_evicted_under_extreme_pressure() {
        let candidates = vec![
            cand(Tier::Protected, 1, 100),
            cand(Tier::Protected, 2, 100),
            cand(Tier::Evictable, 3, 1),
        ];
        let mut plan = plan(candidates, 150);
        plan.victims.sort_unstable();
        assert_eq!(plan.victims, vec![1, 3]);
        assert_eq!(plan.kept_bytes, 100);
    }

    #[test]
    fn test_everything_fits() {
        let candidates = vec![cand(Tier::Evictable, 1, 10), cand(Tier::Protected, 2, 10)];
        let plan = plan(candidates, 20);
        assert!(plan.victims.is_empty());
        assert_eq!(plan.kept, 2);
    }
}
