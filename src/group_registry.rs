//! A [GroupRegistry] hands out [GroupId]s and tracks which of them are still alive.
//!
//! This is a vec of slots plus a free list threaded through the empty ones.  Releasing a group bumps the slot's
//! generation, so the released handle stops matching even after the slot is handed out again.
use crate::GroupId;

struct LiveSlot {
    generation: u32,
}

struct FreeSlot {
    /// Generation the next occupant of this slot will get.
    next_generation: u32,
    next_free: Option<u32>,
}

enum Slot {
    Free(FreeSlot),
    Live(LiveSlot),
}

impl Slot {
    fn as_free(&self) -> &FreeSlot {
        match self {
            Slot::Free(ref x) => x,
            _ => panic!("Slot should be free"),
        }
    }
}

#[derive(Default)]
pub(crate) struct GroupRegistry {
    slots: Vec<Slot>,
    free_head: Option<u32>,
    live: usize,
}

impl GroupRegistry {
    pub(crate) fn new() -> GroupRegistry {
        Default::default()
    }

    /// Allocate a handle for a new group.
    pub(crate) fn register(&mut self) -> GroupId {
        self.live += 1;

        if let Some(slot) = self.free_head {
            let free = self.slots[slot as usize].as_free();
            let generation = free.next_generation;
            self.free_head = free.next_free;
            self.slots[slot as usize] = Slot::Live(LiveSlot { generation });
            return GroupId { slot, generation };
        }

        let slot = self.slots.len() as u32;
        self.slots.push(Slot::Live(LiveSlot { generation: 0 }));
        GroupId {
            slot,
            generation: 0,
        }
    }

    pub(crate) fn is_live(&self, group: GroupId) -> bool {
        matches!(
            self.slots.get(group.slot as usize),
            Some(Slot::Live(LiveSlot { generation })) if *generation == group.generation
        )
    }

    /// Release a group.  Returns `false` if the handle was already released.
    pub(crate) fn release(&mut self, group: GroupId) -> bool {
        if !self.is_live(group) {
            return false;
        }

        self.slots[group.slot as usize] = Slot::Free(FreeSlot {
            next_generation: group.generation.wrapping_add(1),
            next_free: self.free_head,
        });
        self.free_head = Some(group.slot);
        self.live -= 1;
        true
    }

    pub(crate) fn live_count(&self) -> usize {
        self.live
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_release() {
        let mut reg = GroupRegistry::new();
        let a = reg.register();
        let b = reg.register();
        assert_ne!(a, b);
        assert!(reg.is_live(a));
        assert!(reg.is_live(b));
        assert_eq!(reg.live_count(), 2);

        assert!(reg.release(a));
        assert!(!reg.is_live(a));
        assert!(!reg.release(a));
        assert_eq!(reg.live_count(), 1);
    }

    // A reused slot must not revive handles to its previous occupant.
    #[test]
    fn test_slot_reuse_bumps_generation() {
        let mut reg = GroupRegistry::new();
        let a = reg.register();
        reg.release(a);
        let c = reg.register();
        assert_eq!(c.slot(), a.slot());
        assert_ne!(c.generation(), a.generation());
        assert!(reg.is_live(c));
        assert!(!reg.is_live(a));
    }

    #[test]
    fn test_unknown_handle_is_not_live() {
        let reg = GroupRegistry::new();
        assert!(!reg.is_live(GroupId {
            slot: 7,
            generation: 0
        }));
    }
}
