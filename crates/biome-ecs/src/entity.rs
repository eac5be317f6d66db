//! Entity identifiers and the registry that hands them out.
//!
//! An [`EntityId`] packs a *slot* in the low 32 bits and a *generation* in the
//! high 32 bits. Destroying an entity frees its slot for reuse; the next
//! entity to take the slot gets a bumped generation, so an old handle never
//! compares equal to the entity that replaced it.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

// ---------------------------------------------------------------------------
// EntityId
// ---------------------------------------------------------------------------

/// Opaque entity identity. Equality and hashing use the raw value only.
///
/// Layout: `[generation: u32 | slot: u32]`
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Build an id from a slot and a generation.
    #[inline]
    pub fn new(slot: u32, generation: u32) -> Self {
        Self((generation as u64) << 32 | slot as u64)
    }

    /// The slot portion (low 32 bits).
    #[inline]
    pub fn slot(self) -> u32 {
        self.0 as u32
    }

    /// The generation portion (high 32 bits).
    #[inline]
    pub fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Raw `u64` value, stable across a save/load pass.
    #[inline]
    pub fn to_raw(self) -> u64 {
        self.0
    }

    /// Rebuild an id from [`to_raw`](Self::to_raw).
    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({}v{})", self.slot(), self.generation())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.slot(), self.generation())
    }
}

// ---------------------------------------------------------------------------
// EntityRegistry
// ---------------------------------------------------------------------------

/// Hands out [`EntityId`]s and recycles freed slots.
///
/// The reuse order of freed slots is an implementation detail. Callers must
/// treat ids as opaque identity only.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    /// Current generation per slot.
    generations: Vec<u32>,
    /// Whether the slot currently belongs to a live entity.
    live: Vec<bool>,
    /// Slots waiting to be reused.
    free_slots: VecDeque<u32>,
    live_count: usize,
}

impl EntityRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return an id that is not currently live, reusing a freed slot when one
    /// is available.
    pub fn create(&mut self) -> EntityId {
        self.live_count += 1;
        if let Some(slot) = self.free_slots.pop_front() {
            // Generation was already bumped in `free`.
            self.live[slot as usize] = true;
            return EntityId::new(slot, self.generations[slot as usize]);
        }
        let slot = self.generations.len() as u32;
        self.generations.push(0);
        self.live.push(true);
        EntityId::new(slot, 0)
    }

    /// Release `id` so its slot can be reused.
    ///
    /// Returns `false` if `id` was not live (already freed, stale generation or
    /// never handed out).
    pub fn free(&mut self, id: EntityId) -> bool {
        if !self.is_live(id) {
            return false;
        }
        let slot = id.slot() as usize;
        self.live[slot] = false;
        self.generations[slot] = self.generations[slot].wrapping_add(1);
        self.free_slots.push_back(id.slot());
        self.live_count -= 1;
        true
    }

    /// Whether `id` is currently live.
    pub fn is_live(&self, id: EntityId) -> bool {
        let slot = id.slot() as usize;
        slot < self.generations.len()
            && self.live[slot]
            && self.generations[slot] == id.generation()
    }

    /// Number of live ids.
    pub fn live_count(&self) -> usize {
        self.live_count
    }

    /// Capture `(generations, live, free_slots)` for a snapshot.
    pub fn snapshot_state(&self) -> (Vec<u32>, Vec<bool>, Vec<u32>) {
        (
            self.generations.clone(),
            self.live.clone(),
            self.free_slots.iter().copied().collect(),
        )
    }

    /// Rebuild a registry from [`snapshot_state`](Self::snapshot_state) output.
    ///
    /// Returns `None` when the vectors disagree in length or a free slot is
    /// out of range or marked live.
    pub fn restore_from_snapshot(
        generations: Vec<u32>,
        live: Vec<bool>,
        free_slots: Vec<u32>,
    ) -> Option<Self> {
        if generations.len() != live.len() {
            return None;
        }
        let consistent = free_slots
            .iter()
            .all(|&slot| (slot as usize) < live.len() && !live[slot as usize]);
        if !consistent {
            return None;
        }
        let live_count = live.iter().filter(|&&l| l).count();
        Some(Self {
            generations,
            live,
            free_slots: VecDeque::from(free_slots),
            live_count,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
