//! World snapshot and restore.
//!
//! [`WorldSnapshot`] holds the entity registry state and every tracked
//! entity with its components. It is plain serde data, so a persistence pass
//! can write it anywhere serde can. Entity ids survive the round trip, and
//! allocation after a restore continues exactly as it would have in the
//! original world.
//!
//! Systems are not captured. They are code, and the caller re-registers them
//! on the restored world.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::component::Component;
use crate::entity::{EntityId, EntityRegistry};
use crate::store::ComponentStore;
use crate::world::World;
use crate::EcsError;

// ---------------------------------------------------------------------------
// Snapshot types
// ---------------------------------------------------------------------------

/// Serializable state of the [`EntityRegistry`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    /// Per-slot generation counters.
    pub generations: Vec<u32>,
    /// Per-slot live flags.
    pub live: Vec<bool>,
    /// Free slots in reuse order.
    pub free_slots: Vec<u32>,
}

/// One entity and its components, in kind order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot<C> {
    pub entity_id: EntityId,
    pub components: Vec<C>,
}

/// A complete, serializable copy of a world's entity data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot<C> {
    pub registry: RegistrySnapshot,
    /// Every tracked entity, sorted by id.
    pub entities: Vec<EntitySnapshot<C>>,
}

// ---------------------------------------------------------------------------
// World snapshot/restore impl
// ---------------------------------------------------------------------------

impl<C: Component + Clone> World<C> {
    /// Copy out the registry and every tracked entity.
    pub fn capture_snapshot(&self) -> WorldSnapshot<C> {
        let (generations, live, free_slots) = self.entities().snapshot_state();
        let store = self.store();
        let mut entities: Vec<EntitySnapshot<C>> = store
            .entities()
            .filter_map(|entity_id| {
                let set = store.components_of(entity_id).ok()?;
                Some(EntitySnapshot {
                    entity_id,
                    components: set.iter().cloned().collect(),
                })
            })
            .collect();
        entities.sort_by_key(|e| e.entity_id);

        WorldSnapshot {
            registry: RegistrySnapshot {
                generations,
                live,
                free_slots,
            },
            entities,
        }
    }
}

impl<C: Component> World<C> {
    /// Build a new world from `snapshot`.
    ///
    /// Runs `on_restore` on every component before attaching it. The returned
    /// world has no systems.
    ///
    /// # Errors
    ///
    /// [`EcsError::SnapshotMismatch`] if the registry state is inconsistent,
    /// an entity id is not live in it, an entity appears twice, or an entity
    /// holds two components of the same kind.
    pub fn from_snapshot(snapshot: WorldSnapshot<C>) -> Result<Self, EcsError> {
        let WorldSnapshot { registry, entities } = snapshot;
        let registry = EntityRegistry::restore_from_snapshot(
            registry.generations,
            registry.live,
            registry.free_slots,
        )
        .ok_or_else(|| EcsError::SnapshotMismatch {
            details: "registry generations, live flags and free slots disagree".to_owned(),
        })?;

        let mut seen = HashSet::with_capacity(entities.len());
        for entity in &entities {
            if !registry.is_live(entity.entity_id) {
                return Err(EcsError::SnapshotMismatch {
                    details: format!("entity {} is not live in the registry", entity.entity_id),
                });
            }
            if !seen.insert(entity.entity_id) {
                return Err(EcsError::SnapshotMismatch {
                    details: format!("entity {} appears more than once", entity.entity_id),
                });
            }
        }
        // Live slots without entity data would leak ids forever.
        if seen.len() != registry.live_count() {
            return Err(EcsError::SnapshotMismatch {
                details: format!(
                    "registry has {} live ids but snapshot holds {} entities",
                    registry.live_count(),
                    seen.len()
                ),
            });
        }

        let mut store = ComponentStore::new();
        for EntitySnapshot {
            entity_id,
            components,
        } in entities
        {
            store.add_entity(entity_id)?;
            for mut component in components {
                component.on_restore();
                store
                    .attach(entity_id, component)
                    .map_err(|e| EcsError::SnapshotMismatch {
                        details: e.to_string(),
                    })?;
            }
        }
        debug!(entities = store.len(), "world restored from snapshot");
        Ok(World::from_parts(registry, store))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
