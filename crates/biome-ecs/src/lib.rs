//! Biome ECS -- entity component system with a per-kind index and deferred
//! structural mutation.
//!
//! Entities are generational ids. Components are values of one closed enum
//! chosen by the consumer; the store keys them by their [`ComponentKind`] tag
//! and keeps a kind-to-entities cache so filters resolve by set intersection.
//! Systems run in a fixed priority order once per frame and queue structural
//! changes in a command buffer that the world flushes after the sweep.
//!
//! # Quick Start
//!
//! ```
//! use biome_ecs::prelude::*;
//!
//! #[derive(Debug, Clone, PartialEq)]
//! enum Comp {
//!     Hunger(f64),
//!     Dead,
//! }
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
//! enum Kind {
//!     Hunger,
//!     Dead,
//! }
//!
//! impl ComponentKind for Kind {
//!     fn name(self) -> &'static str {
//!         match self {
//!             Kind::Hunger => "hunger",
//!             Kind::Dead => "dead",
//!         }
//!     }
//! }
//!
//! impl Component for Comp {
//!     type Kind = Kind;
//!     fn kind(&self) -> Kind {
//!         match self {
//!             Comp::Hunger(_) => Kind::Hunger,
//!             Comp::Dead => Kind::Dead,
//!         }
//!     }
//! }
//!
//! #[derive(Default)]
//! struct Starve;
//!
//! impl System<Comp> for Starve {
//!     fn on_update(&mut self, ctx: &mut SystemContext<'_, Comp>, dt: f64) {
//!         let filter = Filter::new().require(Kind::Hunger).exclude(Kind::Dead);
//!         for mut row in ctx.store.query_mut(&filter) {
//!             let entity = row.entity();
//!             if let Some(Comp::Hunger(h)) = row.get_mut(Kind::Hunger) {
//!                 *h -= dt;
//!                 if *h <= 0.0 {
//!                     ctx.commands.attach(entity, Comp::Dead);
//!                 }
//!             }
//!         }
//!     }
//! }
//!
//! let mut world = World::<Comp>::new();
//! world.create_system::<Starve>().unwrap();
//! let e = world.spawn([Comp::Hunger(1.5)]).unwrap();
//!
//! world.update(1.0);
//! assert!(!world.store().has(e, Kind::Dead));
//! world.update(1.0);
//! assert!(world.store().has(e, Kind::Dead));
//! ```

pub mod command;
pub mod component;
pub mod entity;
pub mod filter;
pub mod snapshot;
pub mod store;
pub mod system;
pub mod world;

#[cfg(test)]
pub(crate) mod testing;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by ECS operations.
#[derive(Debug, thiserror::Error)]
pub enum EcsError {
    /// The entity is not tracked (never created, or already destroyed).
    #[error("entity {entity:?} does not exist")]
    EntityNotFound { entity: entity::EntityId },

    /// The entity is already tracked by the store.
    #[error("entity {entity:?} already exists")]
    EntityAlreadyExists { entity: entity::EntityId },

    /// The entity exists but does not hold the requested component.
    #[error("entity {entity:?} has no '{component}' component")]
    ComponentNotFound {
        entity: entity::EntityId,
        component: &'static str,
    },

    /// The entity already holds a component of this kind.
    #[error("entity {entity:?} already has a '{component}' component")]
    ComponentVariantAlreadyPresent {
        entity: entity::EntityId,
        component: &'static str,
    },

    /// No system of this type is registered.
    #[error("system '{system}' is not registered")]
    SystemNotFound { system: &'static str },

    /// A system of this type is already registered.
    #[error("system '{system}' is already registered")]
    SystemAlreadyExists { system: &'static str },

    /// No world with this id.
    #[error("{world} does not exist")]
    WorldNotFound { world: world::WorldId },

    /// No world is marked current.
    #[error("no current world")]
    NoCurrentWorld,

    /// A snapshot could not be restored.
    #[error("snapshot does not match a consistent world: {details}")]
    SnapshotMismatch { details: String },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::command::{ApplyReport, Command, CommandBuffer, CommandKind};
    pub use crate::component::{Component, ComponentKind, Variant};
    pub use crate::entity::{EntityId, EntityRegistry};
    pub use crate::filter::{Filter, Row, RowMut};
    pub use crate::snapshot::{EntitySnapshot, RegistrySnapshot, WorldSnapshot};
    pub use crate::store::{ComponentSet, ComponentStore};
    pub use crate::system::{System, SystemContext, SystemRegistry};
    pub use crate::world::{World, WorldId, Worlds};
    pub use crate::EcsError;
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use crate::prelude::*;
    use crate::testing::{Comp, Kind, A, B};

    fn setup_world() -> (World<Comp>, Vec<EntityId>) {
        let mut world = World::new();
        let ids = vec![
            world.spawn([Comp::A(A(0)), Comp::B(B(0)), Comp::C(0)]).unwrap(),
            world.spawn([Comp::A(A(1)), Comp::B(B(1))]).unwrap(),
            world.spawn([Comp::A(A(2)), Comp::B(B(2)), Comp::X]).unwrap(),
            world.spawn([Comp::A(A(3))]).unwrap(),
        ];
        (world, ids)
    }

    // -- query row contents ---------------------------------------------------

    #[test]
    fn one_row_per_matching_entity_with_required_kinds() {
        let (world, ids) = setup_world();
        let filter = Filter::new().require(Kind::A).require(Kind::B);
        let rows = world.query(&filter);
        assert_eq!(rows.len(), 3);
        for row in &rows {
            assert!(ids[..3].contains(&row.entity()));
            assert!(row.get(Kind::A).is_some());
            assert!(row.get(Kind::B).is_some());
            assert!(row.get(Kind::C).is_none(), "C not in additional");
        }
    }

    #[test]
    fn additional_kind_present_only_where_held() {
        let (world, ids) = setup_world();
        let filter = Filter::new().require(Kind::A).require(Kind::B).optional(Kind::C);
        for row in world.query(&filter) {
            assert_eq!(row.get(Kind::C).is_some(), row.entity() == ids[0]);
        }
    }

    #[test]
    fn without_excludes_holders() {
        let (world, ids) = setup_world();
        let filter = Filter::new().require(Kind::A).require(Kind::B).exclude(Kind::X);
        let mut matched: Vec<_> = world.query(&filter).iter().map(|r| r.entity()).collect();
        matched.sort();
        assert_eq!(matched, vec![ids[0], ids[1]]);
    }

    #[test]
    fn detach_removes_from_later_queries() {
        let (mut world, ids) = setup_world();
        world.detach(ids[1], Kind::B).unwrap();
        let filter = Filter::new().require(Kind::B);
        assert!(world.query(&filter).iter().all(|r| r.entity() != ids[1]));
        assert!(world.store().cache_is_consistent());
    }

    #[test]
    fn destroyed_entity_vanishes_everywhere() {
        let (mut world, ids) = setup_world();
        world.destroy_entity(ids[0]).unwrap();
        for kind in [Kind::A, Kind::B, Kind::C] {
            assert!(world
                .store()
                .holders(kind)
                .map_or(true, |bucket| !bucket.contains(&ids[0])));
        }
        assert!(matches!(
            world.get(ids[0], Kind::A),
            Err(EcsError::EntityNotFound { .. })
        ));
    }

    #[test]
    fn error_messages_name_the_component() {
        let (world, ids) = setup_world();
        let err = world.store().component(ids[3], Kind::B).unwrap_err();
        assert_eq!(err.to_string(), format!("entity {:?} has no 'b' component", ids[3]));
    }
}
