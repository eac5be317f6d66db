//! Deferred structural mutations.
//!
//! Systems iterate the store while it is borrowed, so they cannot create or
//! destroy entities or change which components an entity holds in the middle
//! of a query. They queue [`Command`]s instead, and the world flushes the
//! buffer once every system has run.
//!
//! Commands are applied in strict insertion order (FIFO). A command that fails
//! is logged and counted, and the remaining commands still run. The buffer is
//! always empty after [`CommandBuffer::apply`], whatever happened.

use tracing::warn;

use crate::component::Component;
use crate::entity::{EntityId, EntityRegistry};
use crate::store::ComponentStore;
use crate::EcsError;

// ---------------------------------------------------------------------------
// CommandKind
// ---------------------------------------------------------------------------

/// What a command does.
#[derive(Debug, Clone)]
pub enum CommandKind<C: Component> {
    /// Create an entity and attach `components` to it.
    ///
    /// `entity` is `Some` when the id was reserved up front with
    /// [`CommandBuffer::spawn_reserved`], otherwise a fresh id is allocated
    /// at apply time.
    Spawn {
        entity: Option<EntityId>,
        components: Vec<C>,
    },
    /// Destroy an entity, detaching every component it holds.
    Despawn { entity: EntityId },
    /// Attach one component.
    Attach { entity: EntityId, component: C },
    /// Detach the component of `kind`.
    Detach { entity: EntityId, kind: C::Kind },
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// A queued mutation plus where it came from.
#[derive(Debug, Clone)]
pub struct Command<C: Component> {
    pub kind: CommandKind<C>,
    /// Name of the system that queued it, if it was queued during an update.
    pub issued_by: Option<&'static str>,
    /// Position within the buffer (set on insertion).
    pub command_index: u32,
}

// ---------------------------------------------------------------------------
// ApplyReport
// ---------------------------------------------------------------------------

/// Summary of one [`CommandBuffer::apply`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Number of commands that applied successfully.
    pub success_count: usize,
    /// Number of commands that failed (their effects were skipped).
    pub failed_count: usize,
    /// Entities created by spawn commands, in command order.
    pub spawned: Vec<EntityId>,
}

// ---------------------------------------------------------------------------
// CommandBuffer
// ---------------------------------------------------------------------------

/// FIFO queue of deferred mutations.
pub struct CommandBuffer<C: Component> {
    commands: Vec<Command<C>>,
    next_index: u32,
    issuer: Option<&'static str>,
    last_apply_report: ApplyReport,
}

impl<C: Component> Default for CommandBuffer<C> {
    fn default() -> Self {
        Self {
            commands: Vec::new(),
            next_index: 0,
            issuer: None,
            last_apply_report: ApplyReport::default(),
        }
    }
}

impl<C: Component> std::fmt::Debug for CommandBuffer<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandBuffer")
            .field("commands", &self.commands)
            .field("issuer", &self.issuer)
            .finish()
    }
}

impl<C: Component> CommandBuffer<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag subsequent commands with `issuer`. The world sets this around each
    /// system's update.
    pub fn set_issuer(&mut self, issuer: Option<&'static str>) {
        self.issuer = issuer;
    }

    /// Queue an arbitrary command.
    pub fn push(&mut self, kind: CommandKind<C>) {
        let command_index = self.next_index;
        self.next_index += 1;
        self.commands.push(Command {
            kind,
            issued_by: self.issuer,
            command_index,
        });
    }

    /// Queue creation of a new entity. Its id is only known after apply.
    pub fn spawn(&mut self, components: Vec<C>) {
        self.push(CommandKind::Spawn {
            entity: None,
            components,
        });
    }

    /// Reserve an id now and queue the entity's components for apply.
    ///
    /// The id is live in `entities` immediately, so other commands in the same
    /// buffer may target it. It has no components until the buffer is applied.
    pub fn spawn_reserved(
        &mut self,
        entities: &mut EntityRegistry,
        components: Vec<C>,
    ) -> EntityId {
        let entity = entities.create();
        self.push(CommandKind::Spawn {
            entity: Some(entity),
            components,
        });
        entity
    }

    pub fn despawn(&mut self, entity: EntityId) {
        self.push(CommandKind::Despawn { entity });
    }

    pub fn attach(&mut self, entity: EntityId, component: C) {
        self.push(CommandKind::Attach { entity, component });
    }

    pub fn detach(&mut self, entity: EntityId, kind: C::Kind) {
        self.push(CommandKind::Detach { entity, kind });
    }

    /// Queued commands in insertion order.
    pub fn commands(&self) -> &[Command<C>] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Drop every queued command without applying it.
    pub fn clear(&mut self) {
        self.commands.clear();
        self.next_index = 0;
    }

    /// Report from the last [`apply`](Self::apply) call.
    ///
    /// All zero if `apply()` has never been called.
    pub fn last_apply_report(&self) -> &ApplyReport {
        &self.last_apply_report
    }

    /// Apply every queued command in insertion order.
    ///
    /// Failing commands are logged at `warn` and skipped. The buffer is empty
    /// on return.
    pub fn apply(
        &mut self,
        entities: &mut EntityRegistry,
        store: &mut ComponentStore<C>,
    ) -> ApplyReport {
        let commands = std::mem::take(&mut self.commands);
        self.next_index = 0;

        let mut report = ApplyReport::default();
        for cmd in commands {
            let command_index = cmd.command_index;
            let issued_by = cmd.issued_by.unwrap_or("<external>");
            match apply_one(cmd.kind, entities, store, command_index, issued_by) {
                Ok(spawned) => {
                    report.success_count += 1;
                    report.spawned.extend(spawned);
                }
                Err(e) => {
                    warn!(command_index, issued_by, error = %e, "command application failed");
                    report.failed_count += 1;
                }
            }
        }
        self.last_apply_report = report.clone();
        report
    }
}

fn apply_one<C: Component>(
    kind: CommandKind<C>,
    entities: &mut EntityRegistry,
    store: &mut ComponentStore<C>,
    command_index: u32,
    issued_by: &'static str,
) -> Result<Option<EntityId>, EcsError> {
    match kind {
        CommandKind::Spawn { entity, components } => {
            let entity = match entity {
                Some(reserved) if !entities.is_live(reserved) => {
                    return Err(EcsError::EntityNotFound { entity: reserved });
                }
                Some(reserved) => {
                    store.add_entity(reserved)?;
                    reserved
                }
                None => {
                    let fresh = entities.create();
                    store.insert_fresh(fresh);
                    fresh
                }
            };
            for component in components {
                // The entity stays spawned even if one of its components is rejected.
                if let Err(e) = store.attach(entity, component) {
                    warn!(
                        command_index,
                        issued_by,
                        entity = %entity,
                        error = %e,
                        "spawn could not attach component"
                    );
                }
            }
            Ok(Some(entity))
        }
        CommandKind::Despawn { entity } => {
            if !entities.is_live(entity) {
                return Err(EcsError::EntityNotFound { entity });
            }
            // A reserved id whose spawn has not been applied is not yet tracked.
            if store.contains(entity) {
                store.remove_entity(entity)?;
            }
            entities.free(entity);
            Ok(None)
        }
        CommandKind::Attach { entity, component } => {
            store.attach(entity, component)?;
            Ok(None)
        }
        CommandKind::Detach { entity, kind } => {
            store.detach(entity, kind)?;
            Ok(None)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Comp, Kind, Tracked, A, B};

    struct Fixture {
        entities: EntityRegistry,
        store: ComponentStore<Comp>,
        commands: CommandBuffer<Comp>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                entities: EntityRegistry::new(),
                store: ComponentStore::new(),
                commands: CommandBuffer::new(),
            }
        }

        fn entity(&mut self, components: Vec<Comp>) -> EntityId {
            let e = self.entities.create();
            self.store.add_entity(e).unwrap();
            for c in components {
                self.store.attach(e, c).unwrap();
            }
            e
        }

        fn apply(&mut self) -> ApplyReport {
            self.commands.apply(&mut self.entities, &mut self.store)
        }
    }

    // -- 1. Queueing --

    #[test]
    fn commands_are_indexed_and_tagged() {
        let mut fx = Fixture::new();
        let e = fx.entity(vec![]);
        fx.commands.attach(e, Comp::X);
        fx.commands.set_issuer(Some("mover"));
        fx.commands.detach(e, Kind::X);
        let cmds = fx.commands.commands();
        assert_eq!(cmds.len(), 2);
        assert_eq!(cmds[0].command_index, 0);
        assert_eq!(cmds[0].issued_by, None);
        assert_eq!(cmds[1].command_index, 1);
        assert_eq!(cmds[1].issued_by, Some("mover"));
    }

    #[test]
    fn clear_discards_without_applying() {
        let mut fx = Fixture::new();
        fx.commands.spawn(vec![Comp::X]);
        fx.commands.clear();
        assert!(fx.commands.is_empty());
        assert_eq!(fx.apply(), ApplyReport::default());
        assert!(fx.store.is_empty());
    }

    // -- 2. FIFO semantics --

    #[test]
    fn attach_then_detach_leaves_nothing() {
        let mut fx = Fixture::new();
        let e = fx.entity(vec![]);
        fx.commands.attach(e, Comp::A(A(1)));
        fx.commands.detach(e, Kind::A);
        let report = fx.apply();
        assert_eq!(report.success_count, 2);
        assert!(!fx.store.has(e, Kind::A));
    }

    #[test]
    fn detach_then_attach_leaves_new_value() {
        let mut fx = Fixture::new();
        let e = fx.entity(vec![Comp::A(A(1))]);
        fx.commands.detach(e, Kind::A);
        fx.commands.attach(e, Comp::A(A(2)));
        fx.apply();
        assert_eq!(fx.store.get_as::<A>(e), Some(&A(2)));
    }

    #[test]
    fn spawns_are_reported_in_order() {
        let mut fx = Fixture::new();
        for i in 0..5 {
            fx.commands.spawn(vec![Comp::A(A(i))]);
        }
        let report = fx.apply();
        assert_eq!(report.spawned.len(), 5);
        for (i, e) in report.spawned.iter().enumerate() {
            assert_eq!(fx.store.get_as::<A>(*e), Some(&A(i as i32)));
        }
        assert_eq!(fx.commands.last_apply_report(), &report);
    }

    // -- 3. Failure isolation --

    #[test]
    fn failure_does_not_stop_later_commands() {
        let mut fx = Fixture::new();
        let e = fx.entity(vec![Comp::A(A(1))]);
        let ghost = EntityId::new(99, 0);
        fx.commands.attach(ghost, Comp::X);
        fx.commands.attach(e, Comp::A(A(5)));
        fx.commands.attach(e, Comp::B(B(2)));
        let report = fx.apply();
        assert_eq!(report.failed_count, 2);
        assert_eq!(report.success_count, 1);
        assert_eq!(fx.store.get_as::<B>(e), Some(&B(2)));
        assert_eq!(fx.store.get_as::<A>(e), Some(&A(1)));
        assert!(fx.commands.is_empty());
    }

    #[test]
    fn despawn_twice_fails_second_time() {
        let mut fx = Fixture::new();
        let e = fx.entity(vec![Comp::X]);
        fx.commands.despawn(e);
        fx.commands.despawn(e);
        let report = fx.apply();
        assert_eq!(report.success_count, 1);
        assert_eq!(report.failed_count, 1);
        assert!(!fx.entities.is_live(e));
        assert!(!fx.store.contains(e));
    }

    #[test]
    fn despawn_runs_on_remove() {
        let mut fx = Fixture::new();
        let tracked = Tracked::default();
        let counter = tracked.removals.clone();
        let e = fx.entity(vec![Comp::Tracked(tracked)]);
        fx.commands.despawn(e);
        fx.apply();
        assert_eq!(counter.get(), 1);
        assert_eq!(fx.store.drain_removed(), vec![(e, Kind::Tracked)]);
    }

    // -- 4. Reserved spawns --

    #[test]
    fn reserved_id_can_be_targeted_in_same_flush() {
        let mut fx = Fixture::new();
        let e = fx.commands.spawn_reserved(&mut fx.entities, vec![Comp::A(A(1))]);
        assert!(fx.entities.is_live(e));
        assert!(!fx.store.contains(e));
        fx.commands.attach(e, Comp::B(B(1)));
        let report = fx.apply();
        assert_eq!(report.spawned, vec![e]);
        assert!(fx.store.has(e, Kind::A));
        assert!(fx.store.has(e, Kind::B));
    }

    #[test]
    fn spawn_with_duplicate_kinds_keeps_entity() {
        let mut fx = Fixture::new();
        fx.commands.spawn(vec![Comp::A(A(1)), Comp::A(A(2))]);
        let report = fx.apply();
        assert_eq!(report.success_count, 1);
        let e = report.spawned[0];
        assert_eq!(fx.store.get_as::<A>(e), Some(&A(1)));
    }

    #[test]
    fn despawn_of_unapplied_reservation_frees_id() {
        let mut fx = Fixture::new();
        let e = fx.commands.spawn_reserved(&mut fx.entities, vec![]);
        let mut other = CommandBuffer::new();
        other.despawn(e);
        other.apply(&mut fx.entities, &mut fx.store);
        assert!(!fx.entities.is_live(e));
        let report = fx.apply();
        assert_eq!(report.failed_count, 1);
        assert!(!fx.store.contains(e));
    }
}
