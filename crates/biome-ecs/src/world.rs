//! The [`World`]: one store, one command buffer and an ordered set of
//! systems, plus [`Worlds`] for holding several of them with one marked
//! current.
//!
//! # Frame
//!
//! [`World::update`] runs every enabled system in ascending
//! [`update_order`](System::update_order) (ties in registration order), then
//! flushes the command buffer exactly once.
//!
//! # Example
//!
//! ```ignore
//! let mut world = World::<SimComponent>::new();
//! world.create_system::<HungerSystem>()?;
//! let e = world.create_entity();
//! world.attach(e, SimComponent::Hunger(Hunger(50.0)))?;
//! let report = world.update(1.0);
//! ```

use std::any::TypeId;
use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, info, trace};

use crate::command::{ApplyReport, CommandBuffer};
use crate::component::{Component, Variant};
use crate::entity::{EntityId, EntityRegistry};
use crate::filter::{Filter, Row, RowMut};
use crate::store::{ComponentSet, ComponentStore};
use crate::system::{AsAny, System, SystemContext, SystemRegistry};
use crate::EcsError;

// ---------------------------------------------------------------------------
// SystemEntry
// ---------------------------------------------------------------------------

struct SystemEntry<C: Component> {
    type_id: TypeId,
    name: &'static str,
    order: i32,
    /// Registration sequence, the tie-break for equal `order`.
    sequence: u64,
    enabled: bool,
    system: Box<dyn System<C>>,
}

impl<C: Component> SystemEntry<C> {
    // Deref to the trait object first. `Box<dyn System<C>>` is itself `Any`
    // and would otherwise downcast as the box.
    fn downcast_ref<T: System<C>>(&self) -> Option<&T> {
        (*self.system).as_any().downcast_ref::<T>()
    }

    fn downcast_mut<T: System<C>>(&mut self) -> Option<&mut T> {
        (*self.system).as_any_mut().downcast_mut::<T>()
    }
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// A self-contained simulation over the component set `C`.
pub struct World<C: Component> {
    entities: EntityRegistry,
    store: ComponentStore<C>,
    commands: CommandBuffer<C>,
    /// Kept sorted by `(order, sequence)`.
    systems: Vec<SystemEntry<C>>,
    next_sequence: u64,
}

impl<C: Component> Default for World<C> {
    fn default() -> Self {
        Self {
            entities: EntityRegistry::new(),
            store: ComponentStore::new(),
            commands: CommandBuffer::new(),
            systems: Vec::new(),
            next_sequence: 0,
        }
    }
}

impl<C: Component> fmt::Debug for World<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("entities", &self.store.len())
            .field("systems", &self.system_names())
            .field("pending_commands", &self.commands.len())
            .finish()
    }
}

impl<C: Component> World<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(entities: EntityRegistry, store: ComponentStore<C>) -> Self {
        Self {
            entities,
            store,
            ..Self::default()
        }
    }

    // -- Entities and components --------------------------------------------

    /// Create an empty entity.
    pub fn create_entity(&mut self) -> EntityId {
        let entity = self.entities.create();
        self.store.insert_fresh(entity);
        entity
    }

    /// Create an entity and attach `components`.
    ///
    /// # Errors
    ///
    /// [`EcsError::ComponentVariantAlreadyPresent`] if two components share a
    /// kind. The entity is destroyed again before returning.
    pub fn spawn(&mut self, components: impl IntoIterator<Item = C>) -> Result<EntityId, EcsError> {
        let entity = self.create_entity();
        for component in components {
            if let Err(e) = self.store.attach(entity, component) {
                self.destroy_entity(entity)?;
                return Err(e);
            }
        }
        Ok(entity)
    }

    /// Detach every component of `entity` (running `on_remove` on each) and
    /// free its id. Returns the detached components.
    ///
    /// # Errors
    ///
    /// [`EcsError::EntityNotFound`] if `entity` is not live.
    pub fn destroy_entity(&mut self, entity: EntityId) -> Result<Vec<C>, EcsError> {
        if !self.entities.is_live(entity) {
            return Err(EcsError::EntityNotFound { entity });
        }
        let detached = if self.store.contains(entity) {
            self.store.remove_entity(entity)?
        } else {
            Vec::new()
        };
        self.entities.free(entity);
        Ok(detached)
    }

    pub fn is_live(&self, entity: EntityId) -> bool {
        self.entities.is_live(entity)
    }

    /// Number of entities tracked by the store.
    pub fn entity_count(&self) -> usize {
        self.store.len()
    }

    /// See [`ComponentStore::attach`].
    pub fn attach(&mut self, entity: EntityId, component: C) -> Result<(), EcsError> {
        self.store.attach(entity, component)
    }

    /// See [`ComponentStore::detach`].
    pub fn detach(&mut self, entity: EntityId, kind: C::Kind) -> Result<Option<C>, EcsError> {
        self.store.detach(entity, kind)
    }

    pub fn get(&self, entity: EntityId, kind: C::Kind) -> Result<Option<&C>, EcsError> {
        self.store.get(entity, kind)
    }

    pub fn get_mut(
        &mut self,
        entity: EntityId,
        kind: C::Kind,
    ) -> Result<Option<&mut C>, EcsError> {
        self.store.get_mut(entity, kind)
    }

    pub fn get_as<T: Variant<C>>(&self, entity: EntityId) -> Option<&T> {
        self.store.get_as::<T>(entity)
    }

    pub fn get_as_mut<T: Variant<C>>(&mut self, entity: EntityId) -> Option<&mut T> {
        self.store.get_as_mut::<T>(entity)
    }

    pub fn components_of(&self, entity: EntityId) -> Result<&ComponentSet<C>, EcsError> {
        self.store.components_of(entity)
    }

    pub fn query<'a>(&'a self, filter: &'a Filter<C::Kind>) -> Vec<Row<'a, C>> {
        self.store.query(filter)
    }

    pub fn query_mut<'a>(&'a mut self, filter: &'a Filter<C::Kind>) -> Vec<RowMut<'a, C>> {
        self.store.query_mut(filter)
    }

    pub fn store(&self) -> &ComponentStore<C> {
        &self.store
    }

    /// Take the store's deletion log: every `(entity, kind)` detached since
    /// the last drain.
    pub fn drain_removed(&mut self) -> Vec<(EntityId, C::Kind)> {
        self.store.drain_removed()
    }

    pub fn entities(&self) -> &EntityRegistry {
        &self.entities
    }

    pub fn commands(&self) -> &CommandBuffer<C> {
        &self.commands
    }

    /// Queue commands from outside a system. They run at the end of the next
    /// [`update`](Self::update), or on [`flush_commands`](Self::flush_commands).
    pub fn commands_mut(&mut self) -> &mut CommandBuffer<C> {
        &mut self.commands
    }

    /// Apply queued commands now instead of waiting for the next update.
    pub fn flush_commands(&mut self) -> ApplyReport {
        self.commands.apply(&mut self.entities, &mut self.store)
    }

    // -- Systems ------------------------------------------------------------

    /// Construct `T` with `Default` and register it.
    ///
    /// # Errors
    ///
    /// [`EcsError::SystemAlreadyExists`] if a `T` is already registered, or
    /// whatever `T::on_create` returns.
    pub fn create_system<T>(&mut self) -> Result<&mut T, EcsError>
    where
        T: System<C> + Default,
    {
        self.add_system(T::default())
    }

    /// Register an already constructed system.
    ///
    /// Runs `on_create` before the system joins the schedule.
    pub fn add_system<T: System<C>>(&mut self, mut system: T) -> Result<&mut T, EcsError> {
        let name = system.name();
        if self.has_system::<T>() {
            return Err(EcsError::SystemAlreadyExists { system: name });
        }
        system.on_create(self)?;
        // on_create may have registered another T while it ran.
        if self.has_system::<T>() {
            return Err(EcsError::SystemAlreadyExists { system: name });
        }

        let order = system.update_order();
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        let index = self
            .systems
            .partition_point(|e| (e.order, e.sequence) <= (order, sequence));
        self.systems.insert(
            index,
            SystemEntry {
                type_id: TypeId::of::<T>(),
                name,
                order,
                sequence,
                enabled: true,
                system: Box::new(system),
            },
        );
        debug!(system = name, order, "system created");

        self.systems[index]
            .downcast_mut::<T>()
            .ok_or(EcsError::SystemNotFound { system: name })
    }

    /// Return the registered `T`, creating it first if needed.
    pub fn get_or_create_system<T>(&mut self) -> Result<&mut T, EcsError>
    where
        T: System<C> + Default,
    {
        if self.has_system::<T>() {
            self.get_system_mut::<T>()
        } else {
            self.create_system::<T>()
        }
    }

    pub fn has_system<T: System<C>>(&self) -> bool {
        self.position::<T>().is_some()
    }

    /// # Errors
    ///
    /// [`EcsError::SystemNotFound`] if no `T` is registered.
    pub fn get_system<T: System<C>>(&self) -> Result<&T, EcsError> {
        self.position::<T>()
            .and_then(|i| self.systems[i].downcast_ref::<T>())
            .ok_or_else(not_found::<C, T>)
    }

    pub fn get_system_mut<T: System<C>>(&mut self) -> Result<&mut T, EcsError> {
        let index = self.position::<T>().ok_or_else(not_found::<C, T>)?;
        self.systems[index]
            .downcast_mut::<T>()
            .ok_or_else(not_found::<C, T>)
    }

    /// Unregister `T` and hand the instance back.
    pub fn remove_system<T: System<C>>(&mut self) -> Result<Box<T>, EcsError> {
        let index = self.position::<T>().ok_or_else(not_found::<C, T>)?;
        let entry = self.systems.remove(index);
        debug!(system = entry.name, "system removed");
        AsAny::into_any(entry.system)
            .downcast::<T>()
            .map_err(|_| not_found::<C, T>())
    }

    /// Include or skip `T` in future updates.
    pub fn set_enabled<T: System<C>>(&mut self, enabled: bool) -> Result<(), EcsError> {
        let index = self.position::<T>().ok_or_else(not_found::<C, T>)?;
        self.systems[index].enabled = enabled;
        Ok(())
    }

    pub fn is_enabled<T: System<C>>(&self) -> Result<bool, EcsError> {
        let index = self.position::<T>().ok_or_else(not_found::<C, T>)?;
        Ok(self.systems[index].enabled)
    }

    /// System names in execution order.
    pub fn system_names(&self) -> Vec<&'static str> {
        self.systems.iter().map(|e| e.name).collect()
    }

    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    /// Create every system in `registry` that is not already present.
    /// Returns how many were created.
    pub fn create_systems(&mut self, registry: &SystemRegistry<C>) -> Result<usize, EcsError> {
        let mut created = 0;
        for (name, factory) in registry.factories() {
            if factory(self)? {
                created += 1;
            } else {
                trace!(system = *name, "system already present");
            }
        }
        info!(created, listed = registry.len(), "systems created from registry");
        Ok(created)
    }

    fn position<T: System<C>>(&self) -> Option<usize> {
        let type_id = TypeId::of::<T>();
        self.systems.iter().position(|e| e.type_id == type_id)
    }

    // -- Frame --------------------------------------------------------------

    /// Run one frame: every enabled system in order, then one command flush.
    pub fn update(&mut self, dt: f64) -> ApplyReport {
        trace!(dt, systems = self.systems.len(), "world update");
        for entry in self.systems.iter_mut().filter(|e| e.enabled) {
            self.commands.set_issuer(Some(entry.name));
            let mut ctx =
                SystemContext::new(&mut self.store, &mut self.commands, &mut self.entities);
            entry.system.on_update(&mut ctx, dt);
        }
        self.commands.set_issuer(None);
        self.commands.apply(&mut self.entities, &mut self.store)
    }
}

fn not_found<C: Component, T: System<C>>() -> EcsError {
    EcsError::SystemNotFound {
        system: crate::system::short_type_name::<T>(),
    }
}

// ---------------------------------------------------------------------------
// Worlds
// ---------------------------------------------------------------------------

/// Handle to a world inside [`Worlds`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorldId(u32);

impl fmt::Display for WorldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "world#{}", self.0)
    }
}

/// A set of worlds with one of them marked current.
///
/// The first world inserted becomes current. Whoever owns the frame loop holds
/// this value and decides which world to drive.
pub struct Worlds<C: Component> {
    worlds: BTreeMap<WorldId, World<C>>,
    current: Option<WorldId>,
    next_id: u32,
}

impl<C: Component> Default for Worlds<C> {
    fn default() -> Self {
        Self {
            worlds: BTreeMap::new(),
            current: None,
            next_id: 0,
        }
    }
}

impl<C: Component> fmt::Debug for Worlds<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worlds")
            .field("worlds", &self.worlds.keys().collect::<Vec<_>>())
            .field("current", &self.current)
            .finish()
    }
}

impl<C: Component> Worlds<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a world. It becomes current if there was none.
    pub fn insert(&mut self, world: World<C>) -> WorldId {
        let id = WorldId(self.next_id);
        self.next_id += 1;
        self.worlds.insert(id, world);
        if self.current.is_none() {
            self.current = Some(id);
        }
        id
    }

    pub fn get(&self, id: WorldId) -> Result<&World<C>, EcsError> {
        self.worlds.get(&id).ok_or(EcsError::WorldNotFound { world: id })
    }

    pub fn get_mut(&mut self, id: WorldId) -> Result<&mut World<C>, EcsError> {
        self.worlds
            .get_mut(&id)
            .ok_or(EcsError::WorldNotFound { world: id })
    }

    /// Remove a world. If it was current, the lowest remaining id becomes
    /// current.
    pub fn remove(&mut self, id: WorldId) -> Result<World<C>, EcsError> {
        let world = self
            .worlds
            .remove(&id)
            .ok_or(EcsError::WorldNotFound { world: id })?;
        if self.current == Some(id) {
            self.current = self.worlds.keys().next().copied();
        }
        Ok(world)
    }

    pub fn set_current(&mut self, id: WorldId) -> Result<(), EcsError> {
        if !self.worlds.contains_key(&id) {
            return Err(EcsError::WorldNotFound { world: id });
        }
        self.current = Some(id);
        Ok(())
    }

    pub fn current_id(&self) -> Option<WorldId> {
        self.current
    }

    pub fn current(&self) -> Result<&World<C>, EcsError> {
        let id = self.current.ok_or(EcsError::NoCurrentWorld)?;
        self.get(id)
    }

    pub fn current_mut(&mut self) -> Result<&mut World<C>, EcsError> {
        let id = self.current.ok_or(EcsError::NoCurrentWorld)?;
        self.get_mut(id)
    }

    /// Run one frame of the current world.
    pub fn update_current(&mut self, dt: f64) -> Result<ApplyReport, EcsError> {
        Ok(self.current_mut()?.update(dt))
    }

    pub fn ids(&self) -> impl Iterator<Item = WorldId> + '_ {
        self.worlds.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.worlds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.worlds.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
