//! Systems and the context they run in.
//!
//! A [`System`] is a unit of per-tick logic. The world owns one instance per
//! concrete type, calls [`System::on_create`] once when it is registered, and
//! calls [`System::on_update`] every tick in ascending
//! [`update_order`](System::update_order).

use std::any::Any;

use crate::command::CommandBuffer;
use crate::component::Component;
use crate::entity::{EntityId, EntityRegistry};
use crate::store::ComponentStore;
use crate::world::World;
use crate::EcsError;

// ---------------------------------------------------------------------------
// AsAny
// ---------------------------------------------------------------------------

/// Upcast to [`Any`] so the world can hand back concrete system types.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

/// Per-tick logic over the component set `C`.
pub trait System<C: Component>: AsAny {
    /// Called once after construction, before the system joins the schedule.
    ///
    /// The system is not yet in `world`, so it can look up or create the
    /// systems it depends on.
    fn on_create(&mut self, _world: &mut World<C>) -> Result<(), EcsError> {
        Ok(())
    }

    /// Called once per [`World::update`] while the system is enabled.
    fn on_update(&mut self, ctx: &mut SystemContext<'_, C>, dt: f64);

    /// Lower runs first. Systems with equal order run in registration order.
    fn update_order(&self) -> i32 {
        0
    }

    /// Name used in logs, errors and command provenance.
    fn name(&self) -> &'static str {
        short_type_name::<Self>()
    }
}

/// Last path segment of `T`'s type name.
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

// ---------------------------------------------------------------------------
// SystemContext
// ---------------------------------------------------------------------------

/// What a system can touch during [`System::on_update`].
///
/// `store` and `commands` are separate fields so a system can hold rows from
/// a query while it queues commands. The store only allows reads and in-place
/// edits; spawning, despawning, attaching and detaching go through `commands`.
pub struct SystemContext<'w, C: Component> {
    pub store: &'w mut ComponentStore<C>,
    pub commands: &'w mut CommandBuffer<C>,
    entities: &'w mut EntityRegistry,
}

impl<'w, C: Component> SystemContext<'w, C> {
    pub(crate) fn new(
        store: &'w mut ComponentStore<C>,
        commands: &'w mut CommandBuffer<C>,
        entities: &'w mut EntityRegistry,
    ) -> Self {
        Self {
            store,
            commands,
            entities,
        }
    }

    /// Queue a new entity and return its id right away.
    ///
    /// The entity exists once the world flushes its command buffer.
    pub fn spawn(&mut self, components: Vec<C>) -> EntityId {
        self.commands.spawn_reserved(self.entities, components)
    }

    /// Whether `entity` is live, including ids reserved this tick.
    pub fn is_live(&self, entity: EntityId) -> bool {
        self.entities.is_live(entity)
    }

    /// Number of live entities, including ids reserved this tick.
    pub fn live_count(&self) -> usize {
        self.entities.live_count()
    }
}

// ---------------------------------------------------------------------------
// SystemRegistry
// ---------------------------------------------------------------------------

type Factory<C> = fn(&mut World<C>) -> Result<bool, EcsError>;

/// Ordered list of system constructors.
///
/// Replaces runtime discovery of system types: a consumer lists its systems
/// once and [`World::create_systems`] instantiates whichever are missing.
pub struct SystemRegistry<C: Component> {
    factories: Vec<(&'static str, Factory<C>)>,
}

impl<C: Component> Default for SystemRegistry<C> {
    fn default() -> Self {
        Self {
            factories: Vec::new(),
        }
    }
}

impl<C: Component> SystemRegistry<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `T` to the list.
    pub fn register<T>(&mut self) -> &mut Self
    where
        T: System<C> + Default,
    {
        self.factories
            .push((short_type_name::<T>(), create_if_missing::<C, T>));
        self
    }

    /// Builder form of [`register`](Self::register).
    pub fn with<T>(mut self) -> Self
    where
        T: System<C> + Default,
    {
        self.register::<T>();
        self
    }

    /// Registered system names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.factories.iter().map(|(name, _)| *name)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    pub(crate) fn factories(&self) -> impl Iterator<Item = &(&'static str, Factory<C>)> + '_ {
        self.factories.iter()
    }
}

fn create_if_missing<C, T>(world: &mut World<C>) -> Result<bool, EcsError>
where
    C: Component,
    T: System<C> + Default,
{
    if world.has_system::<T>() {
        return Ok(false);
    }
    world.create_system::<T>()?;
    Ok(true)
}
