//! Component storage with a per-kind index.
//!
//! [`ComponentStore`] keeps each tracked entity's [`ComponentSet`] in a table
//! indexed by entity slot, plus a cache from component kind to the set of
//! entities holding it. The cache lets filters with required kinds intersect a
//! few buckets instead of scanning every entity.
//!
//! Cache invariant: `e` is in the bucket for `k` if and only if `e` is
//! tracked and holds a component of kind `k`. Empty buckets are dropped.
//!
//! Every detach, explicit or caused by removing the entity, goes through one
//! path: drop the component from the entity, drop the entity from the bucket,
//! append `(entity, kind)` to the deletion log, then run the component's
//! `on_remove` hook.
//!
//! Structural changes (tracking, untracking, attach, detach) are only
//! reachable through [`World`](crate::world::World) and the
//! [`CommandBuffer`](crate::command::CommandBuffer), which keep the store in
//! step with the [`EntityRegistry`](crate::entity::EntityRegistry). Outside
//! the crate a store can only be read or edited in place:
//!
//! ```compile_fail
//! use biome_ecs::prelude::*;
//!
//! fn untrack<C: Component>(store: &mut ComponentStore<C>, entity: EntityId) {
//!     store.remove_entity(entity).unwrap();
//! }
//! ```

use std::collections::btree_map::{self, BTreeMap};
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::component::{Component, ComponentKind, Variant};
use crate::entity::EntityId;
use crate::filter::{Filter, Row, RowMut};
use crate::EcsError;

// ---------------------------------------------------------------------------
// ComponentSet
// ---------------------------------------------------------------------------

/// The components held by one entity, at most one per kind.
pub struct ComponentSet<C: Component> {
    components: BTreeMap<C::Kind, C>,
}

impl<C: Component> Default for ComponentSet<C> {
    fn default() -> Self {
        Self {
            components: BTreeMap::new(),
        }
    }
}

impl<C: Component> fmt::Debug for ComponentSet<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.components.values()).finish()
    }
}

impl<C: Component> ComponentSet<C> {
    pub fn get(&self, kind: C::Kind) -> Option<&C> {
        self.components.get(&kind)
    }

    pub fn get_mut(&mut self, kind: C::Kind) -> Option<&mut C> {
        self.components.get_mut(&kind)
    }

    pub fn contains(&self, kind: C::Kind) -> bool {
        self.components.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Kinds held, in ascending order.
    pub fn kinds(&self) -> impl Iterator<Item = C::Kind> + '_ {
        self.components.keys().copied()
    }

    /// Components held, in ascending kind order.
    pub fn iter(&self) -> impl Iterator<Item = &C> + '_ {
        self.components.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (C::Kind, &mut C)> + '_ {
        self.components.iter_mut().map(|(k, c)| (*k, c))
    }

    #[cfg(test)]
    pub(crate) fn insert(&mut self, component: C) -> Option<C> {
        self.components.insert(component.kind(), component)
    }

    fn remove(&mut self, kind: C::Kind) -> Option<C> {
        self.components.remove(&kind)
    }

    fn slot(&mut self, kind: C::Kind) -> btree_map::Entry<'_, C::Kind, C> {
        self.components.entry(kind)
    }
}

// ---------------------------------------------------------------------------
// EntityTable
// ---------------------------------------------------------------------------

struct Tracked<C: Component> {
    id: EntityId,
    set: ComponentSet<C>,
}

/// Component sets indexed by entity slot. A slot holds at most one
/// generation at a time.
struct EntityTable<C: Component> {
    slots: Vec<Option<Tracked<C>>>,
    len: usize,
}

impl<C: Component> Default for EntityTable<C> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            len: 0,
        }
    }
}

impl<C: Component> EntityTable<C> {
    fn get(&self, id: EntityId) -> Option<&ComponentSet<C>> {
        match self.slots.get(id.slot() as usize)? {
            Some(tracked) if tracked.id == id => Some(&tracked.set),
            _ => None,
        }
    }

    fn get_mut(&mut self, id: EntityId) -> Option<&mut ComponentSet<C>> {
        match self.slots.get_mut(id.slot() as usize)? {
            Some(tracked) if tracked.id == id => Some(&mut tracked.set),
            _ => None,
        }
    }

    fn contains(&self, id: EntityId) -> bool {
        self.get(id).is_some()
    }

    /// Start an empty set for `id`. Returns false if its slot is taken.
    fn insert(&mut self, id: EntityId) -> bool {
        let slot = id.slot() as usize;
        if self.slots.len() <= slot {
            self.slots.resize_with(slot + 1, || None);
        }
        if self.slots[slot].is_some() {
            return false;
        }
        self.slots[slot] = Some(Tracked {
            id,
            set: ComponentSet::default(),
        });
        self.len += 1;
        true
    }

    fn remove(&mut self, id: EntityId) -> Option<ComponentSet<C>> {
        let entry = self.slots.get_mut(id.slot() as usize)?;
        if !entry.as_ref().is_some_and(|tracked| tracked.id == id) {
            return None;
        }
        self.len -= 1;
        entry.take().map(|tracked| tracked.set)
    }

    fn len(&self) -> usize {
        self.len
    }

    /// Tracked entities in slot order.
    fn iter(&self) -> impl Iterator<Item = (EntityId, &ComponentSet<C>)> + '_ {
        self.slots.iter().flatten().map(|tracked| (tracked.id, &tracked.set))
    }

    /// Mutable sets for the tracked entities among `ids`, in slot order.
    fn many_mut(
        &mut self,
        ids: impl IntoIterator<Item = EntityId>,
    ) -> Vec<(EntityId, &mut ComponentSet<C>)> {
        let mut wanted: Vec<EntityId> = ids.into_iter().collect();
        wanted.sort_unstable_by_key(|id| id.slot());
        wanted.dedup_by_key(|id| id.slot());

        let mut sets = Vec::with_capacity(wanted.len());
        let mut slots = self.slots.iter_mut();
        let mut next = 0;
        for id in wanted {
            let slot = id.slot() as usize;
            // `nth` skips the slots in between without visiting them.
            let entry = slots.nth(slot - next);
            next = slot + 1;
            match entry {
                Some(Some(tracked)) if tracked.id == id => sets.push((id, &mut tracked.set)),
                Some(_) => {}
                None => break,
            }
        }
        sets
    }
}

// ---------------------------------------------------------------------------
// ComponentStore
// ---------------------------------------------------------------------------

/// Entity to component mapping plus the kind index.
pub struct ComponentStore<C: Component> {
    entities: EntityTable<C>,
    cache: HashMap<C::Kind, HashSet<EntityId>>,
    /// Deletion log: every `(entity, kind)` detached since the last drain.
    removed: Vec<(EntityId, C::Kind)>,
}

impl<C: Component> Default for ComponentStore<C> {
    fn default() -> Self {
        Self {
            entities: EntityTable::default(),
            cache: HashMap::new(),
            removed: Vec::new(),
        }
    }
}

impl<C: Component> fmt::Debug for ComponentStore<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentStore")
            .field("entities", &self.entities.len())
            .field("kinds", &self.cache.len())
            .field("pending_removals", &self.removed.len())
            .finish()
    }
}

impl<C: Component> ComponentStore<C> {
    pub fn new() -> Self {
        Self::default()
    }

    // -- Entity tracking --

    /// Start tracking `entity` with no components.
    ///
    /// # Errors
    ///
    /// [`EcsError::EntityAlreadyExists`] if `entity`, or another generation
    /// of its slot, is already tracked.
    pub(crate) fn add_entity(&mut self, entity: EntityId) -> Result<(), EcsError> {
        if !self.entities.insert(entity) {
            return Err(EcsError::EntityAlreadyExists { entity });
        }
        Ok(())
    }

    /// Track a freshly allocated entity. The registry guarantees its slot is
    /// free.
    pub(crate) fn insert_fresh(&mut self, entity: EntityId) {
        let inserted = self.entities.insert(entity);
        debug_assert!(inserted, "slot of fresh entity {entity} already tracked");
    }

    /// Stop tracking `entity`, detaching each of its components through the
    /// normal detach path. Returns the detached components in kind order.
    ///
    /// # Errors
    ///
    /// [`EcsError::EntityNotFound`] if `entity` is not tracked.
    pub(crate) fn remove_entity(&mut self, entity: EntityId) -> Result<Vec<C>, EcsError> {
        let kinds: Vec<C::Kind> = self
            .entities
            .get(entity)
            .ok_or(EcsError::EntityNotFound { entity })?
            .kinds()
            .collect();
        let mut detached = Vec::with_capacity(kinds.len());
        for kind in kinds {
            if let Some(component) = self.detach(entity, kind)? {
                detached.push(component);
            }
        }
        self.entities.remove(entity);
        Ok(detached)
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        self.entities.contains(entity)
    }

    /// Number of tracked entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.len() == 0
    }

    /// Tracked entities in slot order.
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.iter().map(|(e, _)| e)
    }

    // -- Attach / detach --

    /// Attach `component` to `entity`.
    ///
    /// # Errors
    ///
    /// - [`EcsError::EntityNotFound`] if `entity` is not tracked.
    /// - [`EcsError::ComponentVariantAlreadyPresent`] if the entity already
    ///   holds a component of the same kind. The store is left unchanged.
    pub(crate) fn attach(&mut self, entity: EntityId, component: C) -> Result<(), EcsError> {
        let set = self
            .entities
            .get_mut(entity)
            .ok_or(EcsError::EntityNotFound { entity })?;
        let kind = component.kind();
        match set.slot(kind) {
            btree_map::Entry::Occupied(_) => {
                return Err(EcsError::ComponentVariantAlreadyPresent {
                    entity,
                    component: kind.name(),
                })
            }
            btree_map::Entry::Vacant(slot) => {
                slot.insert(component);
            }
        }
        self.cache.entry(kind).or_default().insert(entity);
        Ok(())
    }

    /// Detach the component of `kind` from `entity` and hand it back.
    ///
    /// Returns `Ok(None)` if the entity is tracked but does not hold `kind`.
    /// The returned value has already had its `on_remove` hook run.
    ///
    /// # Errors
    ///
    /// [`EcsError::EntityNotFound`] if `entity` is not tracked.
    pub(crate) fn detach(
        &mut self,
        entity: EntityId,
        kind: C::Kind,
    ) -> Result<Option<C>, EcsError> {
        let set = self
            .entities
            .get_mut(entity)
            .ok_or(EcsError::EntityNotFound { entity })?;
        let Some(mut component) = set.remove(kind) else {
            return Ok(None);
        };
        if let Some(bucket) = self.cache.get_mut(&kind) {
            bucket.remove(&entity);
            if bucket.is_empty() {
                self.cache.remove(&kind);
            }
        }
        self.removed.push((entity, kind));
        component.on_remove();
        Ok(Some(component))
    }

    /// Take the deletion log, leaving it empty.
    pub(crate) fn drain_removed(&mut self) -> Vec<(EntityId, C::Kind)> {
        std::mem::take(&mut self.removed)
    }

    /// Pending deletion log entries.
    pub fn removed(&self) -> &[(EntityId, C::Kind)] {
        &self.removed
    }

    // -- Lookup --

    /// All components of `entity`.
    ///
    /// # Errors
    ///
    /// [`EcsError::EntityNotFound`] if `entity` is not tracked.
    pub fn components_of(&self, entity: EntityId) -> Result<&ComponentSet<C>, EcsError> {
        self.entities
            .get(entity)
            .ok_or(EcsError::EntityNotFound { entity })
    }

    /// The component of `kind` on `entity`, or `Ok(None)` if it has none.
    ///
    /// # Errors
    ///
    /// [`EcsError::EntityNotFound`] if `entity` is not tracked.
    pub fn get(&self, entity: EntityId, kind: C::Kind) -> Result<Option<&C>, EcsError> {
        Ok(self.components_of(entity)?.get(kind))
    }

    /// Mutable form of [`get`](Self::get).
    pub fn get_mut(
        &mut self,
        entity: EntityId,
        kind: C::Kind,
    ) -> Result<Option<&mut C>, EcsError> {
        let set = self
            .entities
            .get_mut(entity)
            .ok_or(EcsError::EntityNotFound { entity })?;
        Ok(set.get_mut(kind))
    }

    /// Like [`get`](Self::get) but a missing component is an error too.
    ///
    /// # Errors
    ///
    /// [`EcsError::EntityNotFound`] or [`EcsError::ComponentNotFound`].
    pub fn component(&self, entity: EntityId, kind: C::Kind) -> Result<&C, EcsError> {
        self.get(entity, kind)?.ok_or(EcsError::ComponentNotFound {
            entity,
            component: kind.name(),
        })
    }

    /// Typed lookup. `None` if the entity is untracked or lacks the variant.
    pub fn get_as<T: Variant<C>>(&self, entity: EntityId) -> Option<&T> {
        self.entities
            .get(entity)?
            .get(T::KIND)
            .and_then(T::from_component)
    }

    pub fn get_as_mut<T: Variant<C>>(&mut self, entity: EntityId) -> Option<&mut T> {
        self.entities
            .get_mut(entity)?
            .get_mut(T::KIND)
            .and_then(T::from_component_mut)
    }

    /// Whether `entity` is tracked and holds `kind`.
    pub fn has(&self, entity: EntityId, kind: C::Kind) -> bool {
        self.entities.get(entity).is_some_and(|set| set.contains(kind))
    }

    /// Entities currently holding `kind`, straight from the cache.
    pub fn holders(&self, kind: C::Kind) -> Option<&HashSet<EntityId>> {
        self.cache.get(&kind)
    }

    // -- Queries --

    /// Entities matching `filter`, computed from the cache.
    ///
    /// Starts from the smallest required bucket, intersects the rest, then
    /// subtracts every `without` bucket. An empty `required` set starts from
    /// all tracked entities. Order is unspecified.
    pub fn matching_entities(&self, filter: &Filter<C::Kind>) -> HashSet<EntityId> {
        let mut buckets = Vec::with_capacity(filter.required().len());
        for kind in filter.required() {
            match self.cache.get(kind) {
                Some(bucket) => buckets.push(bucket),
                None => return HashSet::new(),
            }
        }
        buckets.sort_by_key(|bucket| bucket.len());

        let mut matched: HashSet<EntityId> = match buckets.split_first() {
            Some((smallest, rest)) => smallest
                .iter()
                .filter(|e| rest.iter().all(|bucket| bucket.contains(*e)))
                .copied()
                .collect(),
            None => self.entities().collect(),
        };

        for kind in filter.without() {
            if let Some(bucket) = self.cache.get(kind) {
                matched.retain(|e| !bucket.contains(e));
            }
        }
        matched
    }

    /// Entities matching `filter`, computed by scanning every entity without
    /// the cache. Kept as the reference for the cached path.
    pub fn matching_entities_scan(&self, filter: &Filter<C::Kind>) -> HashSet<EntityId> {
        self.entities
            .iter()
            .filter(|(_, set)| Self::admits(filter, set))
            .map(|(e, _)| e)
            .collect()
    }

    /// Read-only rows for every entity matching `filter`, in slot order.
    pub fn query<'a>(&'a self, filter: &'a Filter<C::Kind>) -> Vec<Row<'a, C>> {
        let mut matched: Vec<EntityId> = self.matching_entities(filter).into_iter().collect();
        matched.sort_unstable_by_key(|e| e.slot());
        matched
            .into_iter()
            .filter_map(|e| self.entities.get(e).map(|set| Row::new(e, set, filter)))
            .collect()
    }

    /// Mutable rows for every entity matching `filter`, in slot order. Only
    /// the matched slots are visited.
    pub fn query_mut<'a>(&'a mut self, filter: &'a Filter<C::Kind>) -> Vec<RowMut<'a, C>> {
        let matched = self.matching_entities(filter);
        self.entities
            .many_mut(matched)
            .into_iter()
            .map(|(e, set)| RowMut::new(e, set, filter))
            .collect()
    }

    /// Read-only rows computed by the scan path.
    pub fn query_scan<'a>(&'a self, filter: &'a Filter<C::Kind>) -> Vec<Row<'a, C>> {
        self.entities
            .iter()
            .filter(|(_, set)| Self::admits(filter, set))
            .map(|(e, set)| Row::new(e, set, filter))
            .collect()
    }

    fn admits(filter: &Filter<C::Kind>, set: &ComponentSet<C>) -> bool {
        filter.required().iter().all(|k| set.contains(*k))
            && filter.without().iter().all(|k| !set.contains(*k))
    }

    /// Check the cache against the entity table. Used by tests.
    pub fn cache_is_consistent(&self) -> bool {
        let forward = self.entities.iter().all(|(e, set)| {
            set.kinds()
                .all(|k| self.cache.get(&k).is_some_and(|bucket| bucket.contains(&e)))
        });
        let backward = self.cache.iter().all(|(k, bucket)| {
            !bucket.is_empty()
                && bucket
                    .iter()
                    .all(|e| self.entities.get(*e).is_some_and(|set| set.contains(*k)))
        });
        forward && backward
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
