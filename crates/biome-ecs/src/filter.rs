//! Filters and the rows they produce.
//!
//! A [`Filter`] names three sets of component kinds:
//!
//! - `required`: the entity must hold every one of these.
//! - `without`: the entity must hold none of these.
//! - `additional`: not part of matching, but readable from the row if the
//!   entity happens to hold them.
//!
//! Rows ([`Row`], [`RowMut`]) expose only the kinds in `required` and
//! `additional`. Asking a row for anything else returns `None`, even if the
//! entity holds it.

use std::collections::BTreeSet;

use crate::component::{Component, ComponentKind, Variant};
use crate::entity::EntityId;
use crate::store::ComponentSet;

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// Match description built from component kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter<K: ComponentKind> {
    required: BTreeSet<K>,
    without: BTreeSet<K>,
    additional: BTreeSet<K>,
}

impl<K: ComponentKind> Default for Filter<K> {
    fn default() -> Self {
        Self {
            required: BTreeSet::new(),
            without: BTreeSet::new(),
            additional: BTreeSet::new(),
        }
    }
}

impl<K: ComponentKind> Filter<K> {
    /// An empty filter. With no required kinds it matches every entity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a filter from all three sets at once.
    pub fn with_parts(
        required: impl IntoIterator<Item = K>,
        without: impl IntoIterator<Item = K>,
        additional: impl IntoIterator<Item = K>,
    ) -> Self {
        Self {
            required: required.into_iter().collect(),
            without: without.into_iter().collect(),
            additional: additional.into_iter().collect(),
        }
    }

    /// Add a required kind.
    pub fn require(mut self, kind: K) -> Self {
        self.required.insert(kind);
        self
    }

    /// Add an excluded kind.
    pub fn exclude(mut self, kind: K) -> Self {
        self.without.insert(kind);
        self
    }

    /// Add an optional kind that rows may read.
    pub fn optional(mut self, kind: K) -> Self {
        self.additional.insert(kind);
        self
    }

    pub fn required(&self) -> &BTreeSet<K> {
        &self.required
    }

    pub fn without(&self) -> &BTreeSet<K> {
        &self.without
    }

    pub fn additional(&self) -> &BTreeSet<K> {
        &self.additional
    }

    /// Whether rows produced by this filter expose `kind`.
    pub fn includes(&self, kind: K) -> bool {
        self.required.contains(&kind) || self.additional.contains(&kind)
    }

    /// Whether an entity holding exactly `held` kinds matches.
    pub fn matches(&self, held: &BTreeSet<K>) -> bool {
        self.required.iter().all(|k| held.contains(k))
            && self.without.iter().all(|k| !held.contains(k))
    }
}

// ---------------------------------------------------------------------------
// Row
// ---------------------------------------------------------------------------

/// Read-only view of one matching entity.
#[derive(Debug)]
pub struct Row<'a, C: Component> {
    entity: EntityId,
    components: &'a ComponentSet<C>,
    filter: &'a Filter<C::Kind>,
}

impl<'a, C: Component> Clone for Row<'a, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, C: Component> Copy for Row<'a, C> {}

impl<'a, C: Component> Row<'a, C> {
    pub(crate) fn new(
        entity: EntityId,
        components: &'a ComponentSet<C>,
        filter: &'a Filter<C::Kind>,
    ) -> Self {
        Self {
            entity,
            components,
            filter,
        }
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// The component of `kind`, if the filter exposes it and the entity holds it.
    pub fn get(&self, kind: C::Kind) -> Option<&'a C> {
        if !self.filter.includes(kind) {
            return None;
        }
        self.components.get(kind)
    }

    /// Typed variant of [`get`](Self::get).
    pub fn get_as<T: Variant<C>>(&self) -> Option<&'a T> {
        self.get(T::KIND).and_then(T::from_component)
    }
}

// ---------------------------------------------------------------------------
// RowMut
// ---------------------------------------------------------------------------

/// Mutable view of one matching entity.
///
/// Components can be edited in place. Adding or removing components must go
/// through the store or a command buffer.
#[derive(Debug)]
pub struct RowMut<'a, C: Component> {
    entity: EntityId,
    components: &'a mut ComponentSet<C>,
    filter: &'a Filter<C::Kind>,
}

impl<'a, C: Component> RowMut<'a, C> {
    pub(crate) fn new(
        entity: EntityId,
        components: &'a mut ComponentSet<C>,
        filter: &'a Filter<C::Kind>,
    ) -> Self {
        Self {
            entity,
            components,
            filter,
        }
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn get(&self, kind: C::Kind) -> Option<&C> {
        if !self.filter.includes(kind) {
            return None;
        }
        self.components.get(kind)
    }

    pub fn get_mut(&mut self, kind: C::Kind) -> Option<&mut C> {
        if !self.filter.includes(kind) {
            return None;
        }
        self.components.get_mut(kind)
    }

    pub fn get_as<T: Variant<C>>(&self) -> Option<&T> {
        self.get(T::KIND).and_then(T::from_component)
    }

    pub fn get_as_mut<T: Variant<C>>(&mut self) -> Option<&mut T> {
        self.get_mut(T::KIND).and_then(T::from_component_mut)
    }

    /// Borrow two different variants mutably at once.
    ///
    /// Returns `None` if `A` and `B` are the same kind, if either kind is not
    /// exposed by the filter, or if the entity lacks either one.
    pub fn pair_mut<A: Variant<C>, B: Variant<C>>(&mut self) -> Option<(&mut A, &mut B)> {
        if A::KIND == B::KIND || !self.filter.includes(A::KIND) || !self.filter.includes(B::KIND) {
            return None;
        }
        let mut first = None;
        let mut second = None;
        for (kind, component) in self.components.iter_mut() {
            if kind == A::KIND {
                first = A::from_component_mut(component);
            } else if kind == B::KIND {
                second = B::from_component_mut(component);
            }
        }
        Some((first?, second?))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
