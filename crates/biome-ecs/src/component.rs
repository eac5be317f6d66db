//! Component traits.
//!
//! The ECS does not inspect runtime types. A consumer crate defines one closed
//! sum type holding every component it uses and implements [`Component`] for
//! it. Each value reports a [`ComponentKind`] tag, a fieldless enum that the
//! store uses as its index key.
//!
//! [`Variant`] gives typed access to one arm of that sum type, so systems can
//! write `row.get_as::<Hunger>()` instead of matching by hand.

use std::fmt;
use std::hash::Hash;

// ---------------------------------------------------------------------------
// ComponentKind
// ---------------------------------------------------------------------------

/// Tag naming a component variant.
pub trait ComponentKind: Copy + Eq + Ord + Hash + fmt::Debug + 'static {
    /// Human-readable name used in errors and logs.
    fn name(self) -> &'static str;
}

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

/// A component value. Implemented once per consumer, on its component enum.
pub trait Component: fmt::Debug + 'static {
    /// The tag type of this component set.
    type Kind: ComponentKind;

    /// Which variant this value is.
    fn kind(&self) -> Self::Kind;

    /// Called exactly once when the component is detached from its entity,
    /// either explicitly or because the entity was destroyed.
    fn on_remove(&mut self) {}

    /// Called on every component rebuilt from a snapshot, before it is
    /// attached. Use it to recreate runtime-only state that is not serialized.
    fn on_restore(&mut self) {}
}

// ---------------------------------------------------------------------------
// Variant
// ---------------------------------------------------------------------------

/// Typed view of one variant of the component set `C`.
pub trait Variant<C: Component>: Sized + 'static {
    /// Tag of this variant.
    const KIND: C::Kind;

    /// Borrow the payload if `component` is this variant.
    fn from_component(component: &C) -> Option<&Self>;

    /// Mutably borrow the payload if `component` is this variant.
    fn from_component_mut(component: &mut C) -> Option<&mut Self>;

    /// Wrap the payload back into the component set.
    fn into_component(self) -> C;
}
