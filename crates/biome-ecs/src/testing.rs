//! Component set shared by the unit tests of this crate.

use std::cell::Cell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::component::{Component, ComponentKind, Variant};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct A(pub i32);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct B(pub i32);

/// Counts how many times `on_remove` fired on any clone of it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct Tracked {
    #[serde(skip)]
    pub removals: Rc<Cell<u32>>,
    #[serde(skip)]
    pub restored: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) enum Comp {
    A(A),
    B(B),
    C(i32),
    X,
    Tracked(Tracked),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum Kind {
    A,
    B,
    C,
    X,
    Tracked,
}

impl ComponentKind for Kind {
    fn name(self) -> &'static str {
        match self {
            Kind::A => "a",
            Kind::B => "b",
            Kind::C => "c",
            Kind::X => "x",
            Kind::Tracked => "tracked",
        }
    }
}

impl Component for Comp {
    type Kind = Kind;

    fn kind(&self) -> Kind {
        match self {
            Comp::A(_) => Kind::A,
            Comp::B(_) => Kind::B,
            Comp::C(_) => Kind::C,
            Comp::X => Kind::X,
            Comp::Tracked(_) => Kind::Tracked,
        }
    }

    fn on_remove(&mut self) {
        if let Comp::Tracked(tracked) = self {
            tracked.removals.set(tracked.removals.get() + 1);
        }
    }

    fn on_restore(&mut self) {
        if let Comp::Tracked(tracked) = self {
            tracked.restored = true;
        }
    }
}

impl Variant<Comp> for A {
    const KIND: Kind = Kind::A;

    fn from_component(component: &Comp) -> Option<&Self> {
        match component {
            Comp::A(a) => Some(a),
            _ => None,
        }
    }

    fn from_component_mut(component: &mut Comp) -> Option<&mut Self> {
        match component {
            Comp::A(a) => Some(a),
            _ => None,
        }
    }

    fn into_component(self) -> Comp {
        Comp::A(self)
    }
}

impl Variant<Comp> for B {
    const KIND: Kind = Kind::B;

    fn from_component(component: &Comp) -> Option<&Self> {
        match component {
            Comp::B(b) => Some(b),
            _ => None,
        }
    }

    fn from_component_mut(component: &mut Comp) -> Option<&mut Self> {
        match component {
            Comp::B(b) => Some(b),
            _ => None,
        }
    }

    fn into_component(self) -> Comp {
        Comp::B(self)
    }
}
