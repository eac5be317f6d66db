//! Components of the biome simulation.
//!
//! Every payload type below is one variant of [`SimComponent`]. The
//! `sim_components!` macro generates the enum, its [`SimKind`] tags and the
//! typed [`Variant`] access for each payload.

use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

use biome_ecs::component::{Component, ComponentKind, Variant};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Vec2
// ---------------------------------------------------------------------------

/// 2D vector in world units. The world is a disc centred on the origin.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn sqr_len(self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    pub fn len(self) -> f64 {
        self.sqr_len().sqrt()
    }

    /// Unit vector in the same direction. The zero vector stays zero.
    pub fn normalized(self) -> Self {
        let len = self.len();
        if len == 0.0 {
            Self::ZERO
        } else {
            self * (1.0 / len)
        }
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        *self = *self + rhs;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Vec2 {
    fn sub_assign(&mut self, rhs: Vec2) {
        *self = *self - rhs;
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position(pub Vec2);

/// Where the entity is walking to, if anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TargetPosition(pub Option<Vec2>);

/// World units per second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoveSpeed(pub f64);

/// Food reserve. Decreases over time; at zero the entity starves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hunger(pub f64);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Health(pub f64);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Strength(pub f64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team(pub u8);

/// What a creature is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Goal {
    Gathering,
    Hunting,
    Safety,
}

/// A creature's `current` goal and the goal it returns to when fed and
/// healthy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Priority {
    pub current: Goal,
    pub target: Goal,
}

/// Seconds lived.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LifeTime(pub f64);

/// Marks an edible bush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BushTag;

/// Marks an entity to be removed at the end of the frame.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeadTag {
    pub reason: Option<String>,
}

impl DeadTag {
    pub fn because(reason: &str) -> Self {
        Self {
            reason: Some(reason.to_owned()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityName(pub String);

// ---------------------------------------------------------------------------
// SimComponent / SimKind
// ---------------------------------------------------------------------------

macro_rules! sim_components {
    ($($variant:ident => $name:literal),* $(,)?) => {
        /// Every component the simulation uses.
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        pub enum SimComponent {
            $($variant($variant)),*
        }

        /// Tag for each [`SimComponent`] variant.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum SimKind {
            $($variant),*
        }

        impl SimKind {
            pub const ALL: &'static [SimKind] = &[$(SimKind::$variant),*];
        }

        impl ComponentKind for SimKind {
            fn name(self) -> &'static str {
                match self {
                    $(SimKind::$variant => $name),*
                }
            }
        }

        impl Component for SimComponent {
            type Kind = SimKind;

            fn kind(&self) -> SimKind {
                match self {
                    $(SimComponent::$variant(_) => SimKind::$variant),*
                }
            }
        }

        $(
            impl Variant<SimComponent> for $variant {
                const KIND: SimKind = SimKind::$variant;

                fn from_component(component: &SimComponent) -> Option<&Self> {
                    match component {
                        SimComponent::$variant(value) => Some(value),
                        _ => None,
                    }
                }

                fn from_component_mut(component: &mut SimComponent) -> Option<&mut Self> {
                    match component {
                        SimComponent::$variant(value) => Some(value),
                        _ => None,
                    }
                }

                fn into_component(self) -> SimComponent {
                    SimComponent::$variant(self)
                }
            }

            impl From<$variant> for SimComponent {
                fn from(value: $variant) -> Self {
                    SimComponent::$variant(value)
                }
            }
        )*
    };
}

sim_components! {
    Position => "position",
    TargetPosition => "target_position",
    MoveSpeed => "move_speed",
    Hunger => "hunger",
    Health => "health",
    Strength => "strength",
    Team => "team",
    Priority => "priority",
    LifeTime => "life_time",
    BushTag => "bush",
    DeadTag => "dead",
    EntityName => "name",
}
