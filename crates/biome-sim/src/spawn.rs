//! Component bundles for the entities the simulation creates.

use std::f64::consts::PI;

use rand::Rng;

use crate::components::{
    BushTag, EntityName, Goal, Health, Hunger, LifeTime, MoveSpeed, Position, Priority,
    SimComponent, Strength, TargetPosition, Team, Vec2,
};
use crate::settings::SimSettings;

/// Number of teams creatures are split into.
pub const TEAM_COUNT: u8 = 5;

/// Uniformly distributed point inside the world disc.
pub fn random_world_position(rng: &mut impl Rng, world_size: f64) -> Vec2 {
    let angle = rng.gen::<f64>() * 2.0 * PI;
    let radius = world_size * rng.gen::<f64>().sqrt();
    Vec2::new(radius * angle.cos(), radius * angle.sin())
}

/// A creature with randomised stats. Teams outside `0..TEAM_COUNT` fall back
/// to team 0.
pub fn creature(
    rng: &mut impl Rng,
    settings: &SimSettings,
    team: u8,
    name: Option<String>,
) -> Vec<SimComponent> {
    let team = if team < TEAM_COUNT { team } else { 0 };
    let target = if rng.gen_bool(0.5) {
        Goal::Gathering
    } else {
        Goal::Hunting
    };
    let mut components = vec![
        Position(random_world_position(rng, settings.world_size)).into(),
        TargetPosition(None).into(),
        MoveSpeed(f64::from(rng.gen_range(3..=13))).into(),
        Hunger(f64::from(rng.gen_range(40..=75))).into(),
        Strength(f64::from(rng.gen_range(1..=7))).into(),
        Health(f64::from(rng.gen_range(50..=151))).into(),
        Priority {
            current: Goal::Gathering,
            target,
        }
        .into(),
        Team(team).into(),
        LifeTime(0.0).into(),
    ];
    if let Some(name) = name {
        components.push(EntityName(name).into());
    }
    components
}

/// What a newborn inherits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parent {
    pub team: u8,
    pub position: Vec2,
    pub speed: f64,
    pub strength: f64,
    pub health: f64,
}

/// A child of `parent`, born at the parent's position. Each stat is the
/// parent's scaled by a random factor, with floors of 1.5 speed, 1 strength
/// and 200 health.
pub fn offspring(rng: &mut impl Rng, settings: &SimSettings, parent: &Parent) -> Vec<SimComponent> {
    let mut components = creature(rng, settings, parent.team, None);
    let mut scaled = |value: f64, spread: f64, floor: f64| {
        (value * (0.5 - rng.gen::<f64>()) * spread).max(floor)
    };
    let speed = scaled(parent.speed, 5.0, 1.5);
    let strength = scaled(parent.strength, 4.0, 1.0);
    let health = scaled(parent.health, 13.0, 200.0);

    for component in &mut components {
        match component {
            SimComponent::Position(p) => p.0 = parent.position,
            SimComponent::MoveSpeed(s) => s.0 = speed,
            SimComponent::Strength(s) => s.0 = strength,
            SimComponent::Health(h) => h.0 = health,
            _ => {}
        }
    }
    components
}

/// A bush at a random position.
pub fn food(rng: &mut impl Rng, settings: &SimSettings) -> Vec<SimComponent> {
    vec![
        Position(random_world_position(rng, settings.world_size)).into(),
        BushTag.into(),
    ]
}
