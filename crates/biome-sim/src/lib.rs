//! Biome -- a headless creature and food simulation on top of `biome_ecs`.
//!
//! Creatures get hungry, walk to bushes and eat them, hunt and fight other
//! teams, flee when weak, evolve when well fed, have offspring and eventually
//! die. New bots join while the population is small. Bushes regrow in batches.
//!
//! - [`components`]: the [`SimComponent`](components::SimComponent) set.
//! - [`systems`]: per-frame logic and the [`registry`](systems::registry)
//!   that installs it.
//! - [`driver`]: the fixed-timestep [`Simulation`](driver::Simulation).
//! - [`settings`]: tunable constants, loadable from JSON.

pub mod components;
pub mod driver;
pub mod settings;
pub mod spawn;
pub mod systems;
