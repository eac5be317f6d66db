//! Fixed-timestep frame driver.
//!
//! A [`Simulation`] owns a [`Worlds`] set and advances the current world by
//! `fixed_dt` per frame. Each frame runs every system in order, flushes the
//! world's command buffer once, then consumes the store's deletion log.
//! Snapshots are whole-world, so the log is only counted.
//!
//! # Example
//!
//! ```
//! use biome_sim::driver::{DriverConfig, Simulation};
//! use biome_sim::settings::SimSettings;
//!
//! let config = DriverConfig {
//!     settings: SimSettings { start_creatures: 5, ..Default::default() },
//!     ..Default::default()
//! };
//! let mut sim = Simulation::new(config).unwrap();
//! sim.run_frames(10).unwrap();
//!
//! assert_eq!(sim.frame_count(), 10);
//! ```

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use biome_ecs::command::ApplyReport;
use biome_ecs::snapshot::WorldSnapshot;
use biome_ecs::world::{World, WorldId, Worlds};
use biome_ecs::EcsError;
use rand::Rng;
use rand_pcg::Pcg32;
use tracing::{debug, info};

use crate::components::{SimComponent, SimKind};
use crate::settings::{SettingsError, SimSettings};
use crate::spawn;
use crate::systems::{self, ConfigSystem};

const CREATURE_STREAM: u64 = 4;

// ---------------------------------------------------------------------------
// DriverError
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("fixed_dt must be positive and finite, got {0}")]
    InvalidTimestep(f64),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Ecs(#[from] EcsError),

    #[error("failed to access snapshot file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to encode or decode snapshot: {0}")]
    Json(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// DriverConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Seconds per frame. Must be positive and finite.
    pub fixed_dt: f64,
    /// Seed for every random stream in the world.
    pub seed: u64,
    pub settings: SimSettings,
}

impl Default for DriverConfig {
    /// 60 frames per second, seed 0, default settings.
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
            seed: 0,
            settings: SimSettings::default(),
        }
    }
}

impl DriverConfig {
    pub fn validate(&self) -> Result<(), DriverError> {
        if !(self.fixed_dt > 0.0 && self.fixed_dt.is_finite()) {
            return Err(DriverError::InvalidTimestep(self.fixed_dt));
        }
        self.settings.validate()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// What happened in the last frame.
#[derive(Debug, Clone, Default)]
pub struct FrameDiagnostics {
    /// Wall-clock time for the whole frame.
    pub frame_time: Duration,
    pub commands_applied: usize,
    pub commands_failed: usize,
    pub spawned: usize,
    /// Components detached during the frame, despawns included.
    pub components_removed: usize,
}

/// Head count of the current world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Population {
    pub creatures: usize,
    pub bushes: usize,
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

pub struct Simulation {
    worlds: Worlds<SimComponent>,
    world_id: WorldId,
    config: DriverConfig,
    frame_counter: u64,
    last_diagnostics: FrameDiagnostics,
}

impl Simulation {
    /// Build a world with every simulation system and
    /// `settings.start_creatures` named creatures.
    pub fn new(config: DriverConfig) -> Result<Self, DriverError> {
        config.validate()?;
        let mut world = Self::install_systems(World::new(), &config)?;

        let settings = &config.settings;
        let mut rng = Pcg32::new(config.seed, CREATURE_STREAM);
        for i in 0..settings.start_creatures {
            let team = rng.gen_range(0..spawn::TEAM_COUNT);
            world.spawn(spawn::creature(&mut rng, settings, team, Some(format!("Bot{i}"))))?;
        }
        info!(
            creatures = settings.start_creatures,
            seed = config.seed,
            "simulation created"
        );
        Ok(Self::from_world(world, config))
    }

    /// Resume from a snapshot taken with [`snapshot`](Self::snapshot).
    pub fn restore(
        snapshot: WorldSnapshot<SimComponent>,
        config: DriverConfig,
    ) -> Result<Self, DriverError> {
        config.validate()?;
        let world = Self::install_systems(World::from_snapshot(snapshot)?, &config)?;
        info!(entities = world.entity_count(), "simulation restored");
        Ok(Self::from_world(world, config))
    }

    /// Read a JSON snapshot file and resume from it.
    pub fn load(path: impl AsRef<Path>, config: DriverConfig) -> Result<Self, DriverError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| DriverError::Io {
            path: path.to_owned(),
            source,
        })?;
        let snapshot = serde_json::from_str(&text)?;
        Self::restore(snapshot, config)
    }

    fn install_systems(
        mut world: World<SimComponent>,
        config: &DriverConfig,
    ) -> Result<World<SimComponent>, DriverError> {
        world.add_system(ConfigSystem::new(config.settings.clone(), config.seed))?;
        world.create_systems(&systems::registry())?;
        Ok(world)
    }

    fn from_world(world: World<SimComponent>, config: DriverConfig) -> Self {
        let mut worlds = Worlds::new();
        let world_id = worlds.insert(world);
        Self {
            worlds,
            world_id,
            config,
            frame_counter: 0,
            last_diagnostics: FrameDiagnostics::default(),
        }
    }

    /// Advance the current world by one `fixed_dt`.
    pub fn frame(&mut self) -> Result<ApplyReport, DriverError> {
        let start = Instant::now();
        let world = self.worlds.current_mut()?;
        let report = world.update(self.config.fixed_dt);
        let components_removed = world.drain_removed().len();
        self.frame_counter += 1;

        if report.failed_count > 0 {
            debug!(
                frame = self.frame_counter,
                failed = report.failed_count,
                "frame had failed commands"
            );
        }
        self.last_diagnostics = FrameDiagnostics {
            frame_time: start.elapsed(),
            commands_applied: report.success_count,
            commands_failed: report.failed_count,
            spawned: report.spawned.len(),
            components_removed,
        };
        Ok(report)
    }

    /// Run `count` frames. Returns the total number of commands processed.
    pub fn run_frames(&mut self, count: u64) -> Result<usize, DriverError> {
        let mut total = 0;
        for _ in 0..count {
            let report = self.frame()?;
            total += report.success_count + report.failed_count;
        }
        Ok(total)
    }

    /// Write the current world to `path` as JSON. The deletion log is
    /// consumed once the file is written.
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<(), DriverError> {
        let path = path.as_ref();
        let text = serde_json::to_string(&self.snapshot()?)?;
        std::fs::write(path, text).map_err(|source| DriverError::Io {
            path: path.to_owned(),
            source,
        })?;
        let removed = self.world_mut()?.drain_removed().len();
        debug!(path = %path.display(), removed, "snapshot saved");
        Ok(())
    }

    pub fn snapshot(&self) -> Result<WorldSnapshot<SimComponent>, DriverError> {
        Ok(self.world()?.capture_snapshot())
    }

    // -- accessors ----------------------------------------------------------

    pub fn frame_count(&self) -> u64 {
        self.frame_counter
    }

    /// Simulated seconds, computed as `frame_count * fixed_dt`.
    pub fn sim_time(&self) -> f64 {
        self.frame_counter as f64 * self.config.fixed_dt
    }

    pub fn fixed_dt(&self) -> f64 {
        self.config.fixed_dt
    }

    pub fn world_id(&self) -> WorldId {
        self.world_id
    }

    pub fn worlds(&self) -> &Worlds<SimComponent> {
        &self.worlds
    }

    pub fn worlds_mut(&mut self) -> &mut Worlds<SimComponent> {
        &mut self.worlds
    }

    /// The world currently being driven.
    pub fn world(&self) -> Result<&World<SimComponent>, DriverError> {
        Ok(self.worlds.current()?)
    }

    pub fn world_mut(&mut self) -> Result<&mut World<SimComponent>, DriverError> {
        Ok(self.worlds.current_mut()?)
    }

    pub fn population(&self) -> Result<Population, DriverError> {
        let store = self.world()?.store();
        let count = |kind: SimKind| store.holders(kind).map_or(0, |h| h.len());
        Ok(Population {
            creatures: count(SimKind::Hunger),
            bushes: count(SimKind::BushTag),
        })
    }

    pub fn last_diagnostics(&self) -> &FrameDiagnostics {
        &self.last_diagnostics
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config(start_creatures: usize) -> DriverConfig {
        DriverConfig {
            seed: 9,
            settings: SimSettings {
                start_creatures,
                ..SimSettings::default()
            },
            ..DriverConfig::default()
        }
    }

    #[test]
    fn rejects_bad_timestep() {
        for dt in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let config = DriverConfig {
                fixed_dt: dt,
                ..DriverConfig::default()
            };
            assert!(matches!(Simulation::new(config), Err(DriverError::InvalidTimestep(_))));
        }
    }

    #[test]
    fn new_seeds_start_creatures() {
        let sim = Simulation::new(small_config(12)).unwrap();
        assert_eq!(sim.population().unwrap().creatures, 12);
        assert_eq!(sim.world().unwrap().system_count(), systems::registry().len());
    }

    #[test]
    fn frames_advance_time() {
        let mut sim = Simulation::new(small_config(3)).unwrap();
        sim.run_frames(30).unwrap();
        assert_eq!(sim.frame_count(), 30);
        assert!((sim.sim_time() - 0.5).abs() < 1e-12);
        let elapsed = sim.world().unwrap().get_system::<ConfigSystem>().unwrap().elapsed();
        assert!((elapsed - 0.5).abs() < 1e-9);
    }

    #[test]
    fn food_appears_after_first_frames() {
        let mut sim = Simulation::new(small_config(0)).unwrap();
        sim.run_frames(10).unwrap();
        assert!(sim.population().unwrap().bushes > 0);
    }

    #[test]
    fn deletion_log_is_consumed_every_frame() {
        let config = DriverConfig {
            settings: SimSettings {
                max_food: 8,
                food_batch_size: 4,
                ..small_config(20).settings
            },
            ..small_config(20)
        };
        let mut sim = Simulation::new(config).unwrap();
        let mut removed = 0;
        for _ in 0..600 {
            sim.frame().unwrap();
            removed += sim.last_diagnostics().components_removed;
            assert!(sim.world().unwrap().store().removed().is_empty());
        }
        assert!(removed > 0);
    }

    #[test]
    fn save_leaves_deletion_log_empty() {
        let path = std::env::temp_dir().join(format!("biome-driver-{}.json", std::process::id()));
        let mut sim = Simulation::new(small_config(4)).unwrap();
        sim.run_frames(10).unwrap();
        let world = sim.world_mut().unwrap();
        let e = world.spawn([crate::components::BushTag.into()]).unwrap();
        world.destroy_entity(e).unwrap();
        assert_eq!(sim.world().unwrap().store().removed().len(), 1);

        sim.save(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert!(sim.world().unwrap().store().removed().is_empty());
    }

    #[test]
    fn restore_keeps_entities() {
        let mut sim = Simulation::new(small_config(8)).unwrap();
        sim.run_frames(20).unwrap();
        let snapshot = sim.snapshot().unwrap();
        let before = sim.population().unwrap();

        let restored = Simulation::restore(snapshot.clone(), small_config(8)).unwrap();
        assert_eq!(restored.population().unwrap(), before);
        assert_eq!(restored.snapshot().unwrap(), snapshot);
    }
}
